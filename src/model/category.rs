use crate::model::{CategoryId, Color};
use crate::Result;
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};

/// Whether a category (and the entries recorded against it) is money coming in or going out.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Income,
    #[default]
    Expense,
}

serde_plain::derive_display_from_serialize!(Kind);
serde_plain::derive_fromstr_from_deserialize!(Kind);

impl Kind {
    pub const ALL: [Kind; 2] = [Kind::Income, Kind::Expense];
}

/// A user-defined income or expense label with a display colour and a manual position.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Category {
    id: CategoryId,
    kind: Kind,
    display_order: u32,
    name: String,
    color: Color,
}

impl Category {
    /// Creates a category with a freshly generated id.
    pub fn new(kind: Kind, display_order: u32, name: impl Into<String>, color: Color) -> Self {
        Self::from_parts(CategoryId::generate(), kind, display_order, name, color)
    }

    /// Rebuilds a category that already has an id, e.g. when loading from the database.
    pub fn from_parts(
        id: CategoryId,
        kind: Kind,
        display_order: u32,
        name: impl Into<String>,
        color: Color,
    ) -> Self {
        Self {
            id,
            kind,
            display_order,
            name: name.into(),
            color,
        }
    }

    pub fn id(&self) -> &CategoryId {
        &self.id
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn display_order(&self) -> u32 {
        self.display_order
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Color {
        self.color
    }
}

/// The fields of a category that may be edited. `None` leaves the field unchanged.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CategoryUpdates {
    pub name: Option<String>,
    pub color: Option<Color>,
}

/// All categories, kept as two lists (income and expense) each sorted by `display_order`.
///
/// Every mutation re-indexes the affected list so that its `display_order` values are always
/// `0..len`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Categories {
    income: Vec<Category>,
    expense: Vec<Category>,
}

impl Categories {
    /// Partitions `categories` by kind and sorts each list by its stored `display_order`. The
    /// stored orders are kept as-is so that [`Categories::validate`] can report drift.
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut me = Self::default();
        for category in categories {
            me.list_mut(category.kind).push(category);
        }
        for kind in Kind::ALL {
            me.list_mut(kind).sort_by_key(|c| c.display_order);
        }
        me
    }

    pub fn list(&self, kind: Kind) -> &[Category] {
        match kind {
            Kind::Income => &self.income,
            Kind::Expense => &self.expense,
        }
    }

    fn list_mut(&mut self, kind: Kind) -> &mut Vec<Category> {
        match kind {
            Kind::Income => &mut self.income,
            Kind::Expense => &mut self.expense,
        }
    }

    /// Income categories first, then expense categories, each in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.income.iter().chain(self.expense.iter())
    }

    pub fn len(&self) -> usize {
        self.income.len() + self.expense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &CategoryId) -> Option<&Category> {
        self.iter().find(|c| &c.id == id)
    }

    pub fn kind_of(&self, id: &CategoryId) -> Option<Kind> {
        self.get(id).map(|c| c.kind)
    }

    fn position(&self, id: &CategoryId) -> Result<(Kind, usize)> {
        for kind in Kind::ALL {
            if let Some(ix) = self.list(kind).iter().position(|c| &c.id == id) {
                return Ok((kind, ix));
            }
        }
        bail!("Category not found: {id}")
    }

    /// The `display_order` a new category of `kind` would get.
    pub fn next_order(&self, kind: Kind) -> u32 {
        self.list(kind).len() as u32
    }

    /// Appends `category` to the end of its list.
    pub fn push(&mut self, category: Category) -> Result<()> {
        ensure!(
            self.get(&category.id).is_none(),
            "Category already exists: {}",
            category.id
        );
        let kind = category.kind;
        self.list_mut(kind).push(category);
        self.reindex(kind);
        Ok(())
    }

    /// Applies `updates` and returns the updated category.
    pub fn update(&mut self, id: &CategoryId, updates: &CategoryUpdates) -> Result<&Category> {
        let (kind, ix) = self.position(id)?;
        let category = &mut self.list_mut(kind)[ix];
        if let Some(name) = &updates.name {
            let name = name.trim();
            ensure!(!name.is_empty(), "A category name cannot be empty");
            category.name = name.to_string();
        }
        if let Some(color) = updates.color {
            category.color = color;
        }
        Ok(&self.list(kind)[ix])
    }

    /// Removes the category and closes the gap in its list. Returns the removed category.
    pub fn remove(&mut self, id: &CategoryId) -> Result<Category> {
        let (kind, ix) = self.position(id)?;
        let removed = self.list_mut(kind).remove(ix);
        self.reindex(kind);
        Ok(removed)
    }

    /// Moves the category to `index` within its own list. An index past the end moves it last.
    pub fn move_to(&mut self, id: &CategoryId, index: usize) -> Result<()> {
        let (kind, ix) = self.position(id)?;
        let list = self.list_mut(kind);
        let category = list.remove(ix);
        let index = index.min(list.len());
        list.insert(index, category);
        self.reindex(kind);
        Ok(())
    }

    fn reindex(&mut self, kind: Kind) {
        for (ix, category) in self.list_mut(kind).iter_mut().enumerate() {
            category.display_order = ix as u32;
        }
    }

    /// Checks that each list's `display_order` values are exactly `0..len` and that every category
    /// sits in the list of its own kind.
    pub fn validate(&self) -> Result<()> {
        for kind in Kind::ALL {
            for (ix, category) in self.list(kind).iter().enumerate() {
                ensure!(
                    category.kind == kind,
                    "Category {} is an {} category but is listed with {kind} categories",
                    category.id,
                    category.kind
                );
                ensure!(
                    category.display_order == ix as u32,
                    "The {kind} category display order has drifted: '{}' has order {} at \
                    position {ix}",
                    category.name,
                    category.display_order
                );
            }
        }
        Ok(())
    }

    /// Finds the category named `name` (case-insensitive) of `kind`.
    pub fn find_by_name(&self, kind: Kind, name: &str) -> Result<&Category> {
        self.list(kind)
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .with_context(|| format!("There is no {kind} category named '{name}'"))
    }
}

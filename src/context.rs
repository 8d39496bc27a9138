//! The cached view of the ledger that every command works against.
//!
//! A `Context` owns a [`Store`] together with the [`Ledger`] and [`Categories`] loaded from it.
//! Writes go to the store first and reach the caches only once the store has accepted them, so a
//! failed write never leaves the caches out of step with what is persisted.

use crate::calendar::{CalendarItem, CalendarMonth, WeekStart};
use crate::error::{ErrorType, IntoResult};
use crate::ledger::Ledger;
use crate::model::{
    Balance, Categories, Category, CategoryId, CategoryUpdates, Color, Entry, EntryId,
    EntryUpdates, Kind,
};
use crate::store::Store;
use crate::Result;
use anyhow::{anyhow, Context as _};
use chrono::NaiveDate;
use tracing::{debug, trace};

pub struct Context<S: Store> {
    store: S,
    ledger: Ledger,
    categories: Categories,
}

impl<S: Store> Context<S> {
    /// Loads the entries and categories from `store`.
    pub async fn load(store: S) -> Result<Self> {
        let mut context = Self {
            store,
            ledger: Ledger::default(),
            categories: Categories::default(),
        };
        context.refresh().await?;
        Ok(context)
    }

    /// Replaces both caches with what is currently in the store.
    pub async fn refresh(&mut self) -> Result<()> {
        let categories = self
            .store
            .list_categories()
            .await
            .context("Unable to load categories")
            .pub_result(ErrorType::Database)?;
        let entries = self
            .store
            .list_entries()
            .await
            .context("Unable to load entries")
            .pub_result(ErrorType::Database)?;
        self.categories = Categories::new(categories);
        self.ledger = Ledger::new(entries);
        debug!(
            "Loaded {} entries and {} categories",
            self.ledger.len(),
            self.categories.len()
        );
        if let Err(e) = self.categories.validate() {
            debug!("Stored category order needs repair: {e}");
        }
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    /// Records a new entry against an existing category of the same kind.
    pub async fn add_entry(
        &mut self,
        date: NaiveDate,
        category_id: CategoryId,
        balance: Balance,
        memo: impl Into<String>,
    ) -> Result<Entry> {
        let entry = Entry::new(date, category_id, balance, memo);
        self.check_entry(&entry)?;
        self.store
            .insert_entry(&entry)
            .await
            .context("Unable to save the new entry")
            .pub_result(ErrorType::Database)?;
        trace!("Inserted entry {}", entry.id());
        self.ledger.insert(entry.clone());
        Ok(entry)
    }

    /// Applies `updates` to the entry with `id` and returns the updated entry.
    pub async fn update_entry(&mut self, id: &EntryId, updates: &EntryUpdates) -> Result<Entry> {
        let existing = self
            .ledger
            .get(id)
            .ok_or_else(|| anyhow!("Entry not found: {id}"))
            .pub_result(ErrorType::Request)?;
        let updated = existing.updated(updates);
        self.check_entry(&updated)?;
        self.store
            .update_entry(&updated)
            .await
            .with_context(|| format!("Unable to update entry {id}"))
            .pub_result(ErrorType::Database)?;
        trace!("Updated entry {id}");
        self.ledger.replace(updated.clone());
        Ok(updated)
    }

    pub async fn delete_entry(&mut self, id: &EntryId) -> Result<Entry> {
        let mut deleted = self.delete_entries(std::slice::from_ref(id)).await?;
        deleted
            .pop()
            .ok_or_else(|| anyhow!("Entry not found: {id}"))
            .pub_result(ErrorType::Internal)
    }

    /// Deletes all of `ids`, or none of them if any is unknown. Returns the deleted entries.
    /// An id listed more than once is deleted once.
    pub async fn delete_entries(&mut self, ids: &[EntryId]) -> Result<Vec<Entry>> {
        let mut unique: Vec<EntryId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }
        let ids = unique.as_slice();
        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            let entry = self
                .ledger
                .get(id)
                .ok_or_else(|| anyhow!("Entry not found: {id}"))
                .pub_result(ErrorType::Request)?;
            deleted.push(entry.clone());
        }
        self.store
            .delete_entries(ids)
            .await
            .context("Unable to delete entries")
            .pub_result(ErrorType::Database)?;
        trace!("Deleted {} entries", ids.len());
        self.ledger.remove(ids);
        Ok(deleted)
    }

    /// Creates a category at the end of its kind's list.
    pub async fn add_category(
        &mut self,
        kind: Kind,
        name: &str,
        color: Color,
    ) -> Result<Category> {
        let name = name.trim();
        ensure_request(!name.is_empty(), "A category name cannot be empty")?;
        ensure_request(
            self.categories.find_by_name(kind, name).is_err(),
            format!("There is already an {kind} category named '{name}'"),
        )?;
        let category = Category::new(kind, self.categories.next_order(kind), name, color);
        self.store
            .insert_category(&category)
            .await
            .context("Unable to save the new category")
            .pub_result(ErrorType::Database)?;
        self.categories
            .push(category.clone())
            .pub_result(ErrorType::Internal)?;
        Ok(category)
    }

    /// Renames and/or recolours a category.
    pub async fn update_category(
        &mut self,
        id: &CategoryId,
        updates: &CategoryUpdates,
    ) -> Result<Category> {
        let mut staged = self.categories.clone();
        let updated = staged
            .update(id, updates)
            .pub_result(ErrorType::Request)?
            .clone();
        if let Some(other) = staged
            .list(updated.kind())
            .iter()
            .find(|c| c.id() != id && c.name().eq_ignore_ascii_case(updated.name()))
        {
            return Err(anyhow!(
                "There is already an {} category named '{}'",
                other.kind(),
                other.name()
            ))
            .pub_result(ErrorType::Request);
        }
        self.store
            .update_category(&updated)
            .await
            .with_context(|| format!("Unable to update category {id}"))
            .pub_result(ErrorType::Database)?;
        self.categories = staged;
        Ok(updated)
    }

    /// Deletes a category that no entry refers to and closes the gap in its list.
    pub async fn delete_category(&mut self, id: &CategoryId) -> Result<Category> {
        let references = self
            .ledger
            .entries()
            .iter()
            .filter(|e| e.category_id() == id)
            .count();
        ensure_request(
            references == 0,
            format!("Category {id} cannot be deleted because {references} entries refer to it"),
        )?;
        let mut staged = self.categories.clone();
        let removed = staged.remove(id).pub_result(ErrorType::Request)?;
        self.store
            .delete_category(id, staged.list(removed.kind()))
            .await
            .with_context(|| format!("Unable to delete category {id}"))
            .pub_result(ErrorType::Database)?;
        self.categories = staged;
        Ok(removed)
    }

    /// Moves a category to `index` within its kind's list.
    pub async fn move_category(&mut self, id: &CategoryId, index: usize) -> Result<&[Category]> {
        let mut staged = self.categories.clone();
        staged.move_to(id, index).pub_result(ErrorType::Request)?;
        let kind = staged
            .kind_of(id)
            .ok_or_else(|| anyhow!("Category not found: {id}"))
            .pub_result(ErrorType::Internal)?;
        self.store
            .save_category_orders(staged.list(kind))
            .await
            .context("Unable to save the category order")
            .pub_result(ErrorType::Database)?;
        self.categories = staged;
        Ok(self.categories.list(kind))
    }

    /// Rewrites the stored order of any list whose `display_order` values are not `0..len`.
    /// Returns true if anything was rewritten.
    pub async fn repair_category_orders(&mut self) -> Result<bool> {
        if self.categories.validate().is_ok() {
            return Ok(false);
        }
        let mut staged = Categories::default();
        for category in self.categories.iter() {
            staged
                .push(category.clone())
                .pub_result(ErrorType::Internal)?;
        }
        for kind in Kind::ALL {
            self.store
                .save_category_orders(staged.list(kind))
                .await
                .context("Unable to save the category order")
                .pub_result(ErrorType::Database)?;
        }
        self.categories = staged;
        Ok(true)
    }

    /// The calendar cells for `month`.
    pub fn calendar(&self, month: &CalendarMonth, week_start: WeekStart) -> Vec<CalendarItem> {
        month.items(&self.ledger, week_start)
    }

    fn check_entry(&self, entry: &Entry) -> Result<()> {
        entry.balance().validate().pub_result(ErrorType::Request)?;
        let category = self
            .categories
            .get(entry.category_id())
            .ok_or_else(|| anyhow!("Category not found: {}", entry.category_id()))
            .pub_result(ErrorType::Request)?;
        ensure_request(
            category.kind() == entry.kind(),
            format!(
                "An {} entry cannot use the {} category '{}'",
                entry.kind(),
                category.kind(),
                category.name()
            ),
        )
    }
}

fn ensure_request(condition: bool, message: impl Into<String>) -> Result<()> {
    if condition {
        return Ok(());
    }
    Err(anyhow!(message.into())).pub_result(ErrorType::Request)
}

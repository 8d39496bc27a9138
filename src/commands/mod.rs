//! Command handlers for the kakeibo CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod backup;
mod calendar;
mod category;
mod color;
mod entry;
mod init;
mod summary;

use crate::context::Context;
use crate::db::Db;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Categories, Category, CategoryId, Kind};
use crate::{Config, Result};
use anyhow::{anyhow, bail};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use backup::backup;
pub use calendar::{calendar, CalendarDay, CalendarView};
pub use category::{
    delete_category, insert_category, list_categories, move_category, update_category,
};
pub use color::{color, ColorView};
pub use entry::{delete_entries, export_entries, insert_entry, list_entries, update_entry};
pub use init::init;
pub use summary::{breakdown, summary, BreakdownView, SummaryView};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }

    /// Print the structured data as pretty JSON to stdout, falling back to the message when there
    /// is no structured data.
    pub fn print_json(&self) -> Result<()> {
        match self.structure() {
            Some(structure) => {
                let json = serde_json::to_string_pretty(structure)
                    .map_err(|e| anyhow!("Unable to serialize command output: {e}"))
                    .pub_result(ErrorType::Internal)?;
                println!("{json}");
            }
            None => info!("{}", self.message),
        }
        Ok(())
    }
}

/// Loads the ledger and categories for a command.
async fn open(config: &Config) -> Result<Context<Db>> {
    Context::load(config.db().clone()).await
}

/// Finds a category by id, or else by case-insensitive name. When `kind` is given, only
/// categories of that kind match by name.
fn resolve_category<'a>(
    categories: &'a Categories,
    reference: &str,
    kind: Option<Kind>,
) -> Result<&'a Category> {
    let find = move || -> Result<&'a Category> {
        if let Some(category) = categories.get(&CategoryId::from(reference.trim())) {
            return Ok(category);
        }
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => Kind::ALL.to_vec(),
        };
        let matches: Vec<&Category> = kinds
            .into_iter()
            .filter_map(|kind| categories.find_by_name(kind, reference.trim()).ok())
            .collect();
        match matches.as_slice() {
            [category] => Ok(*category),
            [] => match kind {
                Some(kind) => bail!("There is no {kind} category with the id or name '{reference}'"),
                None => bail!("There is no category with the id or name '{reference}'"),
            },
            _ => bail!(
                "Both an income and an expense category are named '{reference}', use the id \
                instead"
            ),
        }
    };
    find().pub_result(ErrorType::Request)
}

/// "1 entry", "2 entries".
fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Color;

    fn categories() -> Categories {
        let gray = Color::new(0x80, 0x80, 0x80);
        Categories::new(vec![
            Category::new(Kind::Income, 0, "Other", gray),
            Category::new(Kind::Expense, 0, "Other", gray),
            Category::new(Kind::Expense, 1, "Food", gray),
        ])
    }

    #[test]
    fn test_resolve_category_by_name_and_id() {
        let categories = categories();
        let food = resolve_category(&categories, "food", None).unwrap();
        assert_eq!(food.name(), "Food");
        let by_id = resolve_category(&categories, food.id().as_str(), None).unwrap();
        assert_eq!(by_id, food);
    }

    #[test]
    fn test_resolve_category_ambiguous() {
        let categories = categories();
        let e = resolve_category(&categories, "Other", None).unwrap_err();
        assert_eq!(ErrorType::of(&e), Some(ErrorType::Request));
        assert!(format!("{e:#}").contains("use the id"));

        let other = resolve_category(&categories, "Other", Some(Kind::Income)).unwrap();
        assert_eq!(other.kind(), Kind::Income);
    }

    #[test]
    fn test_resolve_category_missing() {
        let categories = categories();
        let e = resolve_category(&categories, "Food", Some(Kind::Income)).unwrap_err();
        assert!(format!("{e:#}").contains("no income category"));
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "entry", "entries"), "1 entry");
        assert_eq!(plural(0, "entry", "entries"), "0 entries");
    }
}

//! Types that represent the core data model, such as `Entry` and `Category`.
mod amount;
mod category;
mod color;
mod entry;
mod id;

pub(crate) use amount::with_commas;
pub use amount::{Amount, AmountError, AmountFormat};
pub use category::{Categories, Category, CategoryUpdates, Kind};
pub use color::{Color, ColorPicker, Component, Hsb, GRADIENT_STEPS};
pub use entry::{Balance, Entry, EntryUpdates, MAX_AMOUNT};
pub use id::{CategoryId, EntryId};
use serde::{Deserialize, Serialize};

/// Everything in the ledger at one point in time. This is what JSON backups contain.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Snapshot {
    pub categories: Categories,
    pub entries: Vec<Entry>,
}

//! kakeibo: a household account book.
//!
//! Income and expense entries are recorded against user-defined categories and kept in a SQLite
//! database. The library exposes the ledger model, the month calendar, period aggregation and the
//! command handlers used by the `kakeibo` binary.

pub mod aggregate;
pub mod args;
pub mod backup;
pub mod calendar;
pub mod commands;
mod config;
pub mod context;
mod db;
mod error;
pub mod ledger;
pub mod model;
pub mod store;
mod utils;


pub use config::Config;
pub use context::Context;
pub use error::{Error, ErrorType, IntoResult, Result};
pub use ledger::Ledger;
pub use store::{MemoryStore, Store};

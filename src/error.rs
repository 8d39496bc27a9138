//! Error handling for kakeibo.
//!
//! Internally everything is an `anyhow::Error` with context attached at each I/O or SQL boundary.
//! At the public command boundary errors are tagged with an [`ErrorType`] so that a caller can
//! tell a bad request apart from a broken database without parsing messages.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The broad category of a failure returned from a command.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The home directory or `config.json` is missing, unreadable or invalid.
    Config,
    /// A read or write against the ledger database failed.
    Database,
    /// The request itself was invalid, e.g. an unknown category or a negative amount.
    Request,
    /// Anything else.
    Internal,
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorType::Config => "Configuration error",
            ErrorType::Database => "Database error",
            ErrorType::Request => "Invalid request",
            ErrorType::Internal => "Internal error",
        };
        f.write_str(s)
    }
}

impl ErrorType {
    /// Finds the `ErrorType` that was attached with [`IntoResult::pub_result`], if any.
    pub fn of(e: &Error) -> Option<ErrorType> {
        e.downcast_ref::<ErrorType>().copied()
    }
}

/// Tags a result with an [`ErrorType`] on its way out of the library.
pub trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| {
            let e: Error = e.into();
            // Keep the first tag when errors pass through more than one public boundary.
            if ErrorType::of(&e).is_some() {
                e
            } else {
                e.context(error_type)
            }
        })
    }
}

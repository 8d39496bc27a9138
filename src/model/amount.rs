//! Amount type for handling yen values with optional yen signs.
//!
//! This module provides the `Amount` type which wraps an `i64` count of yen and handles parsing
//! values that may or may not include a yen sign and commas.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

/// Represents how yen amounts were (or should be) formatted.
///
/// # Examples
///  - `AmountFormat{ yen: true, commas: true }` -> `-¥60,000`
///  - `AmountFormat{ yen: false, commas: true }` -> `-60,000`
///  - `AmountFormat{ yen: false, commas: false }` -> `-60000`
///  - `AmountFormat{ yen: true, commas: false }` -> `-¥60000`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmountFormat {
    /// Whether a yen sign is present in the formatting.
    yen: bool,
    /// Whether commas are present as thousands separators in the formatting.
    commas: bool,
}

impl Default for AmountFormat {
    fn default() -> Self {
        DEFAULT_FORMAT
    }
}

/// The default format has a yen sign and commas: e.g. `-¥60,000`.
const DEFAULT_FORMAT: AmountFormat = AmountFormat {
    yen: true,
    commas: true,
};

/// Both the half-width and the full-width yen sign are accepted when parsing.
const YEN_SIGNS: [char; 2] = ['¥', '￥'];

/// Represents a yen amount. Yen has no minor unit, so the value is a whole number.
///
/// Formatting is considered significant for the purposes of equality, so for numeric comparisons,
/// you should access the `value` and use that.
///
/// # Examples
///
/// ```
/// # use kakeibo::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("-¥1,500").unwrap();
/// assert_eq!(amount.value(), -1500);
/// assert_eq!(amount.to_string(), "-¥1,500");
/// ```
///
/// ```
/// # use kakeibo::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("5000").unwrap();
/// let b = Amount::from_str("¥5,000").unwrap();
/// assert_ne!(a, b);
/// assert_eq!(a.value(), b.value());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: i64,
    format: AmountFormat,
}

impl Amount {
    /// Creates a new Amount with default `String` formatting.
    pub const fn new(value: i64) -> Self {
        Self {
            value,
            format: DEFAULT_FORMAT,
        }
    }

    pub const fn new_with_format(value: i64, format: AmountFormat) -> Self {
        Self { value, format }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    pub fn is_positive(&self) -> bool {
        self.value > 0
    }

    pub fn is_negative(&self) -> bool {
        self.value < 0
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub enum AmountError {
    /// The digits are not a whole number.
    Parse(ParseIntError),
    /// A second sign, or a value that does not fit in an `i64`.
    Malformed(String),
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Parse(e) => Debug::fmt(e, f),
            AmountError::Malformed(s) => write!(f, "Malformed({s:?})"),
        }
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Parse(e) => write!(f, "Invalid yen amount: {e}"),
            AmountError::Malformed(s) => write!(f, "Invalid yen amount: {s}"),
        }
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AmountError::Parse(e) => Some(e),
            AmountError::Malformed(_) => None,
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (yen, digits) = match unsigned.strip_prefix(YEN_SIGNS) {
            Some(rest) => (true, rest),
            None => (false, unsigned),
        };

        let without_commas = digits.replace(',', "");
        let commas = without_commas.len() < digits.len();

        if without_commas.starts_with(['+', '-']) {
            return Err(AmountError::Malformed(format!("unexpected sign in '{trimmed}'")));
        }
        let magnitude = u64::from_str(&without_commas).map_err(AmountError::Parse)?;
        let value = if negative {
            0i64.checked_sub_unsigned(magnitude)
        } else {
            i64::try_from(magnitude).ok()
        }
        .ok_or_else(|| AmountError::Malformed(format!("'{trimmed}' is out of range")))?;
        Ok(Amount {
            value,
            format: AmountFormat { yen, commas },
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let yen = if self.format.yen { "¥" } else { "" };
        let magnitude = self.value.unsigned_abs();
        if self.format.commas {
            write!(f, "{sign}{yen}{}", with_commas(magnitude))
        } else {
            write!(f, "{sign}{yen}{magnitude}")
        }
    }
}

/// Formats a whole number with thousands separators.
pub(crate) fn with_commas(n: u64) -> String {
    // f64 is exact up to 2^53 which is far beyond any household ledger.
    format_num::format_num!(",.0", n as f64)
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

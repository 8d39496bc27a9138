use crate::model::{CategoryId, EntryId, Kind};
use crate::Result;
use anyhow::ensure;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A ledger amount tagged with its direction, so that income and expense can never be confused by
/// a sign. The wrapped value is always a non-negative number of yen.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Balance {
    Income(i64),
    Expense(i64),
}

/// The largest amount a single entry may hold: one trillion yen. Totals over millions of such
/// entries still fit in an `i64`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

impl Balance {
    /// Creates a balance of `kind`, rejecting amounts outside `0..=MAX_AMOUNT`.
    pub fn new(kind: Kind, amount: i64) -> Result<Self> {
        let balance = match kind {
            Kind::Income => Balance::Income(amount),
            Kind::Expense => Balance::Expense(amount),
        };
        balance.validate()?;
        Ok(balance)
    }

    /// Checks that the amount is within `0..=MAX_AMOUNT`. The variants are public, so a balance
    /// built directly is checked again before it is stored.
    pub fn validate(&self) -> Result<()> {
        let (kind, amount) = (self.kind(), self.amount());
        ensure!(
            amount >= 0,
            "An {kind} amount cannot be negative, got {amount}"
        );
        ensure!(
            amount <= MAX_AMOUNT,
            "An {kind} amount cannot exceed {MAX_AMOUNT}, got {amount}"
        );
        Ok(())
    }

    pub fn kind(&self) -> Kind {
        match self {
            Balance::Income(_) => Kind::Income,
            Balance::Expense(_) => Kind::Expense,
        }
    }

    /// The unsigned amount.
    pub fn amount(&self) -> i64 {
        match self {
            Balance::Income(n) | Balance::Expense(n) => *n,
        }
    }

    /// Income is positive, expense is negative.
    pub fn signed(&self) -> i64 {
        match self {
            Balance::Income(n) => *n,
            Balance::Expense(n) => -*n,
        }
    }
}

/// One income or expense record in the household ledger.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Entry {
    id: EntryId,
    date: NaiveDate,
    category_id: CategoryId,
    balance: Balance,
    memo: String,
    created_at: DateTime<Utc>,
}

impl Entry {
    /// Creates a new entry with a fresh id, stamped with the current time.
    pub fn new(
        date: NaiveDate,
        category_id: CategoryId,
        balance: Balance,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            date,
            category_id,
            balance,
            memo: memo.into(),
            created_at: Utc::now(),
        }
    }

    /// Rebuilds an entry that already exists, e.g. when loading from the database.
    pub fn from_parts(
        id: EntryId,
        date: NaiveDate,
        category_id: CategoryId,
        balance: Balance,
        memo: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            date,
            category_id,
            balance,
            memo: memo.into(),
            created_at,
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn category_id(&self) -> &CategoryId {
        &self.category_id
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    pub fn kind(&self) -> Kind {
        self.balance.kind()
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns a copy of this entry with `updates` applied. The id and creation time never change.
    pub fn updated(&self, updates: &EntryUpdates) -> Self {
        Self {
            id: self.id.clone(),
            date: updates.date.unwrap_or(self.date),
            category_id: updates
                .category_id
                .clone()
                .unwrap_or_else(|| self.category_id.clone()),
            balance: updates.balance.unwrap_or(self.balance),
            memo: updates.memo.clone().unwrap_or_else(|| self.memo.clone()),
            created_at: self.created_at,
        }
    }
}

/// The fields of an entry that may be edited. `None` leaves the field unchanged.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EntryUpdates {
    pub date: Option<NaiveDate>,
    pub category_id: Option<CategoryId>,
    pub balance: Option<Balance>,
    pub memo: Option<String>,
}

impl EntryUpdates {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.category_id.is_none()
            && self.balance.is_none()
            && self.memo.is_none()
    }
}

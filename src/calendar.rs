//! The month calendar: which dates a month view shows, month navigation, and the per-day items
//! drawn in each cell.

use crate::aggregate::{self, Granularity, Totals};
use crate::ledger::Ledger;
use crate::model::Entry;
use crate::Result;
use anyhow::{bail, Context};
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// The first column of the calendar grid.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

serde_plain::derive_display_from_serialize!(WeekStart);
serde_plain::derive_fromstr_from_deserialize!(WeekStart);

impl WeekStart {
    /// How many cells precede `date` in its week row.
    pub fn offset(&self, date: NaiveDate) -> u32 {
        match self {
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
            WeekStart::Monday => date.weekday().num_days_from_monday(),
        }
    }

    /// Short weekday labels in column order.
    pub fn labels(&self) -> [&'static str; 7] {
        match self {
            WeekStart::Sunday => ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
            WeekStart::Monday => ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
        }
    }
}

/// A displayed month, represented by its first day. Years are limited to `1..=9999` so that date
/// arithmetic on the grid can never overflow.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarMonth {
    first: NaiveDate,
    last: NaiveDate,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            bail!("The year {year} is outside the supported range {MIN_YEAR}..={MAX_YEAR}");
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .with_context(|| format!("Invalid month {year}-{month:02}"))?;
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .with_context(|| format!("No last day for {year}-{month:02}"))?;
        Ok(Self { first, last })
    }

    /// The month that contains `date`.
    pub fn containing(date: NaiveDate) -> Result<Self> {
        Self::new(date.year(), date.month())
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last
    }

    pub fn days_in_month(&self) -> u32 {
        self.last.day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        aggregate::same_period(self.first, date, Granularity::Month)
    }

    pub fn next_month(&self) -> Result<Self> {
        match self.month() {
            12 => Self::new(self.year() + 1, 1),
            m => Self::new(self.year(), m + 1),
        }
    }

    pub fn last_month(&self) -> Result<Self> {
        match self.month() {
            1 => Self::new(self.year() - 1, 12),
            m => Self::new(self.year(), m - 1),
        }
    }

    /// Moves `n` months forward (or backward when `n` is negative).
    pub fn shift(&self, n: i32) -> Result<Self> {
        let index = i64::from(self.year()) * 12 + i64::from(self.month()) - 1 + i64::from(n);
        let year = i32::try_from(index.div_euclid(12))
            .ok()
            .filter(|year| (MIN_YEAR..=MAX_YEAR).contains(year))
            .with_context(|| format!("Moving {n} months from {self} goes outside the years {MIN_YEAR}..={MAX_YEAR}"))?;
        // rem_euclid(12) is in 0..12
        Self::new(year, index.rem_euclid(12) as u32 + 1)
    }

    /// The dates shown for this month: whole weeks, starting with the days of the previous month
    /// that share the first week and ending with the days of the next month that share the last.
    ///
    /// The length is `weeks * 7` where `weeks` is the number of week rows the month touches, and the
    /// 1st of the month sits at index `week_start.offset(first_day)`.
    pub fn grid(&self, week_start: WeekStart) -> Vec<NaiveDate> {
        let offset = week_start.offset(self.first);
        let weeks = (offset + self.days_in_month()).div_ceil(7);
        let start = self.first - Duration::days(i64::from(offset));
        start.iter_days().take((weeks * 7) as usize).collect()
    }

    /// One item per grid date with that day's entries and signed total.
    pub fn items(&self, ledger: &Ledger, week_start: WeekStart) -> Vec<CalendarItem> {
        self.grid(week_start)
            .into_iter()
            .map(|date| {
                let entries: Vec<Entry> = ledger.on_day(date).cloned().collect();
                let total_balance = entries.iter().map(|e| e.balance().signed()).sum();
                CalendarItem {
                    date,
                    total_balance,
                    is_calendar_month: self.contains(date),
                    entries,
                }
            })
            .collect()
    }

    /// Income and expense for the whole month.
    pub fn totals(&self, ledger: &Ledger) -> Totals {
        aggregate::totals(ledger.entries(), self.first, Granularity::Month, None)
    }
}

impl Display for CalendarMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for CalendarMonth {
    type Err = anyhow::Error;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (year, month) = s
            .split_once('-')
            .with_context(|| format!("Invalid month '{s}', expected YYYY-MM"))?;
        let year: i32 = year
            .parse()
            .with_context(|| format!("Invalid year in '{s}'"))?;
        let month: u32 = month
            .parse()
            .with_context(|| format!("Invalid month in '{s}'"))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for CalendarMonth {
    type Error = anyhow::Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CalendarMonth> for String {
    fn from(value: CalendarMonth) -> Self {
        value.to_string()
    }
}

/// One cell of the month calendar. Derived from the ledger; never stored.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CalendarItem {
    pub date: NaiveDate,
    /// Signed total of the day's entries.
    pub total_balance: i64,
    /// False for the leading and trailing days borrowed from the adjacent months.
    pub is_calendar_month: bool,
    pub entries: Vec<Entry>,
}

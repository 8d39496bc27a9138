//! Sums of signed ledger balances per day, month, year and category.
//!
//! Every total in the application (calendar cells, the month header, the category pie chart) goes
//! through [`aggregate`] or one of the helpers built on the same filter.

use crate::calendar::CalendarMonth;
use crate::model::{Categories, CategoryId, Color, Entry, Kind};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How coarsely two dates are compared.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    #[default]
    Month,
    Year,
}

serde_plain::derive_display_from_serialize!(Granularity);
serde_plain::derive_fromstr_from_deserialize!(Granularity);

/// True when `a` and `b` fall in the same day, month or year.
pub fn same_period(a: NaiveDate, b: NaiveDate, granularity: Granularity) -> bool {
    match granularity {
        Granularity::Day => a == b,
        Granularity::Month => a.year() == b.year() && a.month() == b.month(),
        Granularity::Year => a.year() == b.year(),
    }
}

/// The entries in the same period as `date`, optionally restricted to one category.
pub fn filter<'a>(
    entries: &'a [Entry],
    date: NaiveDate,
    granularity: Granularity,
    category: Option<&'a CategoryId>,
) -> impl Iterator<Item = &'a Entry> + 'a {
    entries.iter().filter(move |e| {
        same_period(e.date(), date, granularity)
            && category.map_or(true, |id| e.category_id() == id)
    })
}

/// The signed total (income positive, expense negative) of the entries in the same period as
/// `date`, optionally restricted to one category.
pub fn aggregate(
    entries: &[Entry],
    date: NaiveDate,
    granularity: Granularity,
    category: Option<&CategoryId>,
) -> i64 {
    filter(entries, date, granularity, category)
        .map(|e| e.balance().signed())
        .sum()
}

/// Income and expense for a period, both as positive numbers.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub income: i64,
    pub expense: i64,
}

impl Totals {
    pub fn net(&self) -> i64 {
        self.income - self.expense
    }

    fn add(&mut self, entry: &Entry) {
        match entry.kind() {
            Kind::Income => self.income += entry.balance().amount(),
            Kind::Expense => self.expense += entry.balance().amount(),
        }
    }
}

/// Income and expense totals for the period containing `date`.
pub fn totals(
    entries: &[Entry],
    date: NaiveDate,
    granularity: Granularity,
    category: Option<&CategoryId>,
) -> Totals {
    let mut totals = Totals::default();
    for entry in filter(entries, date, granularity, category) {
        totals.add(entry);
    }
    totals
}

/// The signed total of each day in `month` that has at least one entry.
pub fn daily_totals(entries: &[Entry], month: &CalendarMonth) -> BTreeMap<NaiveDate, i64> {
    let mut days = BTreeMap::new();
    for entry in filter(entries, month.first_day(), Granularity::Month, None) {
        *days.entry(entry.date()).or_insert(0) += entry.balance().signed();
    }
    days
}

/// One category's share of the pie chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub category_id: CategoryId,
    pub name: String,
    pub color: Color,
    /// The unsigned total for the category.
    pub amount: i64,
    /// `amount` divided by the total of all slices.
    pub ratio: f64,
    /// Degrees clockwise from 12 o'clock.
    pub start_angle: f64,
    pub end_angle: f64,
}

/// The per-category breakdown of `kind` entries in the period containing `date`.
///
/// Categories with no entries in the period are left out. Slices follow the categories' display
/// order and tile `0..360` degrees exactly. Entries whose category is unknown are ignored.
pub fn breakdown(
    entries: &[Entry],
    categories: &Categories,
    date: NaiveDate,
    granularity: Granularity,
    kind: Kind,
) -> Vec<Slice> {
    let mut by_category: BTreeMap<&CategoryId, i64> = BTreeMap::new();
    for entry in filter(entries, date, granularity, None).filter(|e| e.kind() == kind) {
        *by_category.entry(entry.category_id()).or_insert(0) += entry.balance().amount();
    }

    let amounts: Vec<(&crate::model::Category, i64)> = categories
        .list(kind)
        .iter()
        .filter_map(|c| match by_category.get(c.id()) {
            Some(&amount) if amount > 0 => Some((c, amount)),
            _ => None,
        })
        .collect();

    let total: i64 = amounts.iter().map(|(_, amount)| amount).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut running = 0;
    amounts
        .into_iter()
        .map(|(category, amount)| {
            let start = running;
            running += amount;
            Slice {
                category_id: category.id().clone(),
                name: category.name().to_string(),
                color: category.color(),
                amount,
                ratio: amount as f64 / total as f64,
                // Angles come from the running integer sum so the last slice ends on 360 exactly.
                start_angle: 360.0 * start as f64 / total as f64,
                end_angle: 360.0 * running as f64 / total as f64,
            }
        })
        .collect()
}

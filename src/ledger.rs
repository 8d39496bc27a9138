use crate::aggregate::{self, Granularity};
use crate::model::{CategoryId, Entry, EntryId};
use chrono::NaiveDate;

/// The in-memory list of entries, always sorted by date and then by creation time.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Ledger {
    entries: Vec<Entry>,
}

impl Ledger {
    pub fn new(mut entries: Vec<Entry>) -> Self {
        sort(&mut entries);
        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn on_day(&self, date: NaiveDate) -> impl Iterator<Item = &Entry> {
        aggregate::filter(&self.entries, date, Granularity::Day, None)
    }

    pub fn in_month(&self, date: NaiveDate) -> impl Iterator<Item = &Entry> {
        aggregate::filter(&self.entries, date, Granularity::Month, None)
    }

    pub fn in_year(&self, date: NaiveDate) -> impl Iterator<Item = &Entry> {
        aggregate::filter(&self.entries, date, Granularity::Year, None)
    }

    /// Entries in the same day, month or year as `date`.
    pub fn filter(
        &self,
        date: NaiveDate,
        granularity: Granularity,
    ) -> impl Iterator<Item = &Entry> {
        aggregate::filter(&self.entries, date, granularity, None)
    }

    /// Entries between `from` and `to`, both inclusive. Either bound may be open.
    pub fn between(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| {
            from.map_or(true, |from| e.date() >= from) && to.map_or(true, |to| e.date() <= to)
        })
    }

    pub(crate) fn insert(&mut self, entry: Entry) {
        self.entries.push(entry);
        sort(&mut self.entries);
    }

    pub(crate) fn replace(&mut self, entry: Entry) {
        self.entries.retain(|e| e.id() != entry.id());
        self.insert(entry);
    }

    pub(crate) fn remove(&mut self, ids: &[EntryId]) {
        self.entries.retain(|e| !ids.contains(e.id()));
    }

    /// True when any entry is recorded against `category_id`.
    pub fn references(&self, category_id: &CategoryId) -> bool {
        self.entries.iter().any(|e| e.category_id() == category_id)
    }
}

fn sort(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        a.date()
            .cmp(&b.date())
            .then_with(|| a.created_at().cmp(&b.created_at()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Balance;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(d: NaiveDate) -> Entry {
        Entry::new(d, "food".into(), Balance::Expense(1), "")
    }

    #[test]
    fn test_sorted_by_date() {
        let ledger = Ledger::new(vec![
            entry(date(2024, 3, 5)),
            entry(date(2024, 1, 1)),
            entry(date(2024, 3, 1)),
        ]);
        let dates: Vec<NaiveDate> = ledger.entries().iter().map(|e| e.date()).collect();
        assert_eq!(
            dates,
            [date(2024, 1, 1), date(2024, 3, 1), date(2024, 3, 5)]
        );
        assert_eq!(ledger.in_month(date(2024, 3, 20)).count(), 2);
        assert_eq!(ledger.in_year(date(2024, 12, 31)).count(), 3);
        assert_eq!(ledger.on_day(date(2024, 3, 1)).count(), 1);
        assert_eq!(ledger.filter(date(2024, 1, 9), Granularity::Month).count(), 1);
    }

    #[test]
    fn test_between() {
        let ledger = Ledger::new(vec![
            entry(date(2024, 1, 1)),
            entry(date(2024, 2, 1)),
            entry(date(2024, 3, 1)),
        ]);
        assert_eq!(ledger.between(Some(date(2024, 2, 1)), None).count(), 2);
        assert_eq!(ledger.between(None, Some(date(2024, 2, 1))).count(), 2);
        assert_eq!(ledger.between(None, None).count(), 3);
    }

    #[test]
    fn test_replace_and_remove() {
        let a = entry(date(2024, 3, 1));
        let b = entry(date(2024, 3, 2));
        let mut ledger = Ledger::new(vec![a.clone(), b.clone()]);

        let moved = a.updated(&crate::model::EntryUpdates {
            date: Some(date(2024, 3, 9)),
            ..Default::default()
        });
        ledger.replace(moved);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries()[1].id(), a.id());

        ledger.remove(&[a.id().clone()]);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(b.id()).is_some());
        assert!(ledger.references(&"food".into()));
    }
}

//! The repository seam between the in-memory caches and wherever the ledger is persisted.

use crate::model::{Category, CategoryId, Entry, EntryId};
use crate::Result;
use anyhow::{bail, ensure};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Persistence for entries and categories.
///
/// Every write either succeeds completely or leaves the store unchanged.
#[async_trait]
pub trait Store: Send + Sync {
    /// All entries, in no particular order.
    async fn list_entries(&self) -> Result<Vec<Entry>>;

    /// Stores a new entry. Fails if the id already exists or the category does not.
    async fn insert_entry(&self, entry: &Entry) -> Result<()>;

    /// Overwrites the entry with the same id. Fails if it does not exist.
    async fn update_entry(&self, entry: &Entry) -> Result<()>;

    /// Deletes every listed entry, or none of them if any id is unknown. An id listed more than
    /// once is deleted once.
    async fn delete_entries(&self, ids: &[EntryId]) -> Result<()>;

    /// All categories, in no particular order.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn insert_category(&self, category: &Category) -> Result<()>;

    /// Overwrites the name, colour and order of the category with the same id.
    async fn update_category(&self, category: &Category) -> Result<()>;

    /// Deletes the category and saves the new `display_order` of the `reordered` categories in one
    /// step. Fails if any entry still refers to the category.
    async fn delete_category(&self, id: &CategoryId, reordered: &[Category]) -> Result<()>;

    /// Saves the `display_order` of each category.
    async fn save_category_orders(&self, categories: &[Category]) -> Result<()>;
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<Entry>,
    categories: Vec<Category>,
}

/// A `Store` that keeps everything in memory. It applies the same integrity rules as the SQLite
/// database so that it can stand in for it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `categories` and `entries`.
    pub fn with_data(categories: Vec<Category>, entries: Vec<Entry>) -> Self {
        Self {
            state: Mutex::new(State {
                entries,
                categories,
            }),
            read_only: AtomicBool::new(false),
        }
    }

    /// While read-only, every write fails and nothing changes.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        ensure!(
            !self.read_only.load(Ordering::SeqCst),
            "The store is read-only"
        );
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_entries(&self) -> Result<Vec<Entry>> {
        Ok(self.state.lock().await.entries.clone())
    }

    async fn insert_entry(&self, entry: &Entry) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        ensure!(
            !state.entries.iter().any(|e| e.id() == entry.id()),
            "Entry already exists: {}",
            entry.id()
        );
        ensure!(
            state.categories.iter().any(|c| c.id() == entry.category_id()),
            "Category not found: {}",
            entry.category_id()
        );
        state.entries.push(entry.clone());
        Ok(())
    }

    async fn update_entry(&self, entry: &Entry) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        ensure!(
            state.categories.iter().any(|c| c.id() == entry.category_id()),
            "Category not found: {}",
            entry.category_id()
        );
        match state.entries.iter_mut().find(|e| e.id() == entry.id()) {
            Some(existing) => *existing = entry.clone(),
            None => bail!("Entry not found: {}", entry.id()),
        }
        Ok(())
    }

    async fn delete_entries(&self, ids: &[EntryId]) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        for id in ids {
            ensure!(
                state.entries.iter().any(|e| e.id() == id),
                "Entry not found: {id}"
            );
        }
        state.entries.retain(|e| !ids.contains(e.id()));
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.state.lock().await.categories.clone())
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        ensure!(
            !state.categories.iter().any(|c| c.id() == category.id()),
            "Category already exists: {}",
            category.id()
        );
        state.categories.push(category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        match state.categories.iter_mut().find(|c| c.id() == category.id()) {
            Some(existing) => *existing = category.clone(),
            None => bail!("Category not found: {}", category.id()),
        }
        Ok(())
    }

    async fn delete_category(&self, id: &CategoryId, reordered: &[Category]) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        ensure!(
            state.categories.iter().any(|c| c.id() == id),
            "Category not found: {id}"
        );
        let references = state.entries.iter().filter(|e| e.category_id() == id).count();
        ensure!(
            references == 0,
            "Category {id} cannot be deleted because {references} entries refer to it"
        );
        state.categories.retain(|c| c.id() != id);
        apply_orders(&mut state.categories, reordered);
        Ok(())
    }

    async fn save_category_orders(&self, categories: &[Category]) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        apply_orders(&mut state.categories, categories);
        Ok(())
    }
}

fn apply_orders(stored: &mut [Category], updated: &[Category]) {
    for category in updated {
        if let Some(existing) = stored.iter_mut().find(|c| c.id() == category.id()) {
            *existing = category.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Balance, Color, Kind};
    use chrono::NaiveDate;

    fn food() -> Category {
        Category::new(Kind::Expense, 0, "Food", Color::new(200, 40, 40))
    }

    fn lunch(category: &Category) -> Entry {
        Entry::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            category.id().clone(),
            Balance::Expense(900),
            "lunch",
        )
    }

    #[tokio::test]
    async fn test_insert_requires_category() {
        let store = MemoryStore::new();
        let category = food();
        assert!(store.insert_entry(&lunch(&category)).await.is_err());
        store.insert_category(&category).await.unwrap();
        store.insert_entry(&lunch(&category)).await.unwrap();
        assert_eq!(store.list_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_entries_is_all_or_nothing() {
        let category = food();
        let a = lunch(&category);
        let b = lunch(&category);
        let store = MemoryStore::with_data(vec![category], vec![a.clone(), b.clone()]);
        let result = store
            .delete_entries(&[a.id().clone(), EntryId::from("missing")])
            .await;
        assert!(result.is_err());
        assert_eq!(store.list_entries().await.unwrap().len(), 2);

        store
            .delete_entries(&[a.id().clone(), b.id().clone()])
            .await
            .unwrap();
        assert!(store.list_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_referenced_category_fails() {
        let category = food();
        let entry = lunch(&category);
        let store = MemoryStore::with_data(vec![category.clone()], vec![entry.clone()]);
        let err = store
            .delete_category(category.id(), &[])
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("1 entries"), "{err}");

        store.delete_entries(&[entry.id().clone()]).await.unwrap();
        store.delete_category(category.id(), &[]).await.unwrap();
        assert!(store.list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_only() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        assert!(store.insert_category(&food()).await.is_err());
        assert!(store.list_categories().await.unwrap().is_empty());
        store.set_read_only(false);
        store.insert_category(&food()).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing() {
        let store = MemoryStore::new();
        let category = food();
        assert!(store.update_category(&category).await.is_err());
        store.insert_category(&category).await.unwrap();
        assert!(store.update_entry(&lunch(&category)).await.is_err());
    }
}

//! This module is responsible for reading, writing and managing the SQLite database

mod migrations;

use crate::model::{
    Balance, Categories, Category, CategoryId, Color, Entry, EntryId, Kind, Snapshot,
};
use crate::store::Store;
use crate::Result;
use anyhow::{bail, ensure, Context};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that there is a SQLite file at `path`
    /// - Creates a SQLite client
    /// - Updates the database schema with migrations if it is out-of-date
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The SQLite database is missing '{}'", path.display());
        }
        Self::connect(path, false).await
    }

    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A file already exists at '{}'", path.display());
        }
        Self::connect(path, true).await
    }

    async fn connect(path: &Path, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            // Backups copy this single file, so no WAL.
            .journal_mode(SqliteJournalMode::Delete)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Unable to open the SQLite database '{}'", path.display()))?;

        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create schema_version table")?;
        let db = Self { pool };
        let current = match db.stored_version().await? {
            Some(version) => version,
            None => {
                sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
                    .execute(&db.pool)
                    .await
                    .context("Failed to insert initial schema version")?;
                0
            }
        };
        let version = migrations::upgrade(&db.pool, current).await?;
        debug!("Opened SQLite database at {} (schema version {version})", path.display());
        Ok(db)
    }

    async fn stored_version(&self) -> Result<Option<i32>> {
        let row: (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
            .fetch_one(&self.pool)
            .await
            .context("Failed to query schema version")?;
        Ok(row.0)
    }

    /// The current schema version.
    #[cfg(test)]
    pub(crate) async fn schema_version(&self) -> Result<i32> {
        Ok(self.stored_version().await?.unwrap_or(0))
    }

    /// Everything in the database, for JSON backups.
    pub(crate) async fn snapshot(&self) -> Result<Snapshot> {
        let categories = Categories::new(self.list_categories().await?);
        let mut entries = self.list_entries().await?;
        entries.sort_by(|a, b| {
            a.date()
                .cmp(&b.date())
                .then_with(|| a.created_at().cmp(&b.created_at()))
        });
        Ok(Snapshot {
            categories,
            entries,
        })
    }

    /// Returns the number of rows in the entries table
    #[cfg(test)]
    pub(crate) async fn count_entries(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count entries")?;
        Ok(row.0 as u64)
    }

    /// Closes the connection pool, flushing everything to disk.
    #[cfg(test)]
    pub(crate) async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for Db {
    async fn list_entries(&self) -> Result<Vec<Entry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, date, category_id, kind, amount, memo, created_at
            FROM entries
            ORDER BY date ASC, created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query entries")?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn insert_entry(&self, entry: &Entry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO entries (id, date, category_id, kind, amount, memo, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id().as_str())
        .bind(entry.date().format(DATE_FORMAT).to_string())
        .bind(entry.category_id().as_str())
        .bind(entry.kind().to_string())
        .bind(entry.balance().amount())
        .bind(entry.memo())
        .bind(entry.created_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert entry {}", entry.id()))?;
        Ok(())
    }

    async fn update_entry(&self, entry: &Entry) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE entries
            SET date = ?, category_id = ?, kind = ?, amount = ?, memo = ?
            WHERE id = ?
            "#,
        )
        .bind(entry.date().format(DATE_FORMAT).to_string())
        .bind(entry.category_id().as_str())
        .bind(entry.kind().to_string())
        .bind(entry.balance().amount())
        .bind(entry.memo())
        .bind(entry.id().as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update entry {}", entry.id()))?;
        ensure!(
            result.rows_affected() == 1,
            "Entry not found: {}",
            entry.id()
        );
        Ok(())
    }

    async fn delete_entries(&self, ids: &[EntryId]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let mut seen: Vec<&EntryId> = Vec::with_capacity(ids.len());
        for id in ids {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            let result = sqlx::query("DELETE FROM entries WHERE id = ?")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to delete entry {id}"))?;
            // Returning early drops `tx`, which rolls back the earlier deletes.
            ensure!(result.rows_affected() == 1, "Entry not found: {id}");
        }
        tx.commit()
            .await
            .context("Failed to commit transaction")?;
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, display_order, name, color
            FROM categories
            ORDER BY kind ASC, display_order ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query categories")?;
        rows.iter().map(category_from_row).collect()
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, kind, display_order, name, color)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id().as_str())
        .bind(category.kind().to_string())
        .bind(category.display_order())
        .bind(category.name())
        .bind(category.color().to_string())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert category '{}'", category.name()))?;
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET display_order = ?, name = ?, color = ?
            WHERE id = ?
            "#,
        )
        .bind(category.display_order())
        .bind(category.name())
        .bind(category.color().to_string())
        .bind(category.id().as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update category {}", category.id()))?;
        ensure!(
            result.rows_affected() == 1,
            "Category not found: {}",
            category.id()
        );
        Ok(())
    }

    async fn delete_category(&self, id: &CategoryId, reordered: &[Category]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!("Failed to delete category {id}, entries may still refer to it")
            })?;
        ensure!(result.rows_affected() == 1, "Category not found: {id}");
        for category in reordered {
            sqlx::query("UPDATE categories SET display_order = ? WHERE id = ?")
                .bind(category.display_order())
                .bind(category.id().as_str())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to reorder category {}", category.id()))?;
        }
        tx.commit()
            .await
            .context("Failed to commit transaction")?;
        Ok(())
    }

    async fn save_category_orders(&self, categories: &[Category]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        for category in categories {
            sqlx::query("UPDATE categories SET display_order = ? WHERE id = ?")
                .bind(category.display_order())
                .bind(category.id().as_str())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to reorder category {}", category.id()))?;
        }
        tx.commit()
            .await
            .context("Failed to commit transaction")?;
        Ok(())
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<Entry> {
    let id: String = row.try_get("id")?;
    let date: String = row.try_get("date")?;
    let category_id: String = row.try_get("category_id")?;
    let kind: String = row.try_get("kind")?;
    let amount: i64 = row.try_get("amount")?;
    let memo: String = row.try_get("memo")?;
    let created_at: String = row.try_get("created_at")?;

    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .with_context(|| format!("Invalid date '{date}' on entry {id}"))?;
    let kind: Kind = kind
        .parse()
        .with_context(|| format!("Invalid kind '{kind}' on entry {id}"))?;
    let balance = Balance::new(kind, amount)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .with_context(|| format!("Invalid created_at '{created_at}' on entry {id}"))?
        .with_timezone(&Utc);

    Ok(Entry::from_parts(
        EntryId::from(id),
        date,
        CategoryId::from(category_id),
        balance,
        memo,
        created_at,
    ))
}

fn category_from_row(row: &SqliteRow) -> Result<Category> {
    let id: String = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;
    let display_order: u32 = row.try_get("display_order")?;
    let name: String = row.try_get("name")?;
    let color: String = row.try_get("color")?;

    let kind: Kind = kind
        .parse()
        .with_context(|| format!("Invalid kind '{kind}' on category {id}"))?;
    let color: Color = color
        .parse()
        .with_context(|| format!("Invalid color on category {id}"))?;
    Ok(Category::from_parts(
        CategoryId::from(id),
        kind,
        display_order,
        name,
        color,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn new_db() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("kakeibo.sqlite")).await.unwrap();
        (dir, db)
    }

    fn category(kind: Kind, order: u32, name: &str) -> Category {
        Category::new(kind, order, name, Color::new(0x12, 0x34, 0x56))
    }

    #[tokio::test]
    async fn test_init_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kakeibo.sqlite");
        assert!(Db::load(&path).await.is_err());

        let db = Db::init(&path).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), 1);
        let food = category(Kind::Expense, 0, "Food");
        db.insert_category(&food).await.unwrap();
        db.close().await;

        assert!(Db::init(&path).await.is_err());
        let db = Db::load(&path).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), 1);
        assert_eq!(db.list_categories().await.unwrap(), vec![food]);
    }

    #[tokio::test]
    async fn test_entries_round_trip() {
        let (_dir, db) = new_db().await;
        let food = category(Kind::Expense, 0, "Food");
        db.insert_category(&food).await.unwrap();

        let entry = Entry::new(
            date(2024, 3, 1),
            food.id().clone(),
            Balance::Expense(1200),
            "lunch",
        );
        db.insert_entry(&entry).await.unwrap();
        let listed = db.list_entries().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), entry.id());
        assert_eq!(listed[0].date(), entry.date());
        assert_eq!(listed[0].balance(), Balance::Expense(1200));
        assert_eq!(listed[0].memo(), "lunch");
        assert_eq!(
            listed[0].created_at().timestamp_micros(),
            entry.created_at().timestamp_micros()
        );
        assert_eq!(db.count_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_entry_requires_category() {
        let (_dir, db) = new_db().await;
        let entry = Entry::new(
            date(2024, 3, 1),
            CategoryId::from("missing"),
            Balance::Expense(1),
            "",
        );
        assert!(db.insert_entry(&entry).await.is_err());
        assert_eq!(db.count_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_entry() {
        let (_dir, db) = new_db().await;
        let food = category(Kind::Expense, 0, "Food");
        db.insert_category(&food).await.unwrap();
        let entry = Entry::new(date(2024, 3, 1), food.id().clone(), Balance::Expense(1), "");
        assert!(db.update_entry(&entry).await.is_err());

        db.insert_entry(&entry).await.unwrap();
        let updated = entry.updated(&crate::model::EntryUpdates {
            memo: Some("dinner".to_string()),
            balance: Some(Balance::Expense(3000)),
            ..Default::default()
        });
        db.update_entry(&updated).await.unwrap();
        let listed = db.list_entries().await.unwrap();
        assert_eq!(listed[0].memo(), "dinner");
        assert_eq!(listed[0].balance().amount(), 3000);
    }

    #[tokio::test]
    async fn test_delete_entries_rolls_back() {
        let (_dir, db) = new_db().await;
        let food = category(Kind::Expense, 0, "Food");
        db.insert_category(&food).await.unwrap();
        let a = Entry::new(date(2024, 3, 1), food.id().clone(), Balance::Expense(1), "");
        let b = Entry::new(date(2024, 3, 2), food.id().clone(), Balance::Expense(2), "");
        db.insert_entry(&a).await.unwrap();
        db.insert_entry(&b).await.unwrap();

        let result = db
            .delete_entries(&[a.id().clone(), EntryId::from("missing")])
            .await;
        assert!(result.is_err());
        assert_eq!(db.count_entries().await.unwrap(), 2);

        db.delete_entries(&[a.id().clone()]).await.unwrap();
        assert_eq!(db.count_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_entries_duplicate_ids() {
        let (_dir, db) = new_db().await;
        let food = category(Kind::Expense, 0, "Food");
        db.insert_category(&food).await.unwrap();
        let a = Entry::new(date(2024, 3, 1), food.id().clone(), Balance::Expense(1), "");
        let b = Entry::new(date(2024, 3, 2), food.id().clone(), Balance::Expense(2), "");
        db.insert_entry(&a).await.unwrap();
        db.insert_entry(&b).await.unwrap();

        db.delete_entries(&[a.id().clone(), a.id().clone()])
            .await
            .unwrap();
        let listed = db.list_entries().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), b.id());
    }

    /// Runs one sequence of writes, some of which must fail, and returns whether each succeeded
    /// along with the final contents of the store.
    async fn write_sequence<S: Store>(
        store: &S,
    ) -> (Vec<bool>, Vec<(String, i64, String)>, Categories) {
        let food = Category::from_parts(
            CategoryId::from("food"),
            Kind::Expense,
            0,
            "Food",
            Color::new(1, 1, 1),
        );
        let rent = Category::from_parts(
            CategoryId::from("rent"),
            Kind::Expense,
            1,
            "Rent",
            Color::new(2, 2, 2),
        );
        let a = Entry::from_parts(
            EntryId::from("a"),
            date(2024, 3, 1),
            food.id().clone(),
            Balance::Expense(100),
            "a",
            Utc::now(),
        );
        let b = Entry::from_parts(
            EntryId::from("b"),
            date(2024, 3, 2),
            rent.id().clone(),
            Balance::Expense(200),
            "b",
            Utc::now(),
        );
        let orphan = Entry::from_parts(
            EntryId::from("orphan"),
            date(2024, 3, 3),
            CategoryId::from("missing"),
            Balance::Expense(300),
            "",
            Utc::now(),
        );
        let renamed = a.updated(&crate::model::EntryUpdates {
            memo: Some("a2".to_string()),
            ..Default::default()
        });
        let mut remaining = Categories::new(vec![food.clone(), rent.clone()]);
        remaining.remove(rent.id()).unwrap();
        let reordered = remaining.list(Kind::Expense).to_vec();

        let outcomes = vec![
            store.insert_category(&food).await.is_ok(),
            store.insert_category(&rent).await.is_ok(),
            store.insert_entry(&a).await.is_ok(),
            store.insert_entry(&b).await.is_ok(),
            store.insert_entry(&a).await.is_ok(),
            store.insert_entry(&orphan).await.is_ok(),
            store.update_entry(&renamed).await.is_ok(),
            store.update_entry(&orphan).await.is_ok(),
            store
                .delete_entries(&[a.id().clone(), EntryId::from("missing")])
                .await
                .is_ok(),
            store.delete_category(rent.id(), &reordered).await.is_ok(),
            store
                .delete_entries(&[b.id().clone(), b.id().clone()])
                .await
                .is_ok(),
            store.delete_category(rent.id(), &reordered).await.is_ok(),
            store.delete_category(food.id(), &[]).await.is_ok(),
        ];

        let mut entries: Vec<(String, i64, String)> = store
            .list_entries()
            .await
            .unwrap()
            .iter()
            .map(|e| (e.id().to_string(), e.balance().signed(), e.memo().to_string()))
            .collect();
        entries.sort();
        let categories = Categories::new(store.list_categories().await.unwrap());
        (outcomes, entries, categories)
    }

    #[tokio::test]
    async fn test_memory_store_matches_sqlite() {
        let (_dir, db) = new_db().await;
        let memory = crate::store::MemoryStore::new();

        let from_db = write_sequence(&db).await;
        let from_memory = write_sequence(&memory).await;
        assert_eq!(from_db, from_memory);

        let (outcomes, entries, categories) = from_db;
        assert_eq!(
            outcomes,
            vec![true, true, true, true, false, false, true, false, false, false, true, true, false]
        );
        assert_eq!(entries, vec![("a".to_string(), -100, "a2".to_string())]);
        assert_eq!(categories.len(), 1);
        categories.validate().unwrap();
    }

    #[tokio::test]
    async fn test_delete_category() {
        let (_dir, db) = new_db().await;
        let mut categories = Categories::default();
        for name in ["Food", "Rent", "Fun"] {
            let c = category(Kind::Expense, categories.next_order(Kind::Expense), name);
            db.insert_category(&c).await.unwrap();
            categories.push(c).unwrap();
        }
        let food = categories.list(Kind::Expense)[0].clone();
        let entry = Entry::new(date(2024, 3, 1), food.id().clone(), Balance::Expense(1), "");
        db.insert_entry(&entry).await.unwrap();

        // Referenced by an entry.
        categories.remove(food.id()).unwrap();
        assert!(db
            .delete_category(food.id(), categories.list(Kind::Expense))
            .await
            .is_err());
        assert_eq!(db.list_categories().await.unwrap().len(), 3);

        db.delete_entries(&[entry.id().clone()]).await.unwrap();
        db.delete_category(food.id(), categories.list(Kind::Expense))
            .await
            .unwrap();

        let loaded = Categories::new(db.list_categories().await.unwrap());
        loaded.validate().unwrap();
        let names: Vec<&str> = loaded
            .list(Kind::Expense)
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(names, ["Rent", "Fun"]);
    }

    #[tokio::test]
    async fn test_save_category_orders() {
        let (_dir, db) = new_db().await;
        let mut categories = Categories::default();
        for name in ["A", "B", "C"] {
            let c = category(Kind::Income, categories.next_order(Kind::Income), name);
            db.insert_category(&c).await.unwrap();
            categories.push(c).unwrap();
        }
        let c = categories.list(Kind::Income)[2].id().clone();
        categories.move_to(&c, 0).unwrap();
        db.save_category_orders(categories.list(Kind::Income))
            .await
            .unwrap();

        let loaded = Categories::new(db.list_categories().await.unwrap());
        assert_eq!(loaded, categories);
    }

    #[tokio::test]
    async fn test_snapshot() {
        let (_dir, db) = new_db().await;
        let pay = category(Kind::Income, 0, "Pay");
        db.insert_category(&pay).await.unwrap();
        let entry = Entry::new(date(2024, 3, 25), pay.id().clone(), Balance::Income(250000), "");
        db.insert_entry(&entry).await.unwrap();

        let snapshot = db.snapshot().await.unwrap();
        assert_eq!(snapshot.categories.len(), 1);
        assert_eq!(snapshot.entries.len(), 1);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("250000"));
    }
}

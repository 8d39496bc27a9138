//! Schema upgrades for the ledger database.
//!
//! `STEPS[n]` takes a database at schema version `n` to version `n + 1`, so a fresh file is at
//! version 0 and this build expects [`SCHEMA_VERSION`]. Databases are upgraded when opened and
//! never downgraded.

use anyhow::{ensure, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::Result;

const STEPS: &[&str] = &[include_str!("migration_01_up.sql")];

/// The schema version this build of kakeibo reads and writes.
pub(crate) const SCHEMA_VERSION: i32 = STEPS.len() as i32;

/// Applies each step after version `from` and returns the resulting version.
///
/// Every step runs in its own transaction along with the version bump, so a failed step leaves the
/// database at the last version that completed.
pub(crate) async fn upgrade(pool: &SqlitePool, from: i32) -> Result<i32> {
    ensure!(from >= 0, "Invalid schema version {from}");
    ensure!(
        from <= SCHEMA_VERSION,
        "The database schema version {from} is newer than this program supports ({SCHEMA_VERSION})"
    );
    if from == SCHEMA_VERSION {
        debug!("Ledger schema is up to date at version {from}");
        return Ok(from);
    }

    for (version, sql) in (1..).zip(STEPS).skip(from as usize) {
        debug!("Upgrading the ledger schema to version {version}");
        apply(pool, sql, version)
            .await
            .with_context(|| format!("Unable to upgrade the ledger schema to version {version}"))?;
    }
    Ok(SCHEMA_VERSION)
}

async fn apply(pool: &SqlitePool, sql: &str, version: i32) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    tx.execute(sql).await.context("Failed to run the schema SQL")?;
    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(version)
        .execute(&mut *tx)
        .await
        .context("Failed to record the schema version")?;
    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use tempfile::TempDir;

    /// A database file holding only `schema_version` at `version`.
    async fn versioned_pool(version: i32) -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("ledger.sqlite"))
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&pool)
            .await
            .unwrap();
        (dir, pool)
    }

    async fn stored_version(pool: &SqlitePool) -> i32 {
        let (version,): (i32,) = sqlx::query_as("SELECT version FROM schema_version")
            .fetch_one(pool)
            .await
            .unwrap();
        version
    }

    async fn tables(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upgrade_fresh_database() {
        let (_dir, pool) = versioned_pool(0).await;
        assert_eq!(upgrade(&pool, 0).await.unwrap(), SCHEMA_VERSION);
        assert_eq!(stored_version(&pool).await, SCHEMA_VERSION);
        assert_eq!(tables(&pool).await, ["categories", "entries", "schema_version"]);

        // Already current, so nothing runs a second time.
        assert_eq!(upgrade(&pool, SCHEMA_VERSION).await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_upgrade_rejects_unknown_versions() {
        let (_dir, pool) = versioned_pool(0).await;
        let e = upgrade(&pool, SCHEMA_VERSION + 1).await.unwrap_err();
        assert!(e.to_string().contains("newer than this program supports"));
        assert!(upgrade(&pool, -1).await.is_err());
        assert_eq!(stored_version(&pool).await, 0);
        assert_eq!(tables(&pool).await, ["schema_version"]);
    }

    #[tokio::test]
    async fn test_failed_step_keeps_version() {
        let (_dir, pool) = versioned_pool(0).await;
        // A table already named `entries` makes the first step fail part way through.
        sqlx::query("CREATE TABLE entries (id TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        let e = upgrade(&pool, 0).await.unwrap_err();
        assert!(format!("{e:#}").contains("version 1"));
        assert_eq!(stored_version(&pool).await, 0);
        assert_eq!(tables(&pool).await, ["entries", "schema_version"]);
    }

    #[tokio::test]
    async fn test_amount_limit_enforced_by_schema() {
        let (_dir, pool) = versioned_pool(0).await;
        upgrade(&pool, 0).await.unwrap();
        sqlx::query(
            "INSERT INTO categories (id, kind, display_order, name, color) \
             VALUES ('c', 'income', 0, 'Salary', '#000000')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let insert = "INSERT INTO entries (id, date, category_id, kind, amount, created_at) \
                      VALUES (?, '2024-03-01', 'c', 'income', ?, '2024-03-01T00:00:00Z')";
        sqlx::query(insert)
            .bind("ok")
            .bind(1_000_000_000_000i64)
            .execute(&pool)
            .await
            .unwrap();
        for (id, amount) in [("big", 1_000_000_000_001i64), ("negative", -1)] {
            let result = sqlx::query(insert).bind(id).bind(amount).execute(&pool).await;
            assert!(result.is_err(), "{amount} was accepted");
        }
    }
}

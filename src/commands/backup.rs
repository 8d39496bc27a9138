use crate::backup::BackupFiles;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;

/// Writes a JSON snapshot of every category and entry, and a copy of the SQLite file, to the
/// backups directory. Older backups beyond the configured count are removed.
pub async fn backup(config: Config) -> Result<Out<BackupFiles>> {
    let snapshot = config
        .db()
        .snapshot()
        .await
        .context("Unable to read the ledger for backup")
        .pub_result(ErrorType::Database)?;
    let files = config
        .backup()
        .save_all(&snapshot)
        .await
        .pub_result(ErrorType::Internal)?;
    let message = format!(
        "Backed up {} categories and {} entries to {} and {}",
        snapshot.categories.len(),
        snapshot.entries.len(),
        files.snapshot.display(),
        files.sqlite.display()
    );
    Ok(Out::new(message, files))
}

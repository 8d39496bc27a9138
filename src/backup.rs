//! Backups of the ledger in `.backups/`: JSON snapshots and copies of the SQLite file.
//!
//! Files are named `<stem>.<YYYY-MM-DD>-<NNN><suffix>`, for example `snapshot.2024-03-01-002.json`
//! or `kakeibo.sqlite.2024-03-01-001`, where `NNN` counts up within a day. Each kind is pruned to
//! the newest `backup_copies` files after every write.

use crate::model::Snapshot;
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Kind {
    Snapshot,
    Sqlite,
}

impl Kind {
    fn stem(self) -> &'static str {
        match self {
            Kind::Snapshot => "snapshot",
            Kind::Sqlite => crate::config::KAKEIBO_SQLITE,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Kind::Snapshot => ".json",
            Kind::Sqlite => "",
        }
    }
}

/// A parsed backup filename. Ordering is oldest first.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
struct BackupName {
    date: NaiveDate,
    seq: u32,
}

impl BackupName {
    fn parse(kind: Kind, filename: &str) -> Option<Self> {
        let rest = filename
            .strip_prefix(kind.stem())?
            .strip_prefix('.')?
            .strip_suffix(kind.suffix())?;
        let (date, seq) = rest.rsplit_once('-')?;
        if seq.len() < 3 || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            date: NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?,
            seq: seq.parse().ok()?,
        })
    }

    fn filename(&self, kind: Kind) -> String {
        format!("{}.{self}{}", kind.stem(), kind.suffix())
    }
}

impl Display for BackupName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:03}", self.date.format(DATE_FORMAT), self.seq)
    }
}

/// Writes and prunes backups. Obtained from [`Config::backup`].
#[derive(Debug, Clone)]
pub struct Backup {
    dir: PathBuf,
    keep: u32,
    sqlite_path: PathBuf,
}

/// The files written by one call to [`Backup::save_all`].
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct BackupFiles {
    pub snapshot: PathBuf,
    pub sqlite: PathBuf,
}

impl Backup {
    pub fn new(config: &Config) -> Self {
        Self {
            dir: config.backups().to_path_buf(),
            keep: config.backup_copies(),
            sqlite_path: config.sqlite_path().to_path_buf(),
        }
    }

    /// Writes `snapshot` as pretty JSON and returns the new file.
    pub async fn save_json(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(snapshot).context("Unable to serialize snapshot")?;
        let path = self.next_path(Kind::Snapshot).await?;
        utils::write(&path, json).await?;
        debug!("Wrote {}", path.display());
        self.prune(Kind::Snapshot).await?;
        Ok(path)
    }

    /// Copies the SQLite file and returns the copy.
    pub async fn copy_sqlite(&self) -> Result<PathBuf> {
        let path = self.next_path(Kind::Sqlite).await?;
        utils::copy(&self.sqlite_path, &path).await?;
        debug!("Wrote {}", path.display());
        self.prune(Kind::Sqlite).await?;
        Ok(path)
    }

    pub async fn save_all(&self, snapshot: &Snapshot) -> Result<BackupFiles> {
        Ok(BackupFiles {
            snapshot: self.save_json(snapshot).await?,
            sqlite: self.copy_sqlite().await?,
        })
    }

    async fn existing(&self, kind: Kind) -> Result<Vec<(BackupName, PathBuf)>> {
        let mut found = Vec::new();
        let mut dir = utils::read_dir(&self.dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .with_context(|| format!("Unable to list {}", self.dir.display()))?
        {
            if let Some(name) = BackupName::parse(kind, &entry.file_name().to_string_lossy()) {
                found.push((name, entry.path()));
            }
        }
        found.sort();
        Ok(found)
    }

    async fn next_path(&self, kind: Kind) -> Result<PathBuf> {
        let date = Local::now().date_naive();
        let seq = self
            .existing(kind)
            .await?
            .iter()
            .filter(|(name, _)| name.date == date)
            .map(|(name, _)| name.seq)
            .max()
            .unwrap_or(0)
            + 1;
        Ok(self.dir.join(BackupName { date, seq }.filename(kind)))
    }

    async fn prune(&self, kind: Kind) -> Result<()> {
        let existing = self.existing(kind).await?;
        let excess = existing.len().saturating_sub(self.keep as usize);
        for (_, path) in existing.into_iter().take(excess) {
            debug!("Removing old backup {}", path.display());
            utils::remove(&path).await?;
        }
        Ok(())
    }
}

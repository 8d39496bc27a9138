//! Entry command handlers.

use crate::args::{EntryDeleteArgs, EntryExportArgs, EntryInsertArgs, EntryListArgs, EntryUpdateArgs};
use crate::commands::{open, plural, resolve_category, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Amount, Categories, Entry, EntryUpdates, Kind};
use crate::{utils, Config, Result};
use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt::Write;
use tracing::debug;

/// Records a new income or expense entry.
///
/// The category may be given by id or by name. A name only matches categories of the same kind as
/// the amount, so `--expense 500 --category Other` picks the expense category named "Other".
///
/// # Errors
///
/// - Returns an error if neither `--income` nor `--expense` is given.
/// - Returns an error if the amount is negative or above [`MAX_AMOUNT`](crate::model::MAX_AMOUNT).
/// - Returns an error if the category does not exist or is of the other kind.
/// - Returns an error if a database operation fails.
pub async fn insert_entry(config: Config, args: EntryInsertArgs) -> Result<Out<Entry>> {
    let balance = args
        .balance
        .balance()
        .pub_result(ErrorType::Request)?
        .ok_or_else(|| anyhow!("Either --income or --expense is required"))
        .pub_result(ErrorType::Request)?;

    let mut context = open(&config).await?;
    let category = resolve_category(context.categories(), &args.category, Some(balance.kind()))?
        .clone();
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let entry = context
        .add_entry(
            date,
            category.id().clone(),
            balance,
            args.memo.unwrap_or_default(),
        )
        .await?;

    let message = format!(
        "Recorded {} {} on {} in {} ({})",
        entry.kind(),
        Amount::new(entry.balance().amount()),
        entry.date(),
        category.name(),
        entry.id()
    );
    Ok(Out::new(message, entry))
}

/// Changes the given fields of an existing entry.
///
/// When only `--category` changes, the new category must be of the entry's current kind. When the
/// amount switches between income and expense, the category must switch too.
pub async fn update_entry(config: Config, args: EntryUpdateArgs) -> Result<Out<Entry>> {
    let mut context = open(&config).await?;
    let existing = context
        .ledger()
        .get(&args.id)
        .ok_or_else(|| anyhow!("Entry not found: {}", args.id))
        .pub_result(ErrorType::Request)?
        .clone();

    let balance = args.balance.balance().pub_result(ErrorType::Request)?;
    let kind = balance.map(|b| b.kind()).unwrap_or_else(|| existing.kind());
    let category_id = match &args.category {
        Some(reference) => Some(
            resolve_category(context.categories(), reference, Some(kind))?
                .id()
                .clone(),
        ),
        None => None,
    };

    let updates = EntryUpdates {
        date: args.date,
        category_id,
        balance,
        memo: args.memo.clone(),
    };
    if updates.is_empty() {
        return Ok(Out::new(
            format!("Nothing to change for entry {}", existing.id()),
            existing,
        ));
    }

    let updated = context.update_entry(&args.id, &updates).await?;
    Ok(Out::new(format!("Updated entry {}", updated.id()), updated))
}

/// Deletes one or more entries by id atomically.
///
/// This operation is all-or-nothing: either all specified entries are deleted, or none are. A
/// copy of the SQLite database is written to the backups directory first.
pub async fn delete_entries(config: Config, args: EntryDeleteArgs) -> Result<Out<Vec<Entry>>> {
    let mut context = open(&config).await?;
    for id in &args.ids {
        if context.ledger().get(id).is_none() {
            return Err(anyhow!("Entry not found: {id}")).pub_result(ErrorType::Request);
        }
    }

    let backup = config
        .backup()
        .copy_sqlite()
        .await
        .pub_result(ErrorType::Internal)?;
    debug!("Backed up the database to {}", backup.display());

    let deleted = context.delete_entries(&args.ids).await?;
    let message = format!("Deleted {}", plural(deleted.len(), "entry", "entries"));
    Ok(Out::new(message, deleted))
}

/// Lists the entries in a day, month or year (the current month by default), optionally only
/// those in one category.
pub async fn list_entries(config: Config, args: EntryListArgs) -> Result<Out<Vec<Entry>>> {
    let context = open(&config).await?;
    let (date, granularity) = args
        .period
        .resolve(Local::now().date_naive())
        .pub_result(ErrorType::Request)?;
    let category = match &args.category {
        Some(reference) => Some(resolve_category(context.categories(), reference, None)?.id()),
        None => None,
    };

    let entries: Vec<Entry> = context
        .ledger()
        .filter(date, granularity)
        .filter(|e| category.map_or(true, |id| e.category_id() == id))
        .cloned()
        .collect();

    let mut message = format!(
        "{} in {}",
        plural(entries.len(), "entry", "entries"),
        describe_period(date, granularity)
    );
    for entry in &entries {
        let _ = write!(message, "\n{}", entry_line(entry, context.categories()));
    }
    Ok(Out::new(message, entries))
}

/// One row of the CSV export.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    date: NaiveDate,
    kind: Kind,
    category: &'a str,
    amount: i64,
    signed_amount: i64,
    memo: &'a str,
    created_at: String,
}

/// Writes entries to CSV, either to `--out` or, when no file is given, to stdout.
///
/// Every entry is exported with `--all`, otherwise the selected period (the current month by
/// default).
pub async fn export_entries(config: Config, args: EntryExportArgs) -> Result<Out<usize>> {
    let context = open(&config).await?;
    let (entries, scope): (Vec<&Entry>, String) = if args.all {
        (
            context.ledger().entries().iter().collect(),
            "all time".to_string(),
        )
    } else {
        let (date, granularity) = args
            .period
            .resolve(Local::now().date_naive())
            .pub_result(ErrorType::Request)?;
        (
            context.ledger().filter(date, granularity).collect(),
            describe_period(date, granularity),
        )
    };

    let csv = to_csv(&entries, context.categories()).pub_result(ErrorType::Internal)?;
    let count = entries.len();
    let message = match &args.out {
        Some(path) => {
            utils::write(path, csv)
                .await
                .pub_result(ErrorType::Request)?;
            format!(
                "Exported {} for {scope} to {}",
                plural(count, "entry", "entries"),
                path.display()
            )
        }
        None => {
            print!("{csv}");
            format!("Exported {} for {scope}", plural(count, "entry", "entries"))
        }
    };
    Ok(Out::new(message, count))
}

fn to_csv(entries: &[&Entry], categories: &Categories) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in entries {
        let category = categories
            .get(entry.category_id())
            .map(|c| c.name())
            .unwrap_or_default();
        writer
            .serialize(CsvRow {
                id: entry.id().as_str(),
                date: entry.date(),
                kind: entry.kind(),
                category,
                amount: entry.balance().amount(),
                signed_amount: entry.balance().signed(),
                memo: entry.memo(),
                created_at: entry.created_at().to_rfc3339(),
            })
            .context("Unable to write CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Unable to finish CSV output: {e}"))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// e.g. "2024-03-01  expense  ¥1,200  Food  lunch  (id)"
pub(super) fn entry_line(entry: &Entry, categories: &Categories) -> String {
    let category = categories
        .get(entry.category_id())
        .map(|c| c.name())
        .unwrap_or("?");
    let mut line = format!(
        "{}  {:<7}  {:>12}  {}",
        entry.date(),
        entry.kind(),
        Amount::new(entry.balance().amount()).to_string(),
        category
    );
    if !entry.memo().is_empty() {
        let _ = write!(line, "  {}", entry.memo());
    }
    let _ = write!(line, "  ({})", entry.id());
    line
}

pub(super) fn describe_period(date: NaiveDate, granularity: crate::aggregate::Granularity) -> String {
    use crate::aggregate::Granularity;
    match granularity {
        Granularity::Day => date.format("%Y-%m-%d").to_string(),
        Granularity::Month => date.format("%Y-%m").to_string(),
        Granularity::Year => date.format("%Y").to_string(),
    }
}

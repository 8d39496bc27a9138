use crate::args::InitArgs;
use crate::commands::Out;
use crate::context::Context;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Category, Color, Kind};
use crate::{Config, Result};
use anyhow::Context as _;
use std::path::Path;

/// The categories a new ledger starts with, in display order.
const STARTER_CATEGORIES: [(Kind, &str, Color); 11] = [
    (Kind::Income, "Salary", Color::new(0x2e, 0x7d, 0x32)),
    (Kind::Income, "Bonus", Color::new(0x66, 0xbb, 0x6a)),
    (Kind::Income, "Other income", Color::new(0x9c, 0xcc, 0x65)),
    (Kind::Expense, "Food", Color::new(0xef, 0x6c, 0x00)),
    (Kind::Expense, "Daily goods", Color::new(0xff, 0xa7, 0x26)),
    (Kind::Expense, "Housing", Color::new(0x15, 0x65, 0xc0)),
    (Kind::Expense, "Utilities", Color::new(0x00, 0x83, 0x8f)),
    (Kind::Expense, "Transport", Color::new(0x6a, 0x1b, 0x9a)),
    (Kind::Expense, "Entertainment", Color::new(0xd8, 0x1b, 0x60)),
    (Kind::Expense, "Medical", Color::new(0xc6, 0x28, 0x28)),
    (Kind::Expense, "Other", Color::new(0x9e, 0x9e, 0x9e)),
];

/// Creates the data directory, its subdirectories and:
/// - An initial `config.json` holding the week start and the number of backups to keep
/// - An empty SQLite ledger, plus the starter categories unless `--no-default-categories` is given
///
/// # Arguments
/// - `kakeibo_home` - The directory that will be the root of data directory, e.g. `$HOME/kakeibo`
/// - `args` - The `init` options
///
/// # Errors
/// - Returns an error if any file operations fail or if `kakeibo_home` already holds a ledger.
pub async fn init(kakeibo_home: &Path, args: InitArgs) -> Result<Out<Vec<Category>>> {
    let config = Config::create(kakeibo_home, args.week_start(), args.backup_copies())
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;

    let mut created = Vec::new();
    if args.default_categories() {
        let mut context = Context::load(config.db().clone()).await?;
        for (kind, name, color) in STARTER_CATEGORIES {
            created.push(context.add_category(kind, name, color).await?);
        }
    }

    let message = format!(
        "Successfully created the kakeibo directory at {} with {} categories",
        config.root().display(),
        created.len()
    );
    Ok(Out::new(message, created))
}

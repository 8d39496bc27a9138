//! Category command handlers.

use crate::args::{
    CategoryDeleteArgs, CategoryInsertArgs, CategoryListArgs, CategoryMoveArgs, CategoryUpdateArgs,
};
use crate::commands::{open, plural, resolve_category, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Category, CategoryUpdates, Color, Kind};
use crate::{Config, Result};
use std::fmt::Write;
use tracing::debug;

/// The colour given to categories created without `--color`.
pub const DEFAULT_COLOR: Color = Color::new(0x9e, 0x9e, 0x9e);

/// Adds a category at the end of its kind's list.
pub async fn insert_category(config: Config, args: CategoryInsertArgs) -> Result<Out<Category>> {
    let mut context = open(&config).await?;
    let color = args.color.unwrap_or(DEFAULT_COLOR);
    let category = context.add_category(args.kind, &args.name, color).await?;
    let message = format!(
        "Added {} category '{}' at position {} ({})",
        category.kind(),
        category.name(),
        category.display_order(),
        category.id()
    );
    Ok(Out::new(message, category))
}

/// Renames and/or recolours a category.
pub async fn update_category(config: Config, args: CategoryUpdateArgs) -> Result<Out<Category>> {
    let mut context = open(&config).await?;
    let existing = resolve_category(context.categories(), &args.category, None)?.clone();
    let updates = CategoryUpdates {
        name: args.name,
        color: args.color,
    };
    if updates.name.is_none() && updates.color.is_none() {
        return Ok(Out::new(
            format!("Nothing to change for category '{}'", existing.name()),
            existing,
        ));
    }
    let updated = context.update_category(existing.id(), &updates).await?;
    let message = format!(
        "Updated {} category '{}' ({})",
        updated.kind(),
        updated.name(),
        updated.color()
    );
    Ok(Out::new(message, updated))
}

/// Deletes a category that no entry refers to. A copy of the SQLite database is written to the
/// backups directory first.
pub async fn delete_category(config: Config, args: CategoryDeleteArgs) -> Result<Out<Category>> {
    let mut context = open(&config).await?;
    let existing = resolve_category(context.categories(), &args.category, None)?.clone();
    // A referenced category is refused below, so there is nothing to back up for it.
    if !context.ledger().references(existing.id()) {
        let backup = config
            .backup()
            .copy_sqlite()
            .await
            .pub_result(ErrorType::Internal)?;
        debug!("Backed up the database to {}", backup.display());
    }

    let removed = context.delete_category(existing.id()).await?;
    let message = format!(
        "Deleted {} category '{}'",
        removed.kind(),
        removed.name()
    );
    Ok(Out::new(message, removed))
}

/// Moves a category within its kind's list and returns the list in its new order.
pub async fn move_category(config: Config, args: CategoryMoveArgs) -> Result<Out<Vec<Category>>> {
    let mut context = open(&config).await?;
    let existing = resolve_category(context.categories(), &args.category, None)?.clone();
    let list = context
        .move_category(existing.id(), args.to)
        .await?
        .to_vec();
    let mut message = format!("Moved '{}'", existing.name());
    write_list(&mut message, existing.kind(), &list);
    Ok(Out::new(message, list))
}

/// Lists categories in display order, income first.
pub async fn list_categories(
    config: Config,
    args: CategoryListArgs,
) -> Result<Out<Vec<Category>>> {
    let mut context = open(&config).await?;
    if context.repair_category_orders().await? {
        debug!("Repaired the stored category order");
    }

    let kinds = match args.kind {
        Some(kind) => vec![kind],
        None => Kind::ALL.to_vec(),
    };
    let mut listed = Vec::new();
    let mut message = plural(
        kinds
            .iter()
            .map(|&k| context.categories().list(k).len())
            .sum(),
        "category",
        "categories",
    );
    for kind in kinds {
        let list = context.categories().list(kind);
        write_list(&mut message, kind, list);
        listed.extend_from_slice(list);
    }
    Ok(Out::new(message, listed))
}

fn write_list(message: &mut String, kind: Kind, list: &[Category]) {
    let _ = write!(message, "\n{kind}:");
    if list.is_empty() {
        message.push_str("\n  (none)");
    }
    for category in list {
        let _ = write!(
            message,
            "\n  {:>2}  {}  {}  ({})",
            category.display_order(),
            category.color(),
            category.name(),
            category.id()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_insert_category_default_color() {
        let env = TestEnv::new().await;
        env.insert_test_categories().await;
        let args = CategoryInsertArgs {
            kind: Kind::Expense,
            name: "Travel".to_string(),
            color: None,
        };
        let out = insert_category(env.config(), args).await.unwrap();
        let category = out.structure().unwrap();
        assert_eq!(category.color(), DEFAULT_COLOR);
        assert_eq!(category.display_order(), 2);
    }

    #[tokio::test]
    async fn test_insert_category_duplicate_name() {
        let env = TestEnv::new().await;
        env.insert_test_categories().await;
        let args = CategoryInsertArgs {
            kind: Kind::Expense,
            name: "food".to_string(),
            color: None,
        };
        let e = insert_category(env.config(), args).await.unwrap_err();
        assert_eq!(ErrorType::of(&e), Some(ErrorType::Request));
    }

    #[tokio::test]
    async fn test_update_category() {
        let env = TestEnv::new().await;
        env.insert_test_categories().await;
        let args = CategoryUpdateArgs {
            category: "Food".to_string(),
            name: Some("Groceries".to_string()),
            color: Some(Color::new(1, 2, 3)),
        };
        let out = update_category(env.config(), args).await.unwrap();
        assert_eq!(out.structure().unwrap().name(), "Groceries");

        let stored = env.config().db().list_categories().await.unwrap();
        let groceries = stored.iter().find(|c| c.name() == "Groceries").unwrap();
        assert_eq!(groceries.color(), Color::new(1, 2, 3));
    }

    #[tokio::test]
    async fn test_delete_referenced_category() {
        let env = TestEnv::new().await;
        env.insert_test_entries().await;
        let e = delete_category(
            env.config(),
            CategoryDeleteArgs {
                category: "Rent".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(ErrorType::of(&e), Some(ErrorType::Request));
        assert!(format!("{e:#}").contains("1 entries refer to it"));
        assert_eq!(env.config().db().list_categories().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_category() {
        let env = TestEnv::new().await;
        env.insert_test_categories().await;
        let out = delete_category(
            env.config(),
            CategoryDeleteArgs {
                category: "Food".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().name(), "Food");

        let context = env.context().await;
        let expense = context.categories().list(Kind::Expense);
        assert_eq!(expense.len(), 1);
        assert_eq!(expense[0].name(), "Rent");
        assert_eq!(expense[0].display_order(), 0);
    }

    #[tokio::test]
    async fn test_move_and_list_categories() {
        let env = TestEnv::new().await;
        env.insert_test_categories().await;
        let out = move_category(
            env.config(),
            CategoryMoveArgs {
                category: "Rent".to_string(),
                to: 0,
            },
        )
        .await
        .unwrap();
        let names: Vec<&str> = out.structure().unwrap().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Rent", "Food"]);

        let out = list_categories(env.config(), CategoryListArgs { kind: None })
            .await
            .unwrap();
        let names: Vec<&str> = out.structure().unwrap().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Salary", "Rent", "Food"]);
        assert!(out.message().starts_with("3 categories"));

        let out = list_categories(
            env.config(),
            CategoryListArgs {
                kind: Some(Kind::Income),
            },
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().len(), 1);
    }
}

//! Period totals and per-category breakdowns.

use crate::aggregate::{self, Granularity, Slice, Totals};
use crate::args::{BreakdownArgs, SummaryArgs};
use crate::commands::entry::describe_period;
use crate::commands::{open, resolve_category, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Amount, CategoryId, Kind};
use crate::{Config, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SummaryView {
    pub date: NaiveDate,
    pub granularity: Granularity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    pub income: i64,
    pub expense: i64,
    pub net: i64,
}

/// Totals income, expense and net for a day, month or year (the current month by default).
///
/// With `--category`, only entries in that category count, so one of income and expense is
/// always zero.
pub async fn summary(config: Config, args: SummaryArgs) -> Result<Out<SummaryView>> {
    let context = open(&config).await?;
    let (date, granularity) = args
        .period
        .resolve(Local::now().date_naive())
        .pub_result(ErrorType::Request)?;
    let category = match &args.category {
        Some(reference) => Some(resolve_category(context.categories(), reference, None)?),
        None => None,
    };

    let Totals { income, expense } = aggregate::totals(
        context.ledger().entries(),
        date,
        granularity,
        category.map(|c| c.id()),
    );
    let view = SummaryView {
        date,
        granularity,
        category_id: category.map(|c| c.id().clone()),
        income,
        expense,
        net: income - expense,
    };

    let mut message = describe_period(date, granularity);
    if let Some(category) = category {
        let _ = write!(message, " ({})", category.name());
    }
    let _ = write!(
        message,
        "\n  Income   {:>14}\n  Expense  {:>14}\n  Net      {:>14}",
        Amount::new(income).to_string(),
        Amount::new(expense).to_string(),
        Amount::new(view.net).to_string()
    );
    Ok(Out::new(message, view))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownView {
    pub date: NaiveDate,
    pub granularity: Granularity,
    pub kind: Kind,
    pub total: i64,
    pub slices: Vec<Slice>,
}

/// Splits a period's income or expense across categories, in category display order. Each slice
/// carries its share and the start and end angles of its pie-chart wedge.
pub async fn breakdown(config: Config, args: BreakdownArgs) -> Result<Out<BreakdownView>> {
    let context = open(&config).await?;
    let (date, granularity) = args
        .period
        .resolve(Local::now().date_naive())
        .pub_result(ErrorType::Request)?;
    let slices = aggregate::breakdown(
        context.ledger().entries(),
        context.categories(),
        date,
        granularity,
        args.kind,
    );
    let total = slices.iter().map(|s| s.amount).sum();

    let mut message = format!(
        "{} by category, {}: {}",
        args.kind,
        describe_period(date, granularity),
        Amount::new(total)
    );
    if slices.is_empty() {
        let _ = write!(message, "\n  (no {} entries)", args.kind);
    }
    for slice in &slices {
        let _ = write!(
            message,
            "\n  {}  {:<16} {:>12} {:>5.1}%",
            slice.color,
            slice.name,
            Amount::new(slice.amount).to_string(),
            slice.ratio * 100.0
        );
    }

    let view = BreakdownView {
        date,
        granularity,
        kind: args.kind,
        total,
        slices,
    };
    Ok(Out::new(message, view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::PeriodArgs;
    use crate::calendar::CalendarMonth;
    use crate::test::TestEnv;

    fn march() -> PeriodArgs {
        PeriodArgs::month(CalendarMonth::new(2024, 3).unwrap())
    }

    #[tokio::test]
    async fn test_summary_month() {
        let env = TestEnv::new().await;
        env.insert_test_entries().await;
        let args = SummaryArgs {
            period: march(),
            category: None,
        };
        let out = summary(env.config(), args).await.unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.income, 300_000);
        assert_eq!(view.expense, 81_200);
        assert_eq!(view.net, 218_800);
        assert!(out.message().contains("¥218,800"), "{}", out.message());
    }

    #[tokio::test]
    async fn test_summary_year_by_category() {
        let env = TestEnv::new().await;
        env.insert_test_entries().await;
        let args = SummaryArgs {
            period: PeriodArgs::year(2024),
            category: Some("Food".to_string()),
        };
        let out = summary(env.config(), args).await.unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.income, 0);
        assert_eq!(view.expense, 1_700);
        assert_eq!(view.net, -1_700);
        assert!(view.category_id.is_some());
    }

    #[tokio::test]
    async fn test_summary_empty_day() {
        let env = TestEnv::new().await;
        env.insert_test_entries().await;
        let args = SummaryArgs {
            period: PeriodArgs::day(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()),
            category: None,
        };
        let out = summary(env.config(), args).await.unwrap();
        assert_eq!(out.structure().unwrap().net, 0);
    }

    #[tokio::test]
    async fn test_breakdown_expense() {
        let env = TestEnv::new().await;
        env.insert_test_entries().await;
        let args = BreakdownArgs {
            kind: Kind::Expense,
            period: march(),
        };
        let out = breakdown(env.config(), args).await.unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.total, 81_200);
        let names: Vec<&str> = view.slices.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Food", "Rent"]);
        assert_eq!(view.slices[0].start_angle, 0.0);
        assert_eq!(view.slices[1].end_angle, 360.0);
        let ratios: f64 = view.slices.iter().map(|s| s.ratio).sum();
        assert!((ratios - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_breakdown_empty() {
        let env = TestEnv::new().await;
        env.insert_test_entries().await;
        let args = BreakdownArgs {
            kind: Kind::Income,
            period: PeriodArgs::month(CalendarMonth::new(2024, 4).unwrap()),
        };
        let out = breakdown(env.config(), args).await.unwrap();
        assert!(out.structure().unwrap().slices.is_empty());
        assert!(out.message().contains("no income entries"));
    }
}

//! The month calendar command.

use crate::aggregate::Totals;
use crate::args::CalendarArgs;
use crate::calendar::{CalendarItem, CalendarMonth, WeekStart};
use crate::commands::{open, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{with_commas, Amount};
use crate::{Config, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use std::fmt::Write;

const CELL_WIDTH: usize = 11;

/// One cell of the rendered calendar.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub total_balance: i64,
    pub is_calendar_month: bool,
    pub entries: usize,
}

impl From<&CalendarItem> for CalendarDay {
    fn from(item: &CalendarItem) -> Self {
        Self {
            date: item.date,
            total_balance: item.total_balance,
            is_calendar_month: item.is_calendar_month,
            entries: item.entries.len(),
        }
    }
}

/// A month of calendar cells, row by row, plus the month's totals.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct CalendarView {
    pub month: CalendarMonth,
    pub week_start: WeekStart,
    pub days: Vec<CalendarDay>,
    pub totals: Totals,
}

/// Shows a month calendar with the signed total of each day.
///
/// The month defaults to the current one; `--next N` and `--last N` move forward or back from it.
/// The grid starts on the configured week start unless `--week-start` overrides it, and spans
/// exactly the weeks the month touches.
pub async fn calendar(config: Config, args: CalendarArgs) -> Result<Out<CalendarView>> {
    let context = open(&config).await?;
    let month = match args.month {
        Some(month) => month,
        None => CalendarMonth::containing(Local::now().date_naive()).pub_result(ErrorType::Request)?,
    };
    let shift = match (args.next, args.last) {
        (Some(n), _) => i64::from(n),
        (None, Some(n)) => -i64::from(n),
        (None, None) => 0,
    };
    let month = i32::try_from(shift)
        .map_err(anyhow::Error::from)
        .and_then(|n| month.shift(n))
        .pub_result(ErrorType::Request)?;
    let week_start = args.week_start.unwrap_or_else(|| config.week_start());

    let view = CalendarView {
        month,
        week_start,
        days: context
            .calendar(&month, week_start)
            .iter()
            .map(CalendarDay::from)
            .collect(),
        totals: month.totals(context.ledger()),
    };
    Ok(Out::new(render(&view), view))
}

fn render(view: &CalendarView) -> String {
    let mut out = format!("{}\n", view.month);
    for label in view.week_start.labels() {
        let _ = write!(out, "{label:>CELL_WIDTH$}");
    }
    for week in view.days.chunks(7) {
        out.push('\n');
        for day in week {
            let _ = write!(out, "{:>CELL_WIDTH$}", cell(day));
        }
    }
    let _ = write!(
        out,
        "\nIncome {}  Expense {}  Net {}",
        Amount::new(view.totals.income),
        Amount::new(view.totals.expense),
        Amount::new(view.totals.net())
    );
    out
}

/// e.g. "5 -1,200", or "(31)" for a day outside the month.
fn cell(day: &CalendarDay) -> String {
    if !day.is_calendar_month {
        return format!("({})", day.date.day());
    }
    if day.entries == 0 {
        return day.date.day().to_string();
    }
    let sign = if day.total_balance < 0 { "-" } else { "+" };
    format!(
        "{} {sign}{}",
        day.date.day(),
        with_commas(day.total_balance.unsigned_abs())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    fn march() -> CalendarArgs {
        CalendarArgs {
            month: Some(CalendarMonth::new(2024, 3).unwrap()),
            ..CalendarArgs::default()
        }
    }

    #[tokio::test]
    async fn test_calendar_march_2024() {
        let env = TestEnv::new().await;
        env.insert_test_entries().await;

        let out = calendar(env.config(), march()).await.unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.week_start, WeekStart::Sunday);
        assert_eq!(view.days.len(), 42);
        assert_eq!(view.days[0].date, NaiveDate::from_ymd_opt(2024, 2, 25).unwrap());
        assert!(!view.days[0].is_calendar_month);

        let first = &view.days[5];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(first.total_balance, 300_000 - 1_200);
        assert_eq!(first.entries, 2);

        assert_eq!(view.totals.income, 300_000);
        assert_eq!(view.totals.expense, 81_200);
        assert!(out.message().contains("1 +298,800"), "{}", out.message());
        assert!(out.message().contains("15 -80,000"));
    }

    #[tokio::test]
    async fn test_calendar_navigation() {
        let env = TestEnv::new().await;
        env.insert_test_entries().await;

        let args = CalendarArgs {
            next: Some(1),
            ..march()
        };
        let view = calendar(env.config(), args).await.unwrap();
        let view = view.structure().unwrap();
        assert_eq!(view.month, CalendarMonth::new(2024, 4).unwrap());
        assert_eq!(view.totals.expense, 500);

        let args = CalendarArgs {
            last: Some(3),
            week_start: Some(WeekStart::Monday),
            ..march()
        };
        let view = calendar(env.config(), args).await.unwrap();
        let view = view.structure().unwrap();
        assert_eq!(view.month, CalendarMonth::new(2023, 12).unwrap());
        assert_eq!(view.week_start, WeekStart::Monday);
        assert_eq!(view.days[0].date, NaiveDate::from_ymd_opt(2023, 11, 27).unwrap());
    }

    #[tokio::test]
    async fn test_calendar_out_of_range() {
        let env = TestEnv::new().await;
        let args = CalendarArgs {
            month: Some(CalendarMonth::new(9999, 12).unwrap()),
            next: Some(1),
            ..CalendarArgs::default()
        };
        let e = calendar(env.config(), args).await.unwrap_err();
        assert_eq!(ErrorType::of(&e), Some(ErrorType::Request));

        for (next, last) in [
            (Some(i32::MAX as u32), None),
            (Some(u32::MAX), None),
            (None, Some(u32::MAX)),
        ] {
            let args = CalendarArgs {
                month: Some(CalendarMonth::new(2024, 3).unwrap()),
                next,
                last,
                ..CalendarArgs::default()
            };
            let e = calendar(env.config(), args).await.unwrap_err();
            assert_eq!(ErrorType::of(&e), Some(ErrorType::Request));
        }
    }
}

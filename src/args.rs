//! These structs provide the CLI interface for the kakeibo CLI.

use crate::aggregate::Granularity;
use crate::calendar::{CalendarMonth, WeekStart};
use crate::model::{Amount, Balance, Color, EntryId, Kind};
use crate::Result;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// kakeibo: A household account book for the command line.
///
/// Record income and expenses against your own categories, browse them on a month calendar, and
/// see monthly totals and per-category breakdowns. Everything is kept in a SQLite database in the
/// kakeibo home directory.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and an empty ledger.
    ///
    /// This is the first command you should run. By default the ledger is created in
    /// $HOME/kakeibo with a starter set of income and expense categories.
    Init(InitArgs),
    /// Record, change, remove, list or export ledger entries.
    Entry(EntryArgs),
    /// Add, rename, recolour, remove, reorder or list categories.
    Category(CategoryArgs),
    /// Show the month calendar with each day's total.
    Calendar(CalendarArgs),
    /// Show income, expense and net totals for a day, month or year.
    Summary(SummaryArgs),
    /// Show how a period's income or expense splits across categories (pie chart data).
    Breakdown(BreakdownArgs),
    /// Adjust a category colour by hue, saturation and brightness.
    Color(ColorArgs),
    /// Write a JSON snapshot and a copy of the SQLite database to the backups directory.
    Backup,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where kakeibo data and configuration is held. Defaults to ~/kakeibo
    #[arg(long, env = "KAKEIBO_HOME", default_value_t = default_kakeibo_home())]
    kakeibo_home: DisplayPath,

    /// Print the structured output of the command as JSON on stdout.
    #[arg(long)]
    json: bool,
}

impl Common {
    pub fn new(log_level: LevelFilter, kakeibo_home: PathBuf, json: bool) -> Self {
        Self {
            log_level,
            kakeibo_home: kakeibo_home.into(),
            json,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn kakeibo_home(&self) -> &DisplayPath {
        &self.kakeibo_home
    }

    pub fn json(&self) -> bool {
        self.json
    }
}

/// Args for the `kakeibo init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The first column of the month calendar.
    #[arg(long, value_enum, default_value_t = WeekStart::Sunday)]
    week_start: WeekStart,

    /// How many backups of each kind to keep in the backups directory.
    #[arg(long, default_value_t = crate::config::BACKUP_COPIES)]
    backup_copies: u32,

    /// Start with no categories instead of the starter set.
    #[arg(long)]
    no_default_categories: bool,
}

impl InitArgs {
    pub fn new(week_start: WeekStart, backup_copies: u32, no_default_categories: bool) -> Self {
        Self {
            week_start,
            backup_copies,
            no_default_categories,
        }
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn backup_copies(&self) -> u32 {
        self.backup_copies
    }

    pub fn default_categories(&self) -> bool {
        !self.no_default_categories
    }
}

/// Selects a day, a month or a year. With none of them given, the current month is used.
#[derive(Debug, Default, Parser, Clone)]
#[group(multiple = false)]
pub struct PeriodArgs {
    /// A single day, YYYY-MM-DD.
    #[arg(long)]
    pub day: Option<NaiveDate>,

    /// A month, YYYY-MM.
    #[arg(long)]
    pub month: Option<CalendarMonth>,

    /// A year, YYYY.
    #[arg(long)]
    pub year: Option<i32>,
}

impl PeriodArgs {
    pub fn day(day: NaiveDate) -> Self {
        Self {
            day: Some(day),
            ..Self::default()
        }
    }

    pub fn month(month: CalendarMonth) -> Self {
        Self {
            month: Some(month),
            ..Self::default()
        }
    }

    pub fn year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Self::default()
        }
    }

    /// A date inside the selected period and how coarsely to match it. `today` decides the
    /// default month.
    pub fn resolve(&self, today: NaiveDate) -> Result<(NaiveDate, Granularity)> {
        if let Some(day) = self.day {
            return Ok((day, Granularity::Day));
        }
        if let Some(month) = self.month {
            return Ok((month.first_day(), Granularity::Month));
        }
        if let Some(year) = self.year {
            let first = NaiveDate::from_ymd_opt(year, 1, 1)
                .with_context(|| format!("Invalid year {year}"))?;
            return Ok((first, Granularity::Year));
        }
        Ok((CalendarMonth::containing(today)?.first_day(), Granularity::Month))
    }
}

/// Either `--income` or `--expense`.
#[derive(Debug, Default, Parser, Clone)]
#[group(multiple = false)]
pub struct BalanceArgs {
    /// An income amount in yen, e.g. 250000 or ¥250,000.
    #[arg(long)]
    pub income: Option<Amount>,

    /// An expense amount in yen, e.g. 1200 or ¥1,200.
    #[arg(long)]
    pub expense: Option<Amount>,
}

impl BalanceArgs {
    pub fn income(amount: i64) -> Self {
        Self {
            income: Some(Amount::new(amount)),
            expense: None,
        }
    }

    pub fn expense(amount: i64) -> Self {
        Self {
            income: None,
            expense: Some(Amount::new(amount)),
        }
    }

    /// The balance, if either flag was given. Negative amounts are rejected.
    pub fn balance(&self) -> Result<Option<Balance>> {
        match (self.income, self.expense) {
            (Some(_), Some(_)) => bail!("Only one of --income and --expense may be given"),
            (Some(amount), None) => Ok(Some(Balance::new(Kind::Income, amount.value())?)),
            (None, Some(amount)) => Ok(Some(Balance::new(Kind::Expense, amount.value())?)),
            (None, None) => Ok(None),
        }
    }
}

/// Args for the `kakeibo entry` command.
#[derive(Debug, Parser, Clone)]
pub struct EntryArgs {
    #[command(subcommand)]
    command: EntrySubcommand,
}

impl EntryArgs {
    pub fn command(&self) -> &EntrySubcommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum EntrySubcommand {
    /// Record a new income or expense.
    Insert(EntryInsertArgs),
    /// Change an existing entry. Only the given fields change.
    Update(EntryUpdateArgs),
    /// Delete one or more entries. Either all of them are deleted or none are.
    Delete(EntryDeleteArgs),
    /// List the entries in a day, month or year.
    List(EntryListArgs),
    /// Write the entries in a period to CSV.
    Export(EntryExportArgs),
}

/// Args for `kakeibo entry insert`.
#[derive(Debug, Parser, Clone)]
pub struct EntryInsertArgs {
    /// The date of the entry, YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// The category id, or the name of a category of the matching kind.
    #[arg(long)]
    pub category: String,

    #[clap(flatten)]
    pub balance: BalanceArgs,

    /// A free-form note.
    #[arg(long)]
    pub memo: Option<String>,
}

/// Args for `kakeibo entry update`.
#[derive(Debug, Parser, Clone)]
pub struct EntryUpdateArgs {
    /// The id of the entry to change.
    pub id: EntryId,

    /// The new date, YYYY-MM-DD.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// The new category id or name.
    #[arg(long)]
    pub category: Option<String>,

    #[clap(flatten)]
    pub balance: BalanceArgs,

    /// The new note.
    #[arg(long)]
    pub memo: Option<String>,
}

/// Args for `kakeibo entry delete`.
#[derive(Debug, Parser, Clone)]
pub struct EntryDeleteArgs {
    /// The ids of the entries to delete.
    #[arg(required = true)]
    pub ids: Vec<EntryId>,
}

/// Args for `kakeibo entry list`.
#[derive(Debug, Parser, Clone)]
pub struct EntryListArgs {
    #[clap(flatten)]
    pub period: PeriodArgs,

    /// Only list entries in this category (id or name).
    #[arg(long)]
    pub category: Option<String>,
}

/// Args for `kakeibo entry export`.
#[derive(Debug, Parser, Clone)]
pub struct EntryExportArgs {
    #[clap(flatten)]
    pub period: PeriodArgs,

    /// Export every entry instead of one period.
    #[arg(long, conflicts_with_all = ["day", "month", "year"])]
    pub all: bool,

    /// The CSV file to write. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Args for the `kakeibo category` command.
#[derive(Debug, Parser, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    command: CategorySubcommand,
}

impl CategoryArgs {
    pub fn command(&self) -> &CategorySubcommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategorySubcommand {
    /// Add a category at the end of its list.
    Insert(CategoryInsertArgs),
    /// Rename or recolour a category.
    Update(CategoryUpdateArgs),
    /// Delete a category that no entry uses.
    Delete(CategoryDeleteArgs),
    /// Move a category to a new position within its list.
    Move(CategoryMoveArgs),
    /// List categories in display order.
    List(CategoryListArgs),
}

/// Args for `kakeibo category insert`.
#[derive(Debug, Parser, Clone)]
pub struct CategoryInsertArgs {
    /// income or expense
    #[arg(long)]
    pub kind: Kind,

    #[arg(long)]
    pub name: String,

    /// The display colour, #RRGGBB. Defaults to a grey.
    #[arg(long)]
    pub color: Option<Color>,
}

/// Args for `kakeibo category update`.
#[derive(Debug, Parser, Clone)]
pub struct CategoryUpdateArgs {
    /// The category id or name.
    pub category: String,

    #[arg(long)]
    pub name: Option<String>,

    /// The new display colour, #RRGGBB.
    #[arg(long)]
    pub color: Option<Color>,
}

/// Args for `kakeibo category delete`.
#[derive(Debug, Parser, Clone)]
pub struct CategoryDeleteArgs {
    /// The category id or name.
    pub category: String,
}

/// Args for `kakeibo category move`.
#[derive(Debug, Parser, Clone)]
pub struct CategoryMoveArgs {
    /// The category id or name.
    pub category: String,

    /// The zero-based position to move to. Positions past the end move the category last.
    #[arg(long)]
    pub to: usize,
}

/// Args for `kakeibo category list`.
#[derive(Debug, Parser, Clone)]
pub struct CategoryListArgs {
    /// Only list categories of this kind.
    #[arg(long)]
    pub kind: Option<Kind>,
}

/// Args for `kakeibo calendar`.
#[derive(Debug, Default, Parser, Clone)]
pub struct CalendarArgs {
    /// The month to show, YYYY-MM. Defaults to the current month.
    #[arg(long)]
    pub month: Option<CalendarMonth>,

    /// Show the month this many months after `--month`.
    #[arg(long, conflicts_with = "last")]
    pub next: Option<u32>,

    /// Show the month this many months before `--month`.
    #[arg(long)]
    pub last: Option<u32>,

    /// Override the configured first day of the week.
    #[arg(long, value_enum)]
    pub week_start: Option<WeekStart>,
}

/// Args for `kakeibo summary`.
#[derive(Debug, Default, Parser, Clone)]
pub struct SummaryArgs {
    #[clap(flatten)]
    pub period: PeriodArgs,

    /// Only total entries in this category (id or name).
    #[arg(long)]
    pub category: Option<String>,
}

/// Args for `kakeibo breakdown`.
#[derive(Debug, Parser, Clone)]
pub struct BreakdownArgs {
    /// income or expense
    #[arg(long, default_value_t = Kind::Expense)]
    pub kind: Kind,

    #[clap(flatten)]
    pub period: PeriodArgs,
}

/// Args for `kakeibo color`.
#[derive(Debug, Parser, Clone)]
pub struct ColorArgs {
    /// The starting colour, #RRGGBB.
    #[arg(long)]
    pub color: Color,

    /// The new hue, 0.0 to 1.0.
    #[arg(long)]
    pub hue: Option<f64>,

    /// The new saturation, 0.0 to 1.0.
    #[arg(long)]
    pub saturation: Option<f64>,

    /// The new brightness, 0.0 to 1.0.
    #[arg(long)]
    pub brightness: Option<f64>,
}

fn default_kakeibo_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("kakeibo"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --kakeibo-home or KAKEIBO_HOME instead of relying on the \
                default kakeibo home directory. If you continue using the program right now, you \
                may have problems!",
            );
            PathBuf::from("kakeibo")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

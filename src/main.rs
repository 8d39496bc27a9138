use clap::Parser;
use kakeibo::args::{Args, CategorySubcommand, Command, EntrySubcommand};
use kakeibo::commands::{self, Out};
use kakeibo::{Config, Result};
use serde::Serialize;
use std::fmt::Debug;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().kakeibo_home().path();
    let json = args.common().json();

    // Route to appropriate command handler
    match args.command() {
        Command::Init(init_args) => emit(commands::init(home, init_args.clone()).await?, json),

        Command::Entry(entry_args) => {
            let config = Config::load(home).await?;
            match entry_args.command() {
                EntrySubcommand::Insert(args) => {
                    emit(commands::insert_entry(config, args.clone()).await?, json)
                }
                EntrySubcommand::Update(args) => {
                    emit(commands::update_entry(config, args.clone()).await?, json)
                }
                EntrySubcommand::Delete(args) => {
                    emit(commands::delete_entries(config, args.clone()).await?, json)
                }
                EntrySubcommand::List(args) => {
                    emit(commands::list_entries(config, args.clone()).await?, json)
                }
                EntrySubcommand::Export(args) => {
                    // The CSV itself may be on stdout, so only the message is printed.
                    commands::export_entries(config, args.clone()).await?.print();
                    Ok(())
                }
            }
        }

        Command::Category(category_args) => {
            let config = Config::load(home).await?;
            match category_args.command() {
                CategorySubcommand::Insert(args) => {
                    emit(commands::insert_category(config, args.clone()).await?, json)
                }
                CategorySubcommand::Update(args) => {
                    emit(commands::update_category(config, args.clone()).await?, json)
                }
                CategorySubcommand::Delete(args) => {
                    emit(commands::delete_category(config, args.clone()).await?, json)
                }
                CategorySubcommand::Move(args) => {
                    emit(commands::move_category(config, args.clone()).await?, json)
                }
                CategorySubcommand::List(args) => {
                    emit(commands::list_categories(config, args.clone()).await?, json)
                }
            }
        }

        Command::Calendar(calendar_args) => {
            let config = Config::load(home).await?;
            emit(commands::calendar(config, calendar_args.clone()).await?, json)
        }

        Command::Summary(summary_args) => {
            let config = Config::load(home).await?;
            emit(commands::summary(config, summary_args.clone()).await?, json)
        }

        Command::Breakdown(breakdown_args) => {
            let config = Config::load(home).await?;
            emit(commands::breakdown(config, breakdown_args.clone()).await?, json)
        }

        Command::Color(color_args) => emit(commands::color(color_args.clone())?, json),

        Command::Backup => {
            let config = Config::load(home).await?;
            emit(commands::backup(config).await?, json)
        }
    }
}

fn emit<T>(out: Out<T>, json: bool) -> Result<()>
where
    T: Serialize + Clone + Debug,
{
    if json {
        out.print_json()
    } else {
        out.print();
        Ok(())
    }
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

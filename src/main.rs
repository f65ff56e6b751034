use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

mod add_command;
mod aggregate;
mod commits;
mod console;
mod datetime;
mod day_command;
mod delete_command;
mod heatmap_command;
mod local_store;
mod logger;
mod time_entry;
mod validation;

use add_command::{AddArgs, AddCommand};
use commits::{CommitClient, CommitRepository, DEFAULT_API_URL};
use console::{ConsoleJson, ConsolePresenter, ConsoleText};
use day_command::{DayArgs, DayCommand};
use delete_command::{DeleteArgs, DeleteCommand};
use heatmap_command::{HeatmapArgs, HeatmapCommand};
use local_store::{default_data_path, LocalCommitStore};

/// 日々の作業をコミットとして記録し、ヒートマップで表示するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- add -m "Fix login bug" -H 1 -M 30
/// $ cargo run -- day --date 2025-10-13
/// $ cargo run -- heatmap --year 2025
/// $ cargo run -- --local delete 3f0c2a
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(subcommand)]
    subcommand: SubCommands,

    #[clap(
        long = "api-url",
        env = "COMMITMAP_API_URL",
        default_value = DEFAULT_API_URL,
        global = true,
        help = "Base URL of the commits API"
    )]
    api_url: String,

    #[clap(
        long = "local",
        global = true,
        help = "Store commits in a local file instead of the API"
    )]
    local: bool,

    #[clap(
        long = "data-file",
        env = "COMMITMAP_DATA_FILE",
        global = true,
        help = "Path of the local data file"
    )]
    data_file: Option<PathBuf>,

    #[clap(long = "json", global = true, help = "Print output as JSON")]
    json: bool,

    #[clap(short = 'v', long = "verbose", parse(from_occurrences), global = true)]
    verbose: u64,

    #[clap(short = 'q', long = "quiet", global = true)]
    quiet: bool,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Add a commit
    Add(AddArgs),
    /// Delete a commit by ID
    Delete(DeleteArgs),
    /// Show the commits of a day
    Day(DayArgs),
    /// Show the yearly heatmap
    Heatmap(HeatmapArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logger::setup_logger(logger::level_from_flags(args.verbose, args.quiet))?;

    if args.local {
        let path = match args.data_file {
            Some(path) => path,
            None => default_data_path()?,
        };
        info!("Using local data file: {}", path.display());
        let store = LocalCommitStore::new(path);
        run(&store, args.subcommand, args.json).await
    } else {
        info!("Using commits API at {}", args.api_url);
        let client = CommitClient::new(&args.api_url);
        run(&client, args.subcommand, args.json).await
    }
}

/// サブコマンドを実行し、結果を標準出力に表示する。
async fn run<T: CommitRepository>(
    repository: &T,
    subcommand: SubCommands,
    json: bool,
) -> Result<()> {
    match subcommand {
        SubCommands::Add(add) => {
            let added = AddCommand::new(repository).run(add).await?;
            present(json, |presenter| presenter.show_added(&added))?;
        }
        SubCommands::Delete(delete) => {
            let id = delete.id.trim().to_string();
            DeleteCommand::new(repository).run(delete).await?;
            present(json, |presenter| presenter.show_deleted(&id))?;
        }
        SubCommands::Day(day) => {
            let (date, entries) = DayCommand::new(repository).run(day).await?;
            present(json, |presenter| presenter.show_day(date, &entries))?;
        }
        SubCommands::Heatmap(heatmap) => {
            let (year, series) = HeatmapCommand::new(repository).run(heatmap).await?;
            present(json, |presenter| presenter.show_heatmap(year, &series))?;
        }
    }

    Ok(())
}

/// 出力形式に応じたpresenterで標準出力に表示する。
fn present(json: bool, show: impl FnOnce(&mut dyn ConsolePresenter) -> Result<()>) -> Result<()> {
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let shown = if json {
        show(&mut ConsoleJson::new(&mut writer))
    } else {
        show(&mut ConsoleText::new(&mut writer))
    };
    shown.context("Failed to write output")
}

use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use playlog_core::clock::{self, DAY_FORMAT};
use playlog_core::PlaylogConfig;
use tracing::info;

mod app;
mod report;
mod serve;

/// `playlog` is a prefix of every workspace crate's target.
const DEFAULT_LOG_FILTER: &str = "playlog=info";

#[derive(Debug, Parser)]
#[command(name = "playlog", version, about = "Daily Spotify recently-played ETL")]
struct Cli {
    /// Config file (default: ~/.playlog/playlog.toml).
    #[arg(long, global = true, env = "PLAYLOG_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch, validate and store yesterday's plays once.
    Run {
        /// Load this day (YYYY-MM-DD) instead of yesterday.
        #[arg(long)]
        date: Option<String>,
    },
    /// Run the job on its schedule until interrupted.
    Serve,
    /// Show stored plays per day, or the tracks of one day.
    History {
        #[arg(long)]
        day: Option<String>,
        #[arg(long, default_value_t = 14)]
        limit: usize,
    },
    /// Show the most recent scheduled runs.
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = PlaylogConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run { date } => run_once(&config, date.as_deref()).await,
        Command::Serve => {
            serve::serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::History { day, limit } => {
            history(&config, day.as_deref(), limit)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Runs { limit } => {
            runs(&config, limit)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_once(config: &PlaylogConfig, date: Option<&str>) -> anyhow::Result<ExitCode> {
    let reference = match date {
        Some(d) => clock::reference_for_target_day(clock::parse_day(d)?)?,
        None => Utc::now(),
    };
    info!(
        user = config.spotify.user_id.as_deref().unwrap_or("me"),
        target_day = %clock::target_day(reference).format(DAY_FORMAT),
        "starting run"
    );

    let result = match app::build_pipeline(config) {
        Ok(pipeline) => pipeline.run(reference).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => {
            println!("{}", report::outcome_message(&outcome));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", report::failure_message(&e));
            Ok(report::exit_code(e.class()))
        }
    }
}

fn history(config: &PlaylogConfig, day: Option<&str>, limit: usize) -> anyhow::Result<()> {
    let store = app::open_store(config)?;
    match day {
        Some(d) => {
            let day = clock::parse_day(d)?.format(DAY_FORMAT).to_string();
            let records = store.records_for_day(&day)?;
            if records.is_empty() {
                println!("no plays stored for {day}");
            }
            for r in records {
                println!("{}  {} - {}", r.played_at, r.author_name, r.track_name);
            }
        }
        None => {
            let days = store.days(limit)?;
            if days.is_empty() {
                println!("no plays stored yet");
            }
            for d in days {
                println!("{}  {:>3} plays", d.date_played, d.plays);
            }
        }
    }
    Ok(())
}

fn runs(config: &PlaylogConfig, limit: usize) -> anyhow::Result<()> {
    app::ensure_parent_dir(&config.database.path);
    let handle =
        playlog_scheduler::SchedulerHandle::new(rusqlite::Connection::open(&config.database.path)?)?;
    let runs = handle.list_runs(limit)?;
    if runs.is_empty() {
        println!("no scheduled runs recorded");
    }
    for r in runs {
        println!(
            "{}  {:<7}  attempts={}  {}",
            r.logical_date,
            r.status.to_string(),
            r.attempts,
            r.detail
        );
    }
    Ok(())
}

use std::time::Duration;

use playlog_core::config::{PlaylogConfig, ScheduleConfig};
use playlog_fetch::SpotifyClient;
use playlog_pipeline::{Pipeline, PipelineError};
use playlog_scheduler::{RetryPolicy, Schedule};
use playlog_store::{PlayedTracksStore, StoreError};
use tracing::info;

/// Name of the scheduler job that runs the ETL.
pub const JOB_NAME: &str = "played_tracks_etl";

pub fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

pub fn open_store(config: &PlaylogConfig) -> Result<PlayedTracksStore, StoreError> {
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    PlayedTracksStore::open(db_path)
}

/// Spotify source + SQLite store, ready to run.
pub fn build_pipeline(config: &PlaylogConfig) -> Result<Pipeline, PipelineError> {
    let source = SpotifyClient::new(&config.spotify)?;
    let store = open_store(config)?;
    Ok(Pipeline::new(Box::new(source), store))
}

/// `interval_secs` wins over the daily time when both are set.
pub fn schedule_from(config: &ScheduleConfig) -> Schedule {
    match config.interval_secs {
        Some(every_secs) => Schedule::Interval { every_secs },
        None => Schedule::Daily {
            hour: config.hour,
            minute: config.minute,
        },
    }
}

pub fn retry_policy(config: &ScheduleConfig) -> RetryPolicy {
    RetryPolicy {
        retries: config.retries,
        retry_delay: Duration::from_secs(config.retry_delay_secs),
    }
}

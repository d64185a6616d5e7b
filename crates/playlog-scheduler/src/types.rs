use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Defines when and how often a job should run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Run repeatedly with a fixed interval in seconds.
    Interval { every_secs: u64 },

    /// Run every day at the given hour and minute (UTC).
    Daily { hour: u8, minute: u8 },
}

/// How a logged run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The handler finished without a fatal error (including "nothing to load").
    Success,
    /// Every attempt failed.
    Failed,
    /// The slot passed while the engine was not running.
    Missed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Missed => "missed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            "missed" => Ok(RunStatus::Missed),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

/// A persisted job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// UUID v4 string: primary key.
    pub id: String,
    /// Unique human-readable label.
    pub name: String,
    pub schedule: Schedule,
    /// RFC 3339 timestamp of the most recent fire, if any.
    pub last_run: Option<String>,
    /// RFC 3339 timestamp of the next planned fire, if any.
    pub next_run: Option<String>,
    /// Total number of fires.
    pub run_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// Sent to the handler task when a job's slot arrives.
#[derive(Debug, Clone)]
pub struct FiredJob {
    pub job_id: String,
    pub name: String,
    /// The scheduled instant this run stands for, not the wall clock at fire time.
    pub logical_date: DateTime<Utc>,
}

/// One row of the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub id: i64,
    pub job_id: String,
    pub logical_date: String,
    pub attempts: u32,
    pub status: RunStatus,
    pub detail: String,
    pub finished_at: String,
}

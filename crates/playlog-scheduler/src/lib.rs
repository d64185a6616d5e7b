//! `playlog-scheduler`: Tokio-based job scheduler with SQLite persistence.
//!
//! # Overview
//!
//! Jobs are persisted to a SQLite `jobs` table. The [`engine::SchedulerEngine`]
//! polls the database every second and forwards any job whose `next_run` has
//! arrived as a [`FiredJob`] carrying the slot's logical date. Whoever handles
//! the fired job runs it under a [`RetryPolicy`] and writes the outcome to the
//! `job_runs` log through a [`SchedulerHandle`].
//!
//! # Schedule variants
//!
//! | Variant    | Behaviour                    |
//! |------------|------------------------------|
//! | `Interval` | Repeat every N seconds       |
//! | `Daily`    | Fire at HH:MM UTC every day  |

pub mod db;
pub mod engine;
pub mod error;
pub mod retry;
pub mod schedule;
pub mod types;

pub use engine::{SchedulerEngine, SchedulerHandle};
pub use error::{Result, SchedulerError};
pub use retry::{run_with_retries, RetryPolicy};
pub use types::{FiredJob, Job, JobRun, RunStatus, Schedule};

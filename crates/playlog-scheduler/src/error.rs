use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The provided schedule definition is invalid or unsupported.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// No job with the given name exists in the store.
    #[error("Job not found: {name}")]
    JobNotFound { name: String },

    #[error("scheduler connection lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

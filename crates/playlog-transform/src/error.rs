use thiserror::Error;

/// Fields a raw item must carry to become a [`playlog_core::PlayRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    TrackName,
    AuthorName,
    PlayedAt,
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordField::TrackName => "track.name",
            RecordField::AuthorName => "track.album.artists[0].name",
            RecordField::PlayedAt => "played_at",
        };
        write!(f, "{s}")
    }
}

/// Batch-level validation failures. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Two items share a `played_at`; the fetch is corrupt.
    #[error("primary key check violated: played_at {played_at} appears more than once")]
    DuplicateKey { played_at: String },

    #[error("item {index} is missing {field}")]
    MissingField { index: usize, field: RecordField },

    #[error("item {index} has malformed played_at '{value}'")]
    MalformedTimestamp { index: usize, value: String },
}

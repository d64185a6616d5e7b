use playlog_fetch::FetchError;
use playlog_store::StoreError;
use playlog_transform::TransformError;
use thiserror::Error;

/// Broad category of a fatal run error, used to word the terminal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Upstream or network failure; a later run will likely succeed.
    Transient,
    /// The fetched batch is inconsistent and must be investigated.
    Integrity,
    /// The local database failed for a reason other than a duplicate batch.
    Storage,
    /// The job is not configured to run at all.
    Config,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorClass::Transient => "upstream failure",
            ErrorClass::Integrity => "data integrity violation",
            ErrorClass::Storage => "storage failure",
            ErrorClass::Config => "configuration error",
        };
        write!(f, "{s}")
    }
}

/// Every fatal condition a run can end with.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Fetch(FetchError::Config(_)) => ErrorClass::Config,
            PipelineError::Fetch(_) => ErrorClass::Transient,
            PipelineError::Transform(_) => ErrorClass::Integrity,
            PipelineError::Store(_) => ErrorClass::Storage,
        }
    }

    /// Short error code string printed alongside terminal messages.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Fetch(FetchError::Config(_)) => "CONFIG_ERROR",
            PipelineError::Fetch(FetchError::Http(_)) => "HTTP_ERROR",
            PipelineError::Fetch(FetchError::Upstream { .. }) => "UPSTREAM_ERROR",
            PipelineError::Fetch(FetchError::Parse(_)) => "UPSTREAM_PARSE_ERROR",
            PipelineError::Transform(TransformError::DuplicateKey { .. }) => "DUPLICATE_KEY",
            PipelineError::Transform(TransformError::MissingField { .. }) => "MISSING_FIELD",
            PipelineError::Transform(TransformError::MalformedTimestamp { .. }) => {
                "MALFORMED_TIMESTAMP"
            }
            PipelineError::Store(_) => "STORAGE_ERROR",
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use playlog_core::RawItem;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetcher not configured: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream API error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Upstream/transport faults that a later attempt may not hit again.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::Config(_))
    }
}

/// Where a run gets its batch of recently-played items from.
///
/// One call per run, no caching. Implementations must not retry on their own;
/// retry policy belongs to whoever drives the run.
#[async_trait]
pub trait RecentlyPlayedSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Items played after the cutoff derived from `reference`, in API order.
    async fn fetch(&self, reference: DateTime<Utc>) -> Result<Vec<RawItem>, FetchError>;
}

use serde::{Deserialize, Serialize};

/// What a bulk write did. Neither variant is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Every record was written.
    Inserted { rows: usize },
    /// A record's `datetime_played` already exists; the whole write was
    /// rolled back and nothing was stored.
    AlreadyPresent { conflicting: String },
}

/// Number of stored plays on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date_played: String,
    pub plays: u32,
}

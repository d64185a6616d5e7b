use chrono::NaiveDate;

/// How a run ended without a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Target-day records were written.
    Loaded { rows: usize, dropped: usize },
    /// The batch was already stored by an earlier run; nothing was written.
    AlreadyPresent { conflicting: String, dropped: usize },
    /// The API returned no items.
    EmptyBatch,
    /// Items came back, none from the target day.
    NoRecordsForTargetDay { target_day: NaiveDate, dropped: usize },
}

impl RunOutcome {
    /// Rows added to storage by this run.
    pub fn rows_written(&self) -> usize {
        match self {
            RunOutcome::Loaded { rows, .. } => *rows,
            _ => 0,
        }
    }

    /// One-line description for logs, the terminal and the run log.
    pub fn summary(&self) -> String {
        match self {
            RunOutcome::Loaded { rows, dropped } => {
                format!("loaded {rows} tracks ({dropped} from other days dropped)")
            }
            RunOutcome::AlreadyPresent { conflicting, .. } => {
                format!("batch already present (played_at {conflicting} exists); nothing written")
            }
            RunOutcome::EmptyBatch => "no tracks downloaded; nothing to load".to_string(),
            RunOutcome::NoRecordsForTargetDay {
                target_day,
                dropped,
            } => format!("no tracks from {target_day} ({dropped} from other days dropped)"),
        }
    }
}

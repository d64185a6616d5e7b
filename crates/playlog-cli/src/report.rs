//! Terminal wording for run results. "No data" is benign, integrity errors
//! need a human, upstream errors go away on their own.

use std::process::ExitCode;

use playlog_pipeline::{ErrorClass, PipelineError, RunOutcome};

pub fn outcome_message(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Loaded { .. } | RunOutcome::AlreadyPresent { .. } => {
            format!("ok: {}", outcome.summary())
        }
        RunOutcome::EmptyBatch | RunOutcome::NoRecordsForTargetDay { .. } => {
            format!("no data: {}", outcome.summary())
        }
    }
}

pub fn failure_message(err: &PipelineError) -> String {
    let hint = match err.class() {
        ErrorClass::Transient => "transient; the next scheduled attempt will retry",
        ErrorClass::Integrity => "the fetched batch is inconsistent and must be investigated",
        ErrorClass::Storage => "check the database file and disk",
        ErrorClass::Config => "fix the configuration and run again",
    };
    format!("{} [{}]: {err} ({hint})", err.class(), err.code())
}

/// sysexits-style codes so a wrapping scheduler can tell failures apart.
pub fn exit_code(class: ErrorClass) -> ExitCode {
    ExitCode::from(match class {
        ErrorClass::Integrity => 65,
        ErrorClass::Storage => 74,
        ErrorClass::Transient => 75,
        ErrorClass::Config => 78,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use playlog_fetch::FetchError;

    use super::*;

    #[test]
    fn empty_outcomes_read_as_no_data() {
        let msg = outcome_message(&RunOutcome::NoRecordsForTargetDay {
            target_day: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            dropped: 3,
        });
        assert!(msg.starts_with("no data:"));
        assert!(msg.contains("2024-03-14"));
        assert!(outcome_message(&RunOutcome::EmptyBatch).starts_with("no data:"));
    }

    #[test]
    fn loaded_reads_as_ok() {
        let msg = outcome_message(&RunOutcome::Loaded {
            rows: 4,
            dropped: 1,
        });
        assert_eq!(msg, "ok: loaded 4 tracks (1 from other days dropped)");
    }

    #[test]
    fn upstream_failure_is_called_transient() {
        let err = PipelineError::from(FetchError::Upstream {
            status: 502,
            body: "bad gateway".into(),
        });
        let msg = failure_message(&err);
        assert!(msg.starts_with("upstream failure [UPSTREAM_ERROR]"));
        assert!(msg.contains("transient"));
    }
}

use chrono::{DateTime, Datelike, Duration, SecondsFormat, TimeZone, Utc};

use crate::error::{Result, SchedulerError};
use crate::types::Schedule;

/// Compute the next UTC execution time for `schedule` strictly *after* `from`.
pub fn compute_next_run(schedule: &Schedule, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Interval { every_secs } => {
            let secs = i64::try_from(*every_secs).ok()?;
            Some(from + Duration::try_seconds(secs)?)
        }

        Schedule::Daily { hour, minute } => {
            // Build today's candidate at HH:MM:00 UTC.
            let candidate = Utc
                .with_ymd_and_hms(
                    from.year(),
                    from.month(),
                    from.day(),
                    *hour as u32,
                    *minute as u32,
                    0,
                )
                .single()?;
            if candidate > from {
                Some(candidate)
            } else {
                // Today's window has passed: advance to tomorrow.
                Some(candidate + Duration::days(1))
            }
        }
    }
}

/// Reject schedules that can never fire.
pub fn validate(schedule: &Schedule) -> Result<()> {
    match schedule {
        Schedule::Interval { every_secs: 0 } => Err(SchedulerError::InvalidSchedule(
            "interval must be at least one second".to_string(),
        )),
        Schedule::Daily { hour, minute } if *hour > 23 || *minute > 59 => Err(
            SchedulerError::InvalidSchedule(format!("{hour:02}:{minute:02} is not a time of day")),
        ),
        _ => Ok(()),
    }
}

/// Fixed-width RFC 3339 (`2024-03-15T00:05:00Z`) so stored timestamps
/// compare correctly as strings in SQL.
pub fn format_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

//! Reference-instant arithmetic. Every instant is UTC: Spotify reports
//! `played_at` in UTC, so "yesterday" is the previous UTC calendar day.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::{PlaylogError, Result};

pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Unix seconds sent as the API's `after` parameter:
/// `floor_seconds(reference - 1 day) + offset_secs`.
pub fn cutoff_unix_secs(reference: DateTime<Utc>, offset_secs: i64) -> i64 {
    (reference - Duration::days(1)).timestamp() + offset_secs
}

/// The calendar day whose plays a run keeps.
pub fn target_day(reference: DateTime<Utc>) -> NaiveDate {
    (reference - Duration::days(1)).date_naive()
}

/// Reference instant whose target day is `day` (midnight UTC of the day after).
pub fn reference_for_target_day(day: NaiveDate) -> Result<DateTime<Utc>> {
    let next = day
        .checked_add_days(Days::new(1))
        .ok_or_else(|| PlaylogError::InvalidDate {
            input: day.format(DAY_FORMAT).to_string(),
        })?;
    Ok(next.and_time(NaiveTime::MIN).and_utc())
}

pub fn parse_day(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DAY_FORMAT).map_err(|_| PlaylogError::InvalidDate {
        input: input.to_string(),
    })
}

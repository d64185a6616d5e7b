use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use playlog_core::clock::{target_day, DAY_FORMAT};
use playlog_core::types::{date_prefix, PlayRecord, RawItem};
use tracing::{debug, info};

use crate::error::{RecordField, TransformError};

/// Result of a successful transform. Only `Records` should be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// Target-day records in API order, plus how many other-day items were dropped.
    Records {
        records: Vec<PlayRecord>,
        dropped: usize,
    },
    /// The API returned nothing.
    EmptyBatch,
    /// Items came back but none were played on the target day.
    NoRecordsForTargetDay { target_day: NaiveDate, dropped: usize },
}

/// Validate a fetched batch and keep the plays from the day before `reference`.
pub fn transform(
    items: &[RawItem],
    reference: DateTime<Utc>,
) -> Result<TransformOutcome, TransformError> {
    transform_for_day(items, target_day(reference))
}

/// Same as [`transform`] with the target day given directly.
///
/// Checks run in a fixed order: empty batch, `played_at` uniqueness, missing
/// fields, timestamp shape, then the day filter. The first failing check wins.
pub fn transform_for_day(
    items: &[RawItem],
    target: NaiveDate,
) -> Result<TransformOutcome, TransformError> {
    if items.is_empty() {
        info!("no tracks downloaded");
        return Ok(TransformOutcome::EmptyBatch);
    }

    ensure_unique_played_at(items)?;

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        records.push(project(index, item)?);
    }
    debug!(count = records.len(), "batch projected");

    let target_str = target.format(DAY_FORMAT).to_string();
    let total = records.len();
    records.retain(|r| r.date_played == target_str);
    let dropped = total - records.len();
    if dropped > 0 {
        info!(dropped, target_day = %target_str, "dropped tracks not played on the target day");
    }

    if records.is_empty() {
        info!(target_day = %target_str, "no tracks from the target day");
        return Ok(TransformOutcome::NoRecordsForTargetDay {
            target_day: target,
            dropped,
        });
    }

    Ok(TransformOutcome::Records { records, dropped })
}

/// Items without a timestamp are left for the missing-field check.
fn ensure_unique_played_at(items: &[RawItem]) -> Result<(), TransformError> {
    let mut seen = HashSet::with_capacity(items.len());
    for played_at in items.iter().filter_map(RawItem::played_at) {
        if !seen.insert(played_at) {
            return Err(TransformError::DuplicateKey {
                played_at: played_at.to_string(),
            });
        }
    }
    Ok(())
}

fn project(index: usize, item: &RawItem) -> Result<PlayRecord, TransformError> {
    let missing = |field| TransformError::MissingField { index, field };

    let track_name = item.track_name().ok_or_else(|| missing(RecordField::TrackName))?;
    let author_name = item
        .first_artist_name()
        .ok_or_else(|| missing(RecordField::AuthorName))?;
    let played_at = item.played_at().ok_or_else(|| missing(RecordField::PlayedAt))?;

    let date_played = date_prefix(played_at)
        .filter(|d| NaiveDate::parse_from_str(d, DAY_FORMAT).is_ok())
        .ok_or_else(|| TransformError::MalformedTimestamp {
            index,
            value: played_at.to_string(),
        })?;

    Ok(PlayRecord {
        track_name: track_name.to_string(),
        author_name: author_name.to_string(),
        played_at: played_at.to_string(),
        date_played: date_played.to_string(),
    })
}

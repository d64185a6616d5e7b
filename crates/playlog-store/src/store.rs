use std::sync::{Mutex, MutexGuard};

use playlog_core::PlayRecord;
use rusqlite::{Connection, ErrorCode};
use tracing::{debug, info, warn};

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::types::{DaySummary, LoadOutcome};

/// Append-only store of played tracks.
///
/// Wraps the SQLite connection in a Mutex so the pipeline can be shared with
/// the scheduler's delivery task. Runs are expected not to overlap.
pub struct PlayedTracksStore {
    db: Mutex<Connection>,
}

impl PlayedTracksStore {
    /// Take ownership of `conn`, creating the table if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert all `records` in one transaction.
    ///
    /// A primary-key conflict on any record rolls the whole write back and is
    /// reported as [`LoadOutcome::AlreadyPresent`]. Every other failure,
    /// including non-uniqueness constraint violations, is returned as an error.
    pub fn load(&self, records: &[PlayRecord]) -> Result<LoadOutcome> {
        let mut db = self.conn()?;
        init_db(&db)?;

        let tx = db.transaction()?;
        let conflict = {
            let mut stmt = tx.prepare(
                "INSERT INTO played_tracks
                 (track_name, author_name, datetime_played, date_played)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut conflict = None;
            for record in records {
                match stmt.execute(rusqlite::params![
                    record.track_name,
                    record.author_name,
                    record.played_at,
                    record.date_played,
                ]) {
                    Ok(_) => {}
                    Err(e) if is_unique_violation(&e) => {
                        conflict = Some(record.played_at.clone());
                        break;
                    }
                    // dropping `tx` rolls back
                    Err(e) => return Err(e.into()),
                }
            }
            conflict
        };

        match conflict {
            Some(conflicting) => {
                tx.rollback()?;
                warn!(%conflicting, batch = records.len(), "data already exists in the database");
                Ok(LoadOutcome::AlreadyPresent { conflicting })
            }
            None => {
                tx.commit()?;
                info!(rows = records.len(), "data loaded");
                Ok(LoadOutcome::Inserted {
                    rows: records.len(),
                })
            }
        }
    }

    /// Total number of stored plays.
    pub fn count(&self) -> Result<u64> {
        let db = self.conn()?;
        let n: i64 = db.query_row("SELECT COUNT(*) FROM played_tracks", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Plays stored for `date_played` (`YYYY-MM-DD`), newest first.
    pub fn records_for_day(&self, date_played: &str) -> Result<Vec<PlayRecord>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT track_name, author_name, datetime_played, date_played
             FROM played_tracks
             WHERE date_played = ?1
             ORDER BY datetime_played DESC",
        )?;
        let rows = stmt.query_map([date_played], |row| {
            Ok(PlayRecord {
                track_name: row.get(0)?,
                author_name: row.get(1)?,
                played_at: row.get(2)?,
                date_played: row.get(3)?,
            })
        })?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(date_played, count = records.len(), "records read back");
        Ok(records)
    }

    /// Per-day play counts, most recent day first.
    pub fn days(&self, limit: usize) -> Result<Vec<DaySummary>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT date_played, COUNT(*) FROM played_tracks
             GROUP BY date_played
             ORDER BY date_played DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(DaySummary {
                date_played: row.get(0)?,
                plays: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}

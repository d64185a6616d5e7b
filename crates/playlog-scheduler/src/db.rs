use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// `jobs` holds one row per named job; `job_runs` is the append-only log of
/// what each fired (or missed) slot ended up doing.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id          TEXT    NOT NULL PRIMARY KEY,
            name        TEXT    NOT NULL UNIQUE,
            schedule    TEXT    NOT NULL,   -- JSON-encoded Schedule enum
            last_run    TEXT,               -- RFC 3339 or NULL
            next_run    TEXT,               -- RFC 3339 or NULL
            run_count   INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;

        -- Efficient polling: SELECT … WHERE next_run <= ?  ORDER BY next_run
        CREATE INDEX IF NOT EXISTS idx_jobs_next_run ON jobs (next_run);

        CREATE TABLE IF NOT EXISTS job_runs (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id       TEXT    NOT NULL,
            logical_date TEXT    NOT NULL,
            attempts     INTEGER NOT NULL,
            status       TEXT    NOT NULL,   -- success | failed | missed
            detail       TEXT    NOT NULL,
            finished_at  TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_job_runs_finished ON job_runs (finished_at DESC);
        ",
    )?;
    Ok(())
}

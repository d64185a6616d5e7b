use rusqlite::{Connection, Result};

/// Create the `played_tracks` table. Safe to call on every run (idempotent).
///
/// `datetime_played` is the full `played_at` timestamp and the primary key;
/// it is what makes a repeated load of the same batch a no-op.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS played_tracks (
            track_name      TEXT NOT NULL,
            author_name     TEXT NOT NULL,
            datetime_played TEXT NOT NULL,
            date_played     TEXT NOT NULL,
            CONSTRAINT primary_key_constraint PRIMARY KEY (datetime_played)
        );
        CREATE INDEX IF NOT EXISTS idx_played_tracks_date
            ON played_tracks(date_played);",
    )
}

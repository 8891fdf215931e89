use rusqlite::Connection;

use crate::error::Result;

/// Initialise the job schema in `conn`.
///
/// Creates the `jobs` table (idempotent) and an index on `due_at` so the
/// startup reload stays efficient with thousands of stored jobs.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id            TEXT    NOT NULL PRIMARY KEY,
            name          TEXT    NOT NULL,
            kind          TEXT    NOT NULL,   -- 'one_time' | 'recurring'
            due_at        INTEGER NOT NULL,   -- epoch seconds
            interval_secs INTEGER,            -- NULL for one_time jobs
            command       TEXT    NOT NULL,
            status        TEXT    NOT NULL DEFAULT 'pending',
            runs          INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT    NOT NULL,
            updated_at    TEXT    NOT NULL
        ) STRICT;

        -- Startup reload: SELECT … WHERE status = 'pending' AND due_at >= ?
        CREATE INDEX IF NOT EXISTS idx_jobs_due_at ON jobs (due_at);
        ",
    )?;
    Ok(())
}

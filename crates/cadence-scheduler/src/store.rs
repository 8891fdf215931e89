use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tracing::warn;

use crate::error::{Result, SchedulerError};
use crate::types::{Job, JobKind, JobStatus};

const JOB_COLUMNS: &str =
    "id, name, kind, due_at, interval_secs, command, status, runs, created_at, updated_at";

/// Durable job store over a shared SQLite connection.
///
/// Cloneable handle: the scheduler facade, the dispatcher side, and the
/// worker all write through the same connection, serialised by the mutex.
#[derive(Clone)]
pub struct JobStore {
    conn: Arc<Mutex<Connection>>,
}

impl JobStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Persist a new job record.
    pub fn insert(&self, job: &Job) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO jobs
             (id, name, kind, due_at, interval_secs, command, status, runs,
              created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            rusqlite::params![
                job.id,
                job.name,
                job.kind.to_string(),
                job.due_at,
                job.interval_secs,
                job.command,
                job.status.to_string(),
                job.runs,
                job.created_at,
                job.updated_at
            ],
        )?;
        Ok(())
    }

    /// Delete the record matching exactly `name` and `due_at`.
    /// Returns `JobNotFound` if no row is deleted.
    pub fn delete(&self, name: &str, due_at: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM jobs WHERE name = ?1 AND due_at = ?2",
            rusqlite::params![name, due_at],
        )?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound {
                name: name.to_string(),
                due_at,
            });
        }
        Ok(())
    }

    /// Mark an occurrence processed: status becomes `completed` and the run
    /// counter advances. Failed commands land here too — completion tracks
    /// "processed", not "succeeded".
    pub fn mark_completed(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE jobs SET status = 'completed', runs = runs + 1, updated_at = ?1
             WHERE id = ?2",
            rusqlite::params![Utc::now().to_rfc3339(), id],
        )?;
        if n == 0 {
            warn!(job_id = %id, "mark_completed: no such record");
        }
        Ok(())
    }

    /// Advance a recurring job to its next occurrence: `due_at` moves to
    /// `next_due`, the run counter advances, and the record stays pending.
    ///
    /// Returns `false` when the record no longer exists — the caller must
    /// then not re-index a successor for it.
    pub fn reschedule(&self, id: &str, next_due: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE jobs SET due_at = ?1, runs = runs + 1, status = 'pending',
                             updated_at = ?2
             WHERE id = ?3",
            rusqlite::params![next_due, Utc::now().to_rfc3339(), id],
        )?;
        Ok(n > 0)
    }

    /// Pending jobs due at or after `now`, ordered by due-time. Used for the
    /// startup index rebuild.
    pub fn load_pending_from(&self, now: i64) -> Result<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs
             WHERE status = 'pending' AND due_at >= ?1
             ORDER BY due_at"
        ))?;
        let jobs = stmt
            .query_map([now], decode_row)?
            .filter_map(parse_row)
            .collect();
        Ok(jobs)
    }

    /// Count of pending jobs whose due-time already passed.
    pub fn count_stale(&self, now: i64) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = 'pending' AND due_at < ?1",
            [now],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete every job record. Returns the number of rows removed.
    pub fn clear_all(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM jobs", [])?;
        Ok(n)
    }

    /// All known jobs ordered by creation time.
    pub fn list(&self) -> Result<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at"))?;
        let jobs = stmt
            .query_map([], decode_row)?
            .filter_map(parse_row)
            .collect();
        Ok(jobs)
    }

    /// Fetch a single record by id.
    pub fn get(&self, id: &str) -> Result<Option<Job>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"))?;
        let job = stmt
            .query_map([id], decode_row)?
            .filter_map(parse_row)
            .next();
        Ok(job)
    }
}

type RawRow = (
    String,         // id
    String,         // name
    String,         // kind
    i64,            // due_at
    Option<i64>,    // interval_secs
    String,         // command
    String,         // status
    u32,            // runs
    String,         // created_at
    String,         // updated_at
);

fn decode_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

/// Rows with an unreadable kind/status are dropped rather than failing the
/// whole query.
fn parse_row(raw: rusqlite::Result<RawRow>) -> Option<Job> {
    let (id, name, kind_str, due_at, interval_secs, command, status_str, runs, created_at, updated_at) =
        raw.ok()?;
    let kind: JobKind = kind_str.parse().ok()?;
    let status: JobStatus = status_str.parse().ok()?;
    Some(Job {
        id,
        name,
        kind,
        due_at,
        interval_secs,
        command,
        status,
        runs,
        created_at,
        updated_at,
    })
}

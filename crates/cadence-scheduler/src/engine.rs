use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::init_db;
use crate::error::{Result, SchedulerError};
use crate::index::PendingIndex;
use crate::store::JobStore;
use crate::types::{Job, JobKind, JobStatus};

/// Owned scheduler state: the durable job store plus the live pending index.
///
/// This is the management surface collaborators call into. The handle is
/// cloneable; create/cancel/clear may run concurrently with the dispatcher
/// tick and the worker loop — all shared state is behind the index mutex and
/// the store's connection mutex.
#[derive(Clone)]
pub struct Scheduler {
    store: JobStore,
    index: Arc<Mutex<PendingIndex>>,
}

impl Scheduler {
    /// Create a scheduler over `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            store: JobStore::new(conn),
            index: Arc::new(Mutex::new(PendingIndex::new())),
        })
    }

    /// The shared pending index, for wiring the dispatcher and the worker.
    pub fn index(&self) -> Arc<Mutex<PendingIndex>> {
        self.index.clone()
    }

    /// The underlying store handle, for wiring the worker.
    pub fn store(&self) -> JobStore {
        self.store.clone()
    }

    /// Validate and create a job, inserting it into the store and the
    /// pending index. From the caller's perspective both inserts succeed or
    /// the job is not live.
    pub fn create_job(
        &self,
        name: &str,
        kind: JobKind,
        due_at: i64,
        interval_secs: Option<i64>,
        command: &str,
    ) -> Result<Job> {
        if name.trim().is_empty() {
            return Err(SchedulerError::InvalidJob("name must not be empty".into()));
        }
        if command.trim().is_empty() {
            return Err(SchedulerError::InvalidJob(
                "command must not be empty".into(),
            ));
        }
        if due_at <= 0 {
            return Err(SchedulerError::InvalidJob(
                "due_at must be a positive epoch timestamp".into(),
            ));
        }
        match kind {
            JobKind::Recurring => {
                if !interval_secs.is_some_and(|i| i > 0) {
                    return Err(SchedulerError::InvalidJob(
                        "recurring jobs require a positive interval".into(),
                    ));
                }
            }
            JobKind::OneTime => {
                if interval_secs.is_some() {
                    return Err(SchedulerError::InvalidJob(
                        "one-time jobs must not carry an interval".into(),
                    ));
                }
            }
        }

        let now_str = Utc::now().to_rfc3339();
        let job = Job {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind,
            due_at,
            interval_secs,
            command: command.to_string(),
            status: JobStatus::Pending,
            runs: 0,
            created_at: now_str.clone(),
            updated_at: now_str,
        };

        // Hold the index lock across the store insert so a concurrent
        // clear_all cannot observe the row without its index entry.
        let mut index = self.index.lock().unwrap();
        self.store.insert(&job)?;
        index.insert(job.clone());
        info!(job_id = %job.id, name = %job.name, due_at, kind = %kind, "job created");
        Ok(job)
    }

    /// Cancel a live job: evict it from the pending index and delete the
    /// store record. `JobNotFound` when neither side knows `name` @ `due_at`.
    pub fn cancel_job(&self, name: &str, due_at: i64) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SchedulerError::InvalidJob("name must not be empty".into()));
        }
        let evicted = self.index.lock().unwrap().remove(name, due_at);
        match self.store.delete(name, due_at) {
            Ok(()) => {
                info!(%name, due_at, evicted, "job cancelled");
                Ok(())
            }
            // The index held an entry but the row was already gone — the job
            // is no longer live either way.
            Err(SchedulerError::JobNotFound { .. }) if evicted > 0 => {
                warn!(%name, due_at, "cancelled index entry had no store record");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a stored job by exact name and due-time. The index eviction is
    /// best-effort; `JobNotFound` refers to the store row only.
    pub fn delete_job(&self, name: &str, due_at: i64) -> Result<()> {
        self.index.lock().unwrap().remove(name, due_at);
        self.store.delete(name, due_at)?;
        info!(%name, due_at, "job deleted");
        Ok(())
    }

    /// Wipe the store and the pending index together.
    ///
    /// The index lock is held across the store wipe so a concurrent tick
    /// cannot dispatch a job whose record was just deleted.
    pub fn clear_all(&self) -> Result<usize> {
        let mut index = self.index.lock().unwrap();
        let removed = self.store.clear_all()?;
        index.clear();
        info!(removed, "all jobs cleared");
        Ok(removed)
    }

    /// Rebuild the pending index from the store. Returns the number of jobs
    /// indexed.
    ///
    /// Only pending jobs due now or later are loaded; pending rows whose
    /// due-time passed while the process was down are counted and logged,
    /// never fired.
    pub fn load_pending(&self) -> Result<usize> {
        let now = Utc::now().timestamp();
        let stale = self.store.count_stale(now)?;
        if stale > 0 {
            warn!(count = stale, "stale pending jobs left unscheduled");
        }
        let jobs = self.store.load_pending_from(now)?;
        let count = jobs.len();
        let mut index = self.index.lock().unwrap();
        for job in jobs {
            index.insert(job);
        }
        info!(count, "pending jobs loaded into index");
        Ok(count)
    }

    /// All stored jobs ordered by creation time.
    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        self.store.list()
    }
}

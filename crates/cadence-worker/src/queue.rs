use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use cadence_core::result::ExecutionResult;
use cadence_notify::ResultBroadcaster;
use cadence_scheduler::{Job, JobKind, JobSink, JobStore, PendingIndex};

use crate::exec::run_command;

/// Single-consumer FIFO execution queue.
///
/// `enqueue` may be called from any task, concurrently with a running drain.
/// The drain loop runs on at most one task at a time — the draining flag
/// gates it — so queued commands execute strictly serially and never overlap.
/// The queue itself is transient: jobs only exist here between dispatch and
/// completion.
#[derive(Clone)]
pub struct ExecutionQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    jobs: Mutex<VecDeque<Job>>,
    draining: AtomicBool,
    store: JobStore,
    index: Arc<Mutex<PendingIndex>>,
    broadcaster: ResultBroadcaster,
    exec_timeout: Option<Duration>,
}

impl ExecutionQueue {
    pub fn new(
        store: JobStore,
        index: Arc<Mutex<PendingIndex>>,
        broadcaster: ResultBroadcaster,
        exec_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                jobs: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                store,
                index,
                broadcaster,
                exec_timeout,
            }),
        }
    }

    /// Append a job and start the drain loop if none is running.
    pub fn enqueue(&self, job: Job) {
        debug!(job_id = %job.id, name = %job.name, "job queued");
        self.inner.jobs.lock().unwrap().push_back(job);
        self.try_start_drain();
    }

    /// Jobs currently waiting (not counting one mid-execution).
    pub fn len(&self) -> usize {
        self.inner.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.jobs.lock().unwrap().is_empty()
    }

    fn try_start_drain(&self) {
        // Already-true means a drain task owns the queue.
        if self.inner.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        let inner = self.inner.clone();
        tokio::spawn(async move {
            drain(inner).await;
        });
    }
}

impl JobSink for ExecutionQueue {
    fn submit(&self, job: Job) {
        self.enqueue(job);
    }
}

/// Serial drain: pop one job, run it to completion, repeat until empty.
async fn drain(inner: Arc<QueueInner>) {
    loop {
        let job = inner.jobs.lock().unwrap().pop_front();
        match job {
            Some(job) => process(&inner, job).await,
            None => {
                inner.draining.store(false, Ordering::Release);
                // An enqueue may have slipped in between the pop and the flag
                // clear; whoever wins the swap keeps draining.
                if inner.jobs.lock().unwrap().is_empty()
                    || inner.draining.swap(true, Ordering::AcqRel)
                {
                    break;
                }
            }
        }
    }
}

/// Execute one occurrence: run the command, persist completion, reschedule a
/// recurring job, broadcast the outcome. Every failure is contained here —
/// nothing escapes to stop the loop.
async fn process(inner: &QueueInner, job: Job) {
    info!(job_id = %job.id, name = %job.name, command = %job.command, "executing job");
    let outcome = run_command(&job.command, inner.exec_timeout).await;
    if !outcome.success {
        warn!(job_id = %job.id, name = %job.name, "{}", outcome.message);
    }

    let persisted = match (job.kind, job.interval_secs) {
        (JobKind::Recurring, Some(interval)) => {
            // The single rescheduling path: next occurrence is offset from
            // the due-time that just fired, not from wall-clock now.
            let next_due = job.due_at + interval;
            match inner.store.reschedule(&job.id, next_due) {
                Ok(true) => {
                    let mut successor = job.clone();
                    successor.due_at = next_due;
                    successor.runs += 1;
                    inner.index.lock().unwrap().insert(successor);
                    info!(job_id = %job.id, next_due, "recurring job rescheduled");
                    Ok(())
                }
                // Cancelled or cleared while the occurrence was in flight:
                // do not resurrect it in the index.
                Ok(false) => {
                    warn!(job_id = %job.id, "record gone; not rescheduling");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        (JobKind::Recurring, None) => {
            // Cannot happen for validated jobs; complete the record instead
            // of rescheduling into nowhere.
            warn!(job_id = %job.id, "recurring job without an interval; completing");
            inner.store.mark_completed(&job.id)
        }
        (JobKind::OneTime, _) => inner.store.mark_completed(&job.id),
    };
    if let Err(e) = persisted {
        error!(job_id = %job.id, error = %e, "failed to persist completion");
    }

    inner.broadcaster.publish(ExecutionResult {
        job_id: job.id,
        name: job.name,
        command: job.command,
        success: outcome.success,
        message: outcome.message,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_scheduler::{db::init_db, JobStatus};
    use rusqlite::Connection;

    fn queue() -> (ExecutionQueue, JobStore, Arc<Mutex<PendingIndex>>, ResultBroadcaster) {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let store = JobStore::new(conn);
        let index = Arc::new(Mutex::new(PendingIndex::new()));
        let broadcaster = ResultBroadcaster::new(32);
        let queue = ExecutionQueue::new(
            store.clone(),
            index.clone(),
            broadcaster.clone(),
            None,
        );
        (queue, store, index, broadcaster)
    }

    fn job(name: &str, command: &str) -> Job {
        let now = chrono::Utc::now().to_rfc3339();
        Job {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind: JobKind::OneTime,
            due_at: chrono::Utc::now().timestamp(),
            interval_secs: None,
            command: command.to_string(),
            status: JobStatus::Pending,
            runs: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn drains_in_fifo_order() {
        let (queue, _store, _index, broadcaster) = queue();
        let mut results = broadcaster.subscribe();

        queue.enqueue(job("first", "echo one"));
        queue.enqueue(job("second", "echo two"));
        queue.enqueue(job("third", "echo three"));

        let mut order = Vec::new();
        for _ in 0..3 {
            order.push(results.recv().await.unwrap().name);
        }
        assert_eq!(order, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn commands_never_overlap() {
        let (queue, _store, _index, broadcaster) = queue();
        let mut results = broadcaster.subscribe();

        let marker = std::env::temp_dir().join(format!(
            "cadence-overlap-{}",
            uuid::Uuid::new_v4()
        ));
        let path = marker.display();
        let cmd = |tag: &str| {
            format!("echo {tag}-start >> {path}; sleep 0.3; echo {tag}-end >> {path}")
        };

        queue.enqueue(job("a", &cmd("a")));
        queue.enqueue(job("b", &cmd("b")));
        for _ in 0..2 {
            results.recv().await.unwrap();
        }

        let trace = std::fs::read_to_string(&marker).unwrap();
        let lines: Vec<&str> = trace.lines().collect();
        // Serial execution: each job's start/end pair is uninterrupted.
        assert_eq!(lines, ["a-start", "a-end", "b-start", "b-end"]);
        let _ = std::fs::remove_file(&marker);
    }

    #[tokio::test]
    async fn failed_command_broadcasts_failure_but_completes_the_record() {
        let (queue, store, _index, broadcaster) = queue();
        let mut results = broadcaster.subscribe();

        let j = job("doomed", "exit 1");
        store.insert(&j).unwrap();
        queue.enqueue(j.clone());

        let result = results.recv().await.unwrap();
        assert!(!result.success);
        assert!(result.message.starts_with("Error:"));

        let record = store.get(&j.id).unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.runs, 1);
    }

    #[tokio::test]
    async fn recurring_job_gets_exactly_one_successor() {
        let (queue, store, index, broadcaster) = queue();
        let mut results = broadcaster.subscribe();

        let mut j = job("heartbeat", "echo beat");
        j.kind = JobKind::Recurring;
        j.interval_secs = Some(60);
        store.insert(&j).unwrap();
        queue.enqueue(j.clone());

        assert!(results.recv().await.unwrap().success);

        let next_due = j.due_at + 60;
        let index = index.lock().unwrap();
        assert_eq!(index.len(), 1);
        let bucket = index.jobs_at(next_due);
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].id, j.id);
        assert_eq!(bucket[0].runs, 1);

        let record = store.get(&j.id).unwrap().unwrap();
        assert_eq!(record.due_at, next_due);
        assert_eq!(record.status, JobStatus::Pending);
        assert_eq!(record.runs, 1);
    }

    #[tokio::test]
    async fn recurring_job_without_a_record_is_not_resurrected() {
        let (queue, store, index, broadcaster) = queue();
        let mut results = broadcaster.subscribe();

        let mut j = job("gone", "echo bye");
        j.kind = JobKind::Recurring;
        j.interval_secs = Some(60);
        // The record was cancelled while the occurrence was in flight.
        queue.enqueue(j.clone());

        results.recv().await.unwrap();
        assert!(index.lock().unwrap().is_empty());
        assert!(store.get(&j.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_store_record_does_not_stall_the_queue() {
        let (queue, _store, _index, broadcaster) = queue();
        let mut results = broadcaster.subscribe();

        // Never inserted into the store: completion persistence warns and
        // the queue moves on.
        queue.enqueue(job("ghost", "echo boo"));
        queue.enqueue(job("next", "echo fine"));

        assert_eq!(results.recv().await.unwrap().name, "ghost");
        assert_eq!(results.recv().await.unwrap().name, "next");
    }
}

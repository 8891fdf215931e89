use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use cadence_core::config::TICK_INTERVAL_SECS;

use crate::index::PendingIndex;
use crate::types::Job;

/// Submission seam between the dispatcher and the execution queue.
///
/// `submit` must not block: it is called from the tick loop once per due job,
/// with the index lock already released.
pub trait JobSink: Send + Sync + 'static {
    fn submit(&self, job: Job);
}

/// Promotes due jobs from the pending index into a [`JobSink`].
///
/// Single task, fixed 1-second tick. Each tick sweeps every bucket with
/// due-time at or before the current second, so seconds skipped under load
/// are still flushed on the next tick.
pub struct Dispatcher<S: JobSink> {
    index: Arc<Mutex<PendingIndex>>,
    sink: S,
}

impl<S: JobSink> Dispatcher<S> {
    pub fn new(index: Arc<Mutex<PendingIndex>>, sink: S) -> Self {
        Self { index, sink }
    }

    /// Main loop. Ticks every second until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("dispatcher started");
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(TICK_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now().timestamp());
                }
                res = shutdown.changed() => {
                    // A dropped sender also means shutdown.
                    if res.is_err() || *shutdown.borrow() {
                        info!("dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Promote every job due at or before `now`.
    ///
    /// Dispatched entries leave the index as part of the sweep. Recurring
    /// jobs are rescheduled by the worker after the occurrence completes,
    /// never by the dispatcher.
    fn tick(&self, now: i64) {
        let due = self.index.lock().unwrap().take_due(now);
        if due.is_empty() {
            return;
        }
        debug!(count = due.len(), now, "promoting due jobs");
        for job in due {
            // Corrupt entries must not take down the tick.
            if job.id.is_empty() {
                warn!(name = %job.name, due_at = job.due_at, "skipping index entry with no id");
                continue;
            }
            self.sink.submit(job);
        }
    }
}

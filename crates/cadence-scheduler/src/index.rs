use std::collections::BTreeMap;

use crate::types::Job;

/// In-memory due-time index: epoch second → insertion-ordered bucket of jobs
/// awaiting dispatch.
///
/// Rebuilt from the store at startup. Owned behind a mutex shared by the
/// dispatcher (draining), the worker (rescheduling recurring jobs), and the
/// management handle (create/cancel/clear). A job appears at most once per
/// pending cycle; empty buckets are pruned on every mutation that could
/// leave one behind.
#[derive(Debug, Default)]
pub struct PendingIndex {
    buckets: BTreeMap<i64, Vec<Job>>,
}

impl PendingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `job` to the bucket for its due-time.
    pub fn insert(&mut self, job: Job) {
        self.buckets.entry(job.due_at).or_default().push(job);
    }

    /// Evict every job named `name` from the `due_at` bucket, pruning the
    /// bucket when it ends up empty. Returns the number of evicted entries;
    /// 0 means nothing matched.
    ///
    /// Index-only: deleting the persisted record is the store's concern, and
    /// the two compose in `Scheduler::cancel_job`.
    pub fn remove(&mut self, name: &str, due_at: i64) -> usize {
        let Some(bucket) = self.buckets.get_mut(&due_at) else {
            return 0;
        };
        let before = bucket.len();
        bucket.retain(|job| job.name != name);
        let evicted = before - bucket.len();
        if bucket.is_empty() {
            self.buckets.remove(&due_at);
        }
        evicted
    }

    /// Drain all buckets with due-time ≤ `now`, oldest bucket first,
    /// insertion order within a bucket.
    ///
    /// Buckets are removed as they drain, so an entry is returned at most
    /// once across ticks — including entries whose second was skipped while
    /// the process stalled.
    pub fn take_due(&mut self, now: i64) -> Vec<Job> {
        let due_keys: Vec<i64> = self.buckets.range(..=now).map(|(k, _)| *k).collect();
        let mut jobs = Vec::new();
        for key in due_keys {
            if let Some(bucket) = self.buckets.remove(&key) {
                jobs.extend(bucket);
            }
        }
        jobs
    }

    /// Jobs currently indexed at `due_at`, in insertion order.
    pub fn jobs_at(&self, due_at: i64) -> &[Job] {
        self.buckets.get(&due_at).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Empty the index. Does not touch the store.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Total entries across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

//! `cadence-scheduler` — durable job store, pending index, and dispatch loop.
//!
//! # Overview
//!
//! Jobs are persisted to a SQLite `jobs` table and mirrored into an in-memory
//! [`PendingIndex`] keyed by due-time (epoch seconds). The [`Dispatcher`]
//! ticks once per second and promotes every job due at or before the current
//! second into a [`JobSink`] — the seam behind which the execution queue
//! lives. The [`Scheduler`] facade is the management surface: create, cancel,
//! delete, clear, list, and the startup index rebuild.
//!
//! Recurring jobs are *not* rescheduled here. Rescheduling happens exactly
//! once per completed occurrence, on the worker side, so there is a single
//! authoritative path for it.

pub mod db;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod index;
pub mod store;
pub mod types;

pub use dispatch::{Dispatcher, JobSink};
pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
pub use index::PendingIndex;
pub use store::JobStore;
pub use types::{Job, JobKind, JobStatus};

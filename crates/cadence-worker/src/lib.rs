//! `cadence-worker` — the execution side of the scheduler.
//!
//! The dispatcher submits due jobs into the [`ExecutionQueue`]; a single
//! drain task pops them in FIFO order and runs each command to completion
//! before touching the next, so commands never overlap. Each occurrence is
//! persisted back to the store, broadcast to result subscribers, and — for
//! recurring jobs — rescheduled here, the one authoritative place recurrence
//! happens.

pub mod exec;
pub mod queue;

pub use exec::{run_command, ExecOutcome};
pub use queue::ExecutionQueue;

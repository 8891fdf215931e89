//! Execution result payload — shared between the worker and all result
//! subscribers.

use serde::{Deserialize, Serialize};

/// Outcome of one executed job occurrence.
///
/// Broadcast once per execution to every connected subscriber. Delivery is
/// fire-and-forget: there is no replay, so subscribers that connect after an
/// occurrence never see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Identity of the job that ran (UUID string).
    pub job_id: String,
    /// Human-readable job label.
    pub name: String,
    /// The shell command that was executed.
    pub command: String,
    /// True when the command exited cleanly with no error marker on stderr.
    pub success: bool,
    /// Captured output on success, error text on failure.
    pub message: String,
}

use serde::{Deserialize, Serialize};

/// Whether a job fires once or repeats on a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Fire once at `due_at`, then the record is terminal.
    OneTime,
    /// Fire at `due_at`, then again every `interval_secs` seconds.
    Recurring,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobKind::OneTime => "one_time",
            JobKind::Recurring => "recurring",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "one_time" => Ok(JobKind::OneTime),
            "recurring" => Ok(JobKind::Recurring),
            other => Err(format!("unknown job kind: {other}")),
        }
    }
}

/// Lifecycle state of a job record.
///
/// `Completed` means "processed", not "succeeded" — a command that exited
/// nonzero still completes its occurrence. The success flag travels in the
/// broadcast result instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the pending index for its due-time.
    Pending,
    /// The occurrence ran; one-time jobs are terminal here.
    Completed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "completed" => Ok(JobStatus::Completed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A persisted job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// UUID v4 string — primary key.
    pub id: String,
    /// Human-readable label. Not required to be unique.
    pub name: String,
    /// One-shot or recurring.
    pub kind: JobKind,
    /// Epoch-second timestamp at which the job becomes eligible for dispatch.
    pub due_at: i64,
    /// Recurrence interval in seconds. `Some` iff `kind` is recurring, and
    /// then always positive.
    pub interval_secs: Option<i64>,
    /// Shell command executed via `sh -c` when the job fires.
    pub command: String,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Number of completed occurrences.
    pub runs: u32,
    /// ISO-8601 timestamp of job creation.
    pub created_at: String,
    /// ISO-8601 timestamp of the last record update.
    pub updated_at: String,
}

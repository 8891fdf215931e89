use thiserror::Error;

/// Errors that can occur within the scheduling subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The job definition failed validation.
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// No job matches the given name and due-time.
    #[error("Job not found: {name} @ {due_at}")]
    JobNotFound { name: String, due_at: i64 },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

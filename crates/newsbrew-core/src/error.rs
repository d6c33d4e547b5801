//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A collaborator (mail provider or LLM) call failed.
    #[error("Collaborator error: {0}")]
    Adapter(#[from] crate::service::AdapterError),

    /// Cron expression could not be parsed.
    #[error("Invalid cron expression: {0}")]
    InvalidCron(String),

    /// A record failed validation before any state was mutated.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Schedule not found.
    #[error("Schedule not found: {0}")]
    ScheduleNotFound(i64),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

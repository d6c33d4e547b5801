//! Error types for mailbox provider operations.

use thiserror::Error;

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the mailbox provider.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport failure (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-success status.
    #[error("provider error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Client was constructed with an unusable configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

//! Error types for LLM operations.

use thiserror::Error;

/// Result type alias for LLM operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while calling the LLM endpoint.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport failure (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint returned a non-success status.
    #[error("LLM API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// The model's reply was not the JSON shape we asked for.
    #[error("failed to parse model output: {0}")]
    Parse(String),

    /// The response contained no choices to read.
    #[error("model returned an empty response")]
    EmptyResponse,
}

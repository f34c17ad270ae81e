//! CLI error types.

use thiserror::Error;

/// Result type for CLI operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors reported to the operator. Every variant exits with status 1.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection to server failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server sent something that is not a response line.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Request timed out.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The server failed to start or stopped abnormally.
    #[error("server error: {0}")]
    Server(#[from] tokserve_server::ServerError),

    /// Logging could not be set up.
    #[error("logging error: {0}")]
    Tracing(#[from] tokserve_core::TracingError),
}

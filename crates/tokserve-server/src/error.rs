//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
///
/// `Io` raised while serving a connection only ends that connection.
/// `Bind` and `Config` abort startup.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error on a socket.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The listen address could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The serving task ended abnormally.
    #[error("Server task failed: {message}")]
    Task { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a bind error.
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    /// Returns true if this is a bind failure.
    pub fn is_bind(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}

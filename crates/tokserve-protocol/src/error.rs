//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that end a connection's framing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A line grew past the configured limit without a delimiter.
    #[error("line too long: {size} bytes (max: {max})")]
    LineTooLong { size: usize, max: usize },
}

/// Why a single line could not be turned into a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    /// The line is not a JSON object.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// A required field is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A required field is present with the wrong JSON type.
    #[error("wrong type for field: {0}")]
    WrongType(&'static str),
}

/// A line that failed to decode.
///
/// Carries the `req` value when it could still be read from the line, so
/// the error response can be correlated by the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct DecodeError {
    /// What went wrong.
    pub kind: DecodeErrorKind,
    /// Best-effort correlation id.
    pub req: Option<i64>,
}

impl DecodeError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self {
            kind: DecodeErrorKind::MalformedJson(detail.into()),
            req: None,
        }
    }

    pub(crate) fn missing(field: &'static str, req: Option<i64>) -> Self {
        Self {
            kind: DecodeErrorKind::MissingField(field),
            req,
        }
    }

    pub(crate) fn wrong_type(field: &'static str, req: Option<i64>) -> Self {
        Self {
            kind: DecodeErrorKind::WrongType(field),
            req,
        }
    }
}

//! The utterance processing capability.
//!
//! A [`Processor`] turns a language tag and an utterance into an opaque
//! JSON result (for the built-in engines, a token list). The server is
//! handed one `Arc<dyn Processor>` at startup and calls it concurrently
//! from every connection, so implementations must be `Send + Sync` and
//! must not assume calls are serialised.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed future returned by processors.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result type for processing operations.
pub type ProcessingResult<T> = Result<T, ProcessingError>;

/// A processor shared between connections.
pub type SharedProcessor = Arc<dyn Processor>;

/// Engine-defined result of processing one utterance.
///
/// The server never inspects this value; it is embedded verbatim as the
/// `result` field of the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessorOutput(serde_json::Value);

impl ProcessorOutput {
    /// Wraps an arbitrary JSON value.
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Builds an output that is a JSON array of tokens.
    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(serde_json::Value::Array(
            tokens
                .into_iter()
                .map(|t| serde_json::Value::String(t.into()))
                .collect(),
        ))
    }

    /// Returns the wrapped JSON value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Unwraps into the JSON value.
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for ProcessorOutput {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Errors a processor may report for a single request.
///
/// These never affect the connection: the server reports the
/// `Display` text in the `error` field of that request's response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    /// No engine is registered for the language tag.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The engine rejected the utterance.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ProcessingError {
    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Capability that processes utterances.
///
/// # Example
///
/// ```rust
/// use tokserve_core::{BoxFuture, Processor, ProcessingResult, ProcessorOutput};
///
/// struct Whitespace;
///
/// impl Processor for Whitespace {
///     fn name(&self) -> &str {
///         "whitespace"
///     }
///
///     fn process<'a>(
///         &'a self,
///         _language_tag: &'a str,
///         utterance: &'a str,
///     ) -> BoxFuture<'a, ProcessingResult<ProcessorOutput>> {
///         Box::pin(async move { Ok(ProcessorOutput::tokens(utterance.split_whitespace())) })
///     }
/// }
/// ```
pub trait Processor: Send + Sync {
    /// Returns the name of this engine, for logs.
    fn name(&self) -> &str;

    /// Processes one utterance written in `language_tag`.
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError` when the input is rejected or the engine
    /// fails. The error only affects this request.
    fn process<'a>(
        &'a self,
        language_tag: &'a str,
        utterance: &'a str,
    ) -> BoxFuture<'a, ProcessingResult<ProcessorOutput>>;
}

impl fmt::Debug for dyn Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Processor for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn process<'a>(
            &'a self,
            language_tag: &'a str,
            utterance: &'a str,
        ) -> BoxFuture<'a, ProcessingResult<ProcessorOutput>> {
            Box::pin(async move {
                if language_tag != "en" {
                    return Err(ProcessingError::UnsupportedLanguage(language_tag.into()));
                }
                Ok(ProcessorOutput::tokens(
                    utterance.split_whitespace().map(str::to_uppercase),
                ))
            })
        }
    }

    #[test]
    fn tokens_output_is_json_array() {
        let output = ProcessorOutput::tokens(["a", "b"]);
        assert_eq!(output.as_value(), &serde_json::json!(["a", "b"]));
        assert_eq!(serde_json::to_string(&output).unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            ProcessingError::UnsupportedLanguage("xx".into()).to_string(),
            "unsupported language: xx"
        );
        assert_eq!(
            ProcessingError::invalid_input("NUL byte").to_string(),
            "invalid input: NUL byte"
        );
    }

    #[tokio::test]
    async fn shared_processor_is_callable() {
        let processor: SharedProcessor = Arc::new(Upper);
        let output = processor.process("en", "hi there").await.unwrap();
        assert_eq!(output.into_value(), serde_json::json!(["HI", "THERE"]));

        let err = processor.process("de", "hallo").await.unwrap_err();
        assert_eq!(err, ProcessingError::UnsupportedLanguage("de".into()));
        assert_eq!(format!("{processor:?}"), r#"Processor { name: "upper" }"#);
    }
}

//! Request and response types for the tokserve protocol.

use serde::{Deserialize, Serialize};
use tokserve_core::ProcessorOutput;

/// One utterance to process.
///
/// Field names on the wire are `languageTag`, `utterance` and `req`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Language of the utterance (`en`, `en_US`, `de`, ...).
    #[serde(rename = "languageTag")]
    pub language_tag: String,
    /// Text to process.
    pub utterance: String,
    /// Client-assigned correlation id, unique per connection.
    pub req: i64,
}

impl Request {
    /// Creates a request.
    pub fn new(language_tag: impl Into<String>, utterance: impl Into<String>, req: i64) -> Self {
        Self {
            language_tag: language_tag.into(),
            utterance: utterance.into(),
            req,
        }
    }
}

/// What a request produced: exactly one of a result or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Processor output.
    Result(ProcessorOutput),
    /// Human-readable failure description.
    Error(String),
}

/// Reply to one request line.
///
/// Serialized as `{"req":N,"result":...}` or `{"req":N|null,"error":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Echo of the request's `req`; `None` if it could not be read.
    pub req: Option<i64>,
    /// Result or error.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    /// Creates a successful response.
    pub fn success(req: i64, output: ProcessorOutput) -> Self {
        Self {
            req: Some(req),
            outcome: Outcome::Result(output),
        }
    }

    /// Creates an error response.
    pub fn failure(req: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            req,
            outcome: Outcome::Error(message.into()),
        }
    }

    /// Returns true if this response carries a result.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Result(_))
    }

    /// Returns the result, if any.
    pub fn result(&self) -> Option<&ProcessorOutput> {
        match &self.outcome {
            Outcome::Result(output) => Some(output),
            Outcome::Error(_) => None,
        }
    }

    /// Returns the error message, if any.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(message) => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_tag() {
        let request = Request::new("en", "hello", 3);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"languageTag": "en", "utterance": "hello", "req": 3})
        );
    }

    #[test]
    fn success_response_shape() {
        let response = Response::success(0, ProcessorOutput::tokens(["hello", "world"]));
        insta::assert_snapshot!(
            serde_json::to_string(&response).unwrap(),
            @r#"{"req":0,"result":["hello","world"]}"#
        );
        assert!(response.is_success());
        assert!(response.error().is_none());
    }

    #[test]
    fn failure_response_shape() {
        let response = Response::failure(None, "malformed JSON: expected value");
        insta::assert_snapshot!(
            serde_json::to_string(&response).unwrap(),
            @r#"{"req":null,"error":"malformed JSON: expected value"}"#
        );
        assert_eq!(response.error(), Some("malformed JSON: expected value"));
        assert!(response.result().is_none());
    }

    #[test]
    fn response_parses_back() {
        let response: Response =
            serde_json::from_str(r#"{"req":4,"error":"missing field: utterance"}"#).unwrap();
        assert_eq!(response, Response::failure(Some(4), "missing field: utterance"));

        let response: Response = serde_json::from_str(r#"{"result":["a"],"req":5}"#).unwrap();
        assert_eq!(response.req, Some(5));
        assert_eq!(response.result(), Some(&ProcessorOutput::tokens(["a"])));
    }
}

//! Line codec: one JSON object per line.

use serde_json::{Map, Value};

use crate::LINE_DELIMITER;
use crate::error::DecodeError;
use crate::types::{Request, Response};

const LANGUAGE_TAG: &str = "languageTag";
const UTTERANCE: &str = "utterance";
const REQ: &str = "req";

/// Decodes one line into a [`Request`].
///
/// A trailing `\n` (and a `\r` before it) is ignored. Unknown fields are
/// ignored. Required fields are checked in the order `languageTag`,
/// `utterance`, `req`, and the first problem found is reported.
///
/// # Errors
///
/// Returns a [`DecodeError`] carrying the `req` value whenever it could
/// still be read from the line.
pub fn decode_line(line: &[u8]) -> Result<Request, DecodeError> {
    let line = trim_line_end(line);

    let value: Value =
        serde_json::from_slice(line).map_err(|e| DecodeError::malformed(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(DecodeError::malformed("expected a JSON object"));
    };

    let req = object.get(REQ).and_then(Value::as_i64);

    let language_tag = string_field(&object, LANGUAGE_TAG, req)?;
    let utterance = string_field(&object, UTTERANCE, req)?;
    let req = match object.get(REQ) {
        None => return Err(DecodeError::missing(REQ, None)),
        Some(value) => value.as_i64().ok_or(DecodeError::wrong_type(REQ, None))?,
    };

    Ok(Request {
        language_tag,
        utterance,
        req,
    })
}

/// Encodes a [`Response`] as a single JSON line terminated by `\n`.
pub fn encode_line(response: &Response) -> Vec<u8> {
    match serde_json::to_vec(response) {
        Ok(mut bytes) => {
            bytes.push(LINE_DELIMITER);
            bytes
        }
        // Only reachable with a processor output that refuses to serialize;
        // the fallback is plain ASCII and needs no escaping.
        Err(_) => {
            let req = response
                .req
                .map_or_else(|| "null".to_string(), |req| req.to_string());
            format!("{{\"req\":{req},\"error\":\"response serialization failed\"}}\n")
                .into_bytes()
        }
    }
}

fn string_field(
    object: &Map<String, Value>,
    field: &'static str,
    req: Option<i64>,
) -> Result<String, DecodeError> {
    match object.get(field) {
        None => Err(DecodeError::missing(field, req)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DecodeError::wrong_type(field, req)),
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(&[LINE_DELIMITER]).unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;
    use tokserve_core::ProcessorOutput;

    #[test]
    fn decode_valid_request() {
        let request =
            decode_line(b"{\"languageTag\":\"en\",\"utterance\":\"hello world\",\"req\":0}\n")
                .unwrap();
        assert_eq!(request, Request::new("en", "hello world", 0));
    }

    #[test]
    fn decode_ignores_field_order_and_extra_fields() {
        let request =
            decode_line(br#"{"req":12,"extra":true,"utterance":"x","languageTag":"de"}"#).unwrap();
        assert_eq!(request, Request::new("de", "x", 12));
    }

    #[test]
    fn decode_strips_carriage_return() {
        let request = decode_line(b"{\"languageTag\":\"en\",\"utterance\":\"a\",\"req\":1}\r\n")
            .unwrap();
        assert_eq!(request.req, 1);
    }

    #[test]
    fn decode_reencoded_request() {
        let original = Request::new("fr", "bonjour \"le\" monde\n", -3);
        let line = serde_json::to_vec(&original).unwrap();
        assert_eq!(decode_line(&line).unwrap(), original);
    }

    #[test]
    fn malformed_json() {
        let err = decode_line(b"not json\n").unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::MalformedJson(_)));
        assert!(err.to_string().starts_with("malformed JSON: "));
        assert_eq!(err.req, None);
    }

    #[test]
    fn non_object_is_malformed() {
        let err = decode_line(b"[1,2,3]").unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::MalformedJson("expected a JSON object".into())
        );
    }

    #[test]
    fn missing_language_tag_keeps_req() {
        let err = decode_line(br#"{"req":1}"#).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::MissingField("languageTag"));
        assert_eq!(err.req, Some(1));
        assert_eq!(err.to_string(), "missing field: languageTag");
    }

    #[test]
    fn missing_utterance() {
        let err = decode_line(br#"{"languageTag":"en","req":2}"#).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::MissingField("utterance"));
        assert_eq!(err.req, Some(2));
    }

    #[test]
    fn missing_req() {
        let err = decode_line(br#"{"languageTag":"en","utterance":"hi"}"#).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::MissingField("req"));
        assert_eq!(err.req, None);
    }

    #[test]
    fn wrong_types() {
        let err = decode_line(br#"{"languageTag":5,"utterance":"hi","req":3}"#).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::WrongType("languageTag"));
        assert_eq!(err.req, Some(3));

        let err = decode_line(br#"{"languageTag":"en","utterance":"hi","req":"3"}"#).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::WrongType("req"));
        assert_eq!(err.req, None);
        assert_eq!(err.to_string(), "wrong type for field: req");

        let err = decode_line(br#"{"languageTag":"en","utterance":"hi","req":1.5}"#).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::WrongType("req"));
    }

    #[test]
    fn encode_success_line() {
        let response = Response::success(0, ProcessorOutput::tokens(["hello", "world"]));
        let line = encode_line(&response);
        assert_eq!(line.last(), Some(&b'\n'));
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
        insta::assert_snapshot!(
            String::from_utf8(line).unwrap().trim_end(),
            @r#"{"req":0,"result":["hello","world"]}"#
        );
    }

    #[test]
    fn encode_error_line() {
        let response = Response::failure(Some(1), "missing field: languageTag");
        assert_eq!(
            encode_line(&response),
            b"{\"req\":1,\"error\":\"missing field: languageTag\"}\n"
        );
    }

    #[test]
    fn encode_escapes_newlines_in_payload() {
        let response = Response::failure(Some(9), "line one\nline two");
        let line = encode_line(&response);
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
    }
}

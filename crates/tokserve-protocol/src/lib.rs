//! Newline-delimited JSON framing and request/response types for tokserve.
//!
//! # Protocol Overview
//!
//! Every message is exactly one JSON object followed by a single `\n`.
//! There is no length prefix; JSON encoding guarantees that a message
//! never contains a raw newline.
//!
//! ```text
//! -> {"languageTag":"en","utterance":"hello world","req":0}
//! <- {"req":0,"result":["hello","world"]}
//! -> {"req":1}
//! <- {"req":1,"error":"missing field: languageTag"}
//! ```
//!
//! `req` is a client-assigned correlation id, unique per connection.
//! Responses come back in request order on each connection.
//!
//! # Example
//!
//! ```rust
//! use tokserve_protocol::{Response, decode_line, encode_line};
//! use tokserve_core::ProcessorOutput;
//!
//! let request = decode_line(br#"{"languageTag":"en","utterance":"hi","req":7}"#).unwrap();
//! assert_eq!(request.req, 7);
//!
//! let response = Response::success(request.req, ProcessorOutput::tokens(["hi"]));
//! assert_eq!(encode_line(&response), b"{\"req\":7,\"result\":[\"hi\"]}\n");
//! ```

mod codec;
mod error;
mod framing;
mod types;

pub use codec::{decode_line, encode_line};
pub use error::{DecodeError, DecodeErrorKind, ProtocolError, ProtocolResult};
pub use framing::{LineBuffer, is_blank};
pub use types::{Outcome, Request, Response};

/// Message delimiter.
pub const LINE_DELIMITER: u8 = b'\n';

/// Default maximum length of a single line, delimiter excluded (1 MiB).
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

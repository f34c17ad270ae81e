//! Incremental newline framing.
//!
//! Socket reads deliver arbitrary byte ranges: half a message, several
//! messages, or a message split across many reads. [`LineBuffer`]
//! accumulates those bytes and hands out complete lines as they appear:
//!
//! ```text
//! read 1: {"req":0,"langu        -> (nothing yet)
//! read 2: ageTag":...}\n{"req    -> line 0
//! read 3: ":1,...}\n             -> line 1
//! ```

use crate::error::{ProtocolError, ProtocolResult};
use crate::{LINE_DELIMITER, MAX_LINE_LENGTH};

/// Byte accumulator that splits on `\n`.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Start of the first unconsumed line.
    start: usize,
    /// Everything before this offset is known to contain no delimiter.
    scanned: usize,
    max_line_length: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    /// Creates an empty buffer with the default line limit.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Creates an empty buffer that rejects lines longer than `max` bytes.
    pub fn with_max_line_length(max: usize) -> Self {
        Self {
            buf: Vec::with_capacity(4096),
            start: 0,
            scanned: 0,
            max_line_length: max,
        }
    }

    /// Appends bytes read from the socket.
    pub fn extend(&mut self, data: &[u8]) {
        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
            self.scanned = 0;
        } else if self.start > self.buf.len() / 2 {
            self.buf.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buf.extend_from_slice(data);
    }

    /// Extracts the next complete line, without its delimiter.
    ///
    /// Returns `Ok(None)` when no complete line is buffered yet.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::LineTooLong`] when the pending line exceeds
    /// the limit, whether or not its delimiter has arrived.
    pub fn next_line(&mut self) -> ProtocolResult<Option<Vec<u8>>> {
        let from = self.scanned.max(self.start);
        match self.buf[from..].iter().position(|b| *b == LINE_DELIMITER) {
            Some(offset) => {
                let end = from + offset;
                self.check_length(end - self.start)?;
                let line = self.buf[self.start..end].to_vec();
                self.start = end + 1;
                self.scanned = self.start;
                Ok(Some(line))
            }
            None => {
                self.scanned = self.buf.len();
                self.check_length(self.pending())?;
                Ok(None)
            }
        }
    }

    /// Takes whatever follows the last delimiter, for use at end of stream.
    pub fn take_remainder(&mut self) -> Option<Vec<u8>> {
        if self.pending() == 0 {
            return None;
        }
        let rest = self.buf[self.start..].to_vec();
        self.buf.clear();
        self.start = 0;
        self.scanned = 0;
        Some(rest)
    }

    /// Number of buffered bytes not yet returned as lines.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Returns true if no bytes are waiting.
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    fn check_length(&self, size: usize) -> ProtocolResult<()> {
        if size > self.max_line_length {
            return Err(ProtocolError::LineTooLong {
                size,
                max: self.max_line_length,
            });
        }
        Ok(())
    }
}

/// Returns true for lines that hold only whitespace.
pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

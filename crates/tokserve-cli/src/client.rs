//! TCP line client.
//!
//! Sends one request per line and reads the matching response line, one
//! exchange at a time.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::debug;

use tokserve_protocol::{Request, Response};

use crate::error::{ClientError, ClientResult};

/// Client for the tokserve line protocol.
pub struct LineClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    timeout: Duration,
    next_req: i64,
}

impl LineClient {
    /// Connects to a server.
    pub async fn connect(address: &str, timeout: Duration) -> ClientResult<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| ClientError::Timeout(format!("connecting to {address}")))?
            .map_err(|e| ClientError::Connection(format!("failed to connect to {address}: {e}")))?;
        debug!(address, "Connected");

        let (read_half, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(read_half).lines(),
            writer,
            timeout,
            next_req: 0,
        })
    }

    /// Builds the next request, numbering from 0.
    pub fn next_request(&mut self, language_tag: &str, utterance: &str) -> Request {
        let request = Request::new(language_tag, utterance, self.next_req);
        self.next_req += 1;
        request
    }

    /// Writes one request line.
    pub async fn send(&mut self, request: &Request) -> ClientResult<()> {
        let mut line = serde_json::to_vec(request)
            .map_err(|e| ClientError::Protocol(format!("failed to encode request: {e}")))?;
        line.push(b'\n');

        tokio::time::timeout(self.timeout, self.writer.write_all(&line))
            .await
            .map_err(|_| ClientError::Timeout("sending request".into()))??;
        Ok(())
    }

    /// Reads one response line.
    pub async fn recv(&mut self) -> ClientResult<Response> {
        let line = tokio::time::timeout(self.timeout, self.lines.next_line())
            .await
            .map_err(|_| ClientError::Timeout("reading response".into()))??
            .ok_or_else(|| ClientError::Connection("server closed the connection".into()))?;

        serde_json::from_str(&line)
            .map_err(|e| ClientError::Protocol(format!("invalid response {line:?}: {e}")))
    }

    /// Sends a request and waits for its response.
    pub async fn exchange(&mut self, request: &Request) -> ClientResult<Response> {
        self.send(request).await?;
        let response = self.recv().await?;
        if response.req.is_some_and(|req| req != request.req) {
            return Err(ClientError::Protocol(format!(
                "response for req {:?} while waiting for {}",
                response.req, request.req
            )));
        }
        Ok(response)
    }
}

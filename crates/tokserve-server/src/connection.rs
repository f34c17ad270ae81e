//! Per-connection request handling.
//!
//! A connection reads newline-delimited requests, hands each one to the
//! processor on its own task, and writes responses back in the order the
//! requests arrived. A slow request holds back the responses queued behind
//! it but never the processing of those requests.
//!
//! At most `max_in_flight` requests are dispatched at once. Complete lines
//! beyond that stay buffered, and the socket is not read again until they
//! have all been dispatched. Reading stops for good on end of stream, on
//! shutdown, or after a framing error; the responses already queued are
//! still written before the socket closes.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::StreamExt;
use futures_util::stream::FuturesOrdered;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, trace, warn};

use tokserve_core::SharedProcessor;
use tokserve_protocol::{LineBuffer, Request, Response, decode_line, encode_line, is_blank};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::signals::ShutdownSignal;

const READ_CHUNK: usize = 8 * 1024;

/// Error text sent when a processing task panics or is cancelled.
pub const INTERNAL_FAILURE: &str = "internal processing failure";

type PendingResponse = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Counters reported when a connection closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionSummary {
    /// Non-blank lines read.
    pub requests: u64,
    /// Responses written.
    pub responses: u64,
}

/// A client connection.
pub struct Connection<S> {
    stream: S,
    processor: SharedProcessor,
    max_in_flight: usize,
    max_line_length: usize,
    permit: Option<OwnedSemaphorePermit>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wraps an accepted stream.
    pub fn new(stream: S, processor: SharedProcessor, config: &ServerConfig) -> Self {
        Self {
            stream,
            processor,
            max_in_flight: config.max_in_flight.max(1),
            max_line_length: config.max_line_length,
            permit: None,
        }
    }

    /// Holds a connection-limit permit until the connection closes.
    pub fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self.permit = Some(permit);
        self
    }

    /// Serves the connection until the peer is done or `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns the I/O error that ended the connection. Work still in
    /// flight at that point is cancelled.
    pub async fn run(self, mut shutdown: ShutdownSignal) -> ServerResult<ConnectionSummary> {
        let Connection {
            stream,
            processor,
            max_in_flight,
            max_line_length,
            permit,
        } = self;
        let _permit = permit;

        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut queue = RequestQueue::new(processor, max_in_flight, max_line_length);
        let mut chunk = vec![0u8; READ_CHUNK];
        let mut summary = ConnectionSummary::default();

        loop {
            queue.pump();
            if queue.is_done() {
                break;
            }

            tokio::select! {
                biased;

                _ = shutdown.recv(), if !queue.is_closed() => {
                    debug!(pending = queue.pending.len(), "Shutdown requested, draining connection");
                    queue.close();
                }
                Some(response) = queue.pending.next(), if !queue.pending.is_empty() => {
                    writer.write_all(&encode_line(&response)).await?;
                    summary.responses += 1;
                }
                read = reader.read(&mut chunk), if queue.wants_input() => {
                    match read? {
                        0 => {
                            trace!("Peer finished sending");
                            queue.end_of_input();
                        }
                        n => queue.lines.extend(&chunk[..n]),
                    }
                }
            }
        }

        summary.requests = queue.received;
        if let Err(e) = writer.shutdown().await {
            debug!(error = %e, "Failed to close write side");
        }
        Ok(summary)
    }
}

/// Where the connection is in reading its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    /// More bytes may arrive.
    Open,
    /// The peer half-closed; buffered lines are still to be dispatched.
    Ended,
    /// Nothing more will be dispatched.
    Closed,
}

/// Lines waiting to be framed plus the ordered queue of responses.
struct RequestQueue {
    lines: LineBuffer,
    pending: FuturesOrdered<PendingResponse>,
    processor: SharedProcessor,
    max_in_flight: usize,
    input: Input,
    received: u64,
}

impl RequestQueue {
    fn new(processor: SharedProcessor, max_in_flight: usize, max_line_length: usize) -> Self {
        Self {
            lines: LineBuffer::with_max_line_length(max_line_length),
            pending: FuturesOrdered::new(),
            processor,
            max_in_flight,
            input: Input::Open,
            received: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.pending.len() >= self.max_in_flight
    }

    fn is_closed(&self) -> bool {
        self.input == Input::Closed
    }

    /// True once every request has been dispatched and answered.
    fn is_done(&self) -> bool {
        self.is_closed() && self.pending.is_empty()
    }

    /// The socket is read only when nothing framed is left to dispatch.
    /// After [`pump`](Self::pump) that holds whenever the queue has room.
    fn wants_input(&self) -> bool {
        self.input == Input::Open && !self.is_full()
    }

    fn end_of_input(&mut self) {
        if self.input == Input::Open {
            self.input = Input::Ended;
        }
    }

    /// Stops dispatching. Lines still buffered are dropped unanswered.
    fn close(&mut self) {
        self.input = Input::Closed;
    }

    /// Dispatches buffered lines until the queue is full or the buffer
    /// holds no complete line.
    ///
    /// After end of input, an unterminated trailing line is dispatched
    /// once everything before it has been.
    fn pump(&mut self) {
        while !self.is_closed() && !self.is_full() {
            match self.lines.next_line() {
                Ok(Some(line)) => self.dispatch(&line),
                Ok(None) => {
                    if self.input == Input::Ended {
                        if let Some(rest) = self.lines.take_remainder() {
                            self.dispatch(&rest);
                        }
                        self.close();
                    }
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Closing connection after framing error");
                    self.pending.push_back(ready(Response::failure(None, e.to_string())));
                    self.close();
                }
            }
        }
    }

    fn dispatch(&mut self, line: &[u8]) {
        if is_blank(line) {
            return;
        }
        self.received += 1;

        match decode_line(line) {
            Ok(request) => {
                trace!(req = request.req, language = %request.language_tag, "Dispatching request");
                self.pending
                    .push_back(spawn_request(request, self.processor.clone()));
            }
            Err(e) => {
                debug!(req = ?e.req, error = %e, "Rejecting request");
                self.pending
                    .push_back(ready(Response::failure(e.req, e.to_string())));
            }
        }
    }
}

fn ready(response: Response) -> PendingResponse {
    Box::pin(std::future::ready(response))
}

/// Runs one request on its own task.
///
/// The returned future resolves to the response. Dropping it before then
/// cancels the task.
fn spawn_request(request: Request, processor: SharedProcessor) -> PendingResponse {
    let req = request.req;
    let task = AbortOnDrop(tokio::spawn(async move {
        processor
            .process(&request.language_tag, &request.utterance)
            .await
    }));

    Box::pin(async move {
        match task.await {
            Ok(Ok(output)) => Response::success(req, output),
            Ok(Err(e)) => {
                debug!(req, error = %e, "Processing failed");
                Response::failure(Some(req), e.to_string())
            }
            Err(e) => {
                warn!(req, error = %e, "Processing task failed");
                Response::failure(Some(req), INTERNAL_FAILURE)
            }
        }
    })
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

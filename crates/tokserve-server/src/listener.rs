//! TCP listener and accept loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};

use tokserve_core::SharedProcessor;

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use crate::signals::ShutdownHandle;

/// Pause after a failed `accept`, so a persistent error (such as running
/// out of file descriptors) does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A bound TCP listener.
pub struct Listener {
    config: ServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    /// `None` when connections are unlimited.
    connection_limit: Option<Arc<Semaphore>>,
}

impl Listener {
    /// Binds the configured listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(config: &ServerConfig) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.listen.as_str())
            .await
            .map_err(|e| ServerError::bind(&config.listen, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::bind(&config.listen, e))?;

        info!(address = %local_addr, "Listening");

        Ok(Self {
            config: config.clone(),
            listener,
            local_addr,
            connection_limit: config.max_connections.map(|n| Arc::new(Semaphore::new(n))),
        })
    }

    /// Returns the bound address, with the real port when `:0` was asked for.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until `shutdown` fires.
    ///
    /// Each connection is served on its own task in the returned set,
    /// which still holds the connections that were open at shutdown. The
    /// listening socket is closed on return.
    pub async fn serve(
        self,
        processor: SharedProcessor,
        shutdown: ShutdownHandle,
    ) -> JoinSet<()> {
        let mut connections = JoinSet::new();
        let mut stop = shutdown.wait();
        let mut next_id: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = stop.recv() => {
                    info!(open = connections.len(), "No longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        next_id += 1;
                        self.spawn_connection(&mut connections, next_id, stream, peer, &processor, &shutdown);
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished
                        && e.is_panic()
                    {
                        error!(error = %e, "Connection task panicked");
                    }
                }
            }
        }

        connections
    }

    fn spawn_connection(
        &self,
        connections: &mut JoinSet<()>,
        id: u64,
        stream: TcpStream,
        peer: SocketAddr,
        processor: &SharedProcessor,
        shutdown: &ShutdownHandle,
    ) {
        let permit = match &self.connection_limit {
            Some(limit) => match limit.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!(%peer, "Connection limit reached, refusing connection");
                    drop(stream);
                    return;
                }
            },
            None => None,
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(%peer, error = %e, "Failed to set TCP_NODELAY");
        }

        let mut connection = Connection::new(stream, processor.clone(), &self.config);
        if let Some(permit) = permit {
            connection = connection.with_permit(permit);
        }

        debug!(id, %peer, "Accepted connection");
        let signal = shutdown.wait();
        connections.spawn(
            async move {
                match connection.run(signal).await {
                    Ok(summary) => debug!(
                        requests = summary.requests,
                        responses = summary.responses,
                        "Connection closed"
                    ),
                    Err(e) => debug!(error = %e, "Connection ended with error"),
                }
            }
            .instrument(info_span!("connection", id, %peer)),
        );
    }
}

//! Server lifecycle.
//!
//! ```text
//! Stopped -> Starting -> Running -> Draining -> Stopped
//!               |
//!               +--(bind failure)--> Stopped
//! ```
//!
//! While draining the listener is closed, open connections stop reading
//! and flush what they owe. Connections still open when the grace period
//! runs out are aborted along with their in-flight work.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use tokserve_core::SharedProcessor;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::listener::Listener;
use crate::signals::ShutdownHandle;

/// Observable server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Draining,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Draining => "draining",
        };
        f.write_str(name)
    }
}

/// A server that has not been started yet.
pub struct Server {
    config: ServerConfig,
    processor: SharedProcessor,
    state: watch::Sender<ServerState>,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Creates a stopped server.
    pub fn new(config: ServerConfig, processor: SharedProcessor) -> Self {
        let (state, _) = watch::channel(ServerState::Stopped);
        Self {
            config,
            processor,
            state,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Builder: stop when `shutdown` is triggered, e.g. by a signal handler.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the current state.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Returns a handle that stops the server.
    ///
    /// Triggering it before [`start`](Self::start) is allowed: the server
    /// then drains as soon as it is running.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Binds the listener and starts accepting connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for an unusable configuration and
    /// [`ServerError::Bind`] if the address cannot be bound. The server is
    /// `Stopped` again in both cases.
    pub async fn start(self) -> ServerResult<RunningServer> {
        self.config.validate()?;
        self.state.send_replace(ServerState::Starting);
        info!(address = %self.config.listen, "Starting server");

        let listener = match Listener::bind(&self.config).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, "Server failed to start");
                self.state.send_replace(ServerState::Stopped);
                return Err(e);
            }
        };

        let local_addr = listener.local_addr();
        let state_rx = self.state.subscribe();
        self.state.send_replace(ServerState::Running);
        info!(address = %local_addr, "Server running");

        let task = tokio::spawn(serve(
            listener,
            self.processor,
            self.shutdown.clone(),
            self.state,
            self.config.grace_period,
        ));

        Ok(RunningServer {
            local_addr,
            state: state_rx,
            shutdown: self.shutdown,
            task,
        })
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("processor", &self.processor)
            .field("state", &self.state())
            .finish()
    }
}

async fn serve(
    listener: Listener,
    processor: SharedProcessor,
    shutdown: ShutdownHandle,
    state: watch::Sender<ServerState>,
    grace_period: Duration,
) {
    let connections = listener.serve(processor, shutdown).await;

    state.send_replace(ServerState::Draining);
    info!(
        connections = connections.len(),
        grace_ms = grace_period.as_millis() as u64,
        "Draining connections"
    );
    drain(connections, grace_period).await;

    state.send_replace(ServerState::Stopped);
    info!("Server stopped");
}

async fn drain(mut connections: JoinSet<()>, grace_period: Duration) {
    let finished = tokio::time::timeout(grace_period, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if finished.is_err() {
        warn!(
            remaining = connections.len(),
            "Grace period elapsed, closing remaining connections"
        );
        connections.shutdown().await;
    }
}

/// A started server.
pub struct RunningServer {
    local_addr: SocketAddr,
    state: watch::Receiver<ServerState>,
    shutdown: ShutdownHandle,
    task: JoinHandle<()>,
}

impl RunningServer {
    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the current state.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.clone()
    }

    /// Returns a handle that stops the server.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Waits until the server has stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Task`] if the serving task panicked.
    pub async fn wait(self) -> ServerResult<()> {
        self.task.await.map_err(|e| ServerError::Task {
            message: e.to_string(),
        })
    }

    /// Starts draining and waits until the server has stopped.
    pub async fn shutdown(self) -> ServerResult<()> {
        self.shutdown.trigger();
        self.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use tokio::net::TcpListener;
    use tokserve_analyzers::{LanguageRouter, TokenizerOptions};

    fn server(config: ServerConfig) -> Server {
        let processor: SharedProcessor =
            Arc::new(LanguageRouter::rule_based(["en"], TokenizerOptions::default()));
        Server::new(config, processor)
    }

    #[test]
    fn state_display() {
        assert_eq!(ServerState::Draining.to_string(), "draining");
    }

    #[tokio::test]
    async fn start_and_shutdown() {
        let server = server(ServerConfig::new("127.0.0.1:0"));
        assert_eq!(server.state(), ServerState::Stopped);

        let running = server.start().await.unwrap();
        assert_eq!(running.state(), ServerState::Running);
        assert_ne!(running.local_addr().port(), 0);

        let mut states = running.subscribe();
        running.shutdown().await.unwrap();
        assert_eq!(*states.borrow_and_update(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn bind_failure_returns_to_stopped() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = server(ServerConfig::new(taken.local_addr().unwrap().to_string()));
        let states = server.subscribe();

        let err = server.start().await.err().unwrap();
        assert!(err.is_bind());
        assert_eq!(*states.borrow(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_binding() {
        let server = server(ServerConfig::new("127.0.0.1:0").with_max_in_flight(0));
        let err = server.start().await.err().unwrap();
        assert!(matches!(err, ServerError::Config { .. }));
    }

    #[tokio::test]
    async fn shutdown_before_start_is_honoured() {
        let server = server(ServerConfig::new("127.0.0.1:0"));
        server.shutdown_handle().trigger();

        let running = server.start().await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), running.wait())
            .await
            .unwrap()
            .unwrap();
    }
}

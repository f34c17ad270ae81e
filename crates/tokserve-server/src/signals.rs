//! Shutdown coordination.
//!
//! SIGTERM and SIGINT (Ctrl+C elsewhere) trip a shared shutdown flag.
//! The same flag can be tripped programmatically through a
//! [`ShutdownHandle`], which is how tests and embedders stop a server.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

/// Listens for termination signals and trips the shutdown flag.
pub struct SignalHandler {
    shutdown: ShutdownHandle,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    /// Creates a signal handler with its own shutdown flag.
    pub fn new() -> Self {
        Self {
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Creates a signal handler that trips an existing flag.
    pub fn with_handle(shutdown: ShutdownHandle) -> Self {
        Self { shutdown }
    }

    /// Spawns the signal listener task.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let (mut sigterm, mut sigint) = match (
                signal(SignalKind::terminate()),
                signal(SignalKind::interrupt()),
            ) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!(error = %e, "Failed to install signal handlers");
                    return;
                }
            };

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
                _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
                _ = shutdown.wait().wait() => {}
            }
            shutdown.trigger();

            debug!("Signal listener stopped");
        });
    }

    /// Non-Unix implementation: Ctrl+C only.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received Ctrl+C, initiating shutdown");
                shutdown.trigger();
            }
        });
    }

    /// Returns true if shutdown has been signaled.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    /// Programmatically triggers a shutdown.
    pub fn trigger_shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Returns a handle to the shutdown flag.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }
}

/// A signal that completes when shutdown is triggered.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits until shutdown is triggered.
    ///
    /// Completes immediately if it already was, so it can be polled again
    /// from a `select!` loop.
    pub async fn recv(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Consumes the signal, waiting for shutdown.
    pub async fn wait(mut self) {
        self.recv().await;
    }

    /// Returns true if shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

/// A handle for triggering or checking shutdown status.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    /// Creates an untriggered handle.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Triggers a shutdown. Triggering twice is harmless.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true if shutdown has been triggered.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Returns a future-producing signal for shutdown.
    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.rx.clone(),
        }
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("triggered", &self.is_shutdown())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_handler_shutdown() {
        let handler = SignalHandler::new();
        assert!(!handler.is_shutdown());

        handler.trigger_shutdown();
        assert!(handler.is_shutdown());
    }

    #[tokio::test]
    async fn shutdown_signal_wait() {
        let handle = ShutdownHandle::new();
        let signal = handle.wait();

        let trigger = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger();
        });

        let result = tokio::time::timeout(Duration::from_millis(500), signal.wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn shutdown_handle_shared_with_handler() {
        let handle = ShutdownHandle::new();
        let handler = SignalHandler::with_handle(handle.clone());

        handle.trigger();
        assert!(handler.is_shutdown());
        assert!(handler.shutdown_handle().is_shutdown());
    }

    #[tokio::test]
    async fn recv_is_level_triggered() {
        let handle = ShutdownHandle::new();
        let mut signal = handle.wait();
        assert!(!signal.is_triggered());

        handle.trigger();
        handle.trigger();

        for _ in 0..3 {
            tokio::time::timeout(Duration::from_millis(100), signal.recv())
                .await
                .unwrap();
        }
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn signal_created_after_trigger_completes() {
        let handle = ShutdownHandle::new();
        handle.trigger();
        let result = tokio::time::timeout(Duration::from_millis(100), handle.wait().wait()).await;
        assert!(result.is_ok());
    }
}

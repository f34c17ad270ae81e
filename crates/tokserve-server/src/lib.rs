//! TCP server: listener, connection handling, lifecycle.
//!
//! This crate serves a [`Processor`](tokserve_core::Processor) over TCP:
//! - one task per connection, one task per request
//! - responses returned in request order on each connection
//! - a connection limit, refusing extra connections outright
//! - graceful shutdown with a bounded grace period
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokserve_analyzers::{LanguageRouter, TokenizerOptions};
//! use tokserve_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = Arc::new(LanguageRouter::rule_based(["en"], TokenizerOptions::default()));
//!     let running = Server::new(ServerConfig::default(), processor).start().await?;
//!     println!("listening on {}", running.local_addr());
//!     running.wait().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;
mod lifecycle;
mod listener;
mod signals;

pub use config::{DEFAULT_LISTEN, ServerConfig};
pub use connection::{Connection, ConnectionSummary, INTERNAL_FAILURE};
pub use error::{ServerError, ServerResult};
pub use lifecycle::{RunningServer, Server, ServerState};
pub use listener::Listener;
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};

//! CLI: server runner, line client, configuration
//!
//! This crate provides the `tokserve` command-line interface.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use client::LineClient;
pub use error::{ClientError, ClientResult};

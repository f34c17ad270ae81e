//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// tokserve - tokenize utterances over a line-delimited JSON protocol
#[derive(Debug, Parser)]
#[command(name = "tokserve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "TOKSERVE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the server in the foreground
    Serve(ServeArgs),

    /// Send stdin lines to a server, one request per line
    Tokenize(TokenizeArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for `tokserve serve`. Unset options fall back to the config file.
#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Address to listen on (host:port)
    #[arg(long, short)]
    pub listen: Option<String>,

    /// Maximum concurrent connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Seconds to let in-flight requests finish on shutdown
    #[arg(long)]
    pub grace_period: Option<u64>,

    /// Maximum pending responses per connection
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Lowercase all tokens
    #[arg(long)]
    pub lowercase: bool,

    /// Keep hyphenated words together
    #[arg(long)]
    pub no_split_hyphens: bool,
}

/// Options for `tokserve tokenize`.
#[derive(Debug, Default, Args)]
pub struct TokenizeArgs {
    /// Server address (host:port)
    #[arg(long, short)]
    pub address: Option<String>,

    /// Language tag sent with every utterance
    #[arg(long, short = 'L')]
    pub language: Option<String>,

    /// Connect and read timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration as TOML
    Dump,

    /// Show the configuration file path
    Path,
}

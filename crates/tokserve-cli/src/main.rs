//! tokserve CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use tokserve_cli::cli::{Cli, Command, ConfigAction};
use tokserve_cli::commands;
use tokserve_cli::config::Config;
use tokserve_cli::error::{ClientError, ClientResult};
use tokserve_core::{TracingConfig, TracingOutputFormat, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    init_tracing(tracing_config(&cli, &config)?)?;

    match cli.command {
        Command::Serve(ref args) => commands::serve::run(args, &config).await,
        Command::Tokenize(ref args) => commands::tokenize::run(args, &config).await,
        Command::Config { ref action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}

/// The server logs at the configured level; the other commands stay quiet
/// unless `--debug` is given.
fn tracing_config(cli: &Cli, config: &Config) -> ClientResult<TracingConfig> {
    let mut settings = match cli.command {
        Command::Serve(_) => TracingConfig::server()
            .with_level_name(&config.logging.level)?
            .with_format(parse_format(&config.logging.format)?),
        _ => TracingConfig::client(),
    };

    if let Some(ref format) = cli.log_format {
        settings = settings.with_format(parse_format(format)?);
    }
    if cli.debug {
        settings = settings.with_level(Level::DEBUG);
    }
    Ok(settings)
}

fn parse_format(name: &str) -> ClientResult<TracingOutputFormat> {
    name.parse::<TracingOutputFormat>().map_err(ClientError::from)
}

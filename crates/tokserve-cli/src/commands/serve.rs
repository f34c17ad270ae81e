//! Serve command: runs the server in the foreground until SIGTERM/SIGINT.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use tokserve_analyzers::LanguageRouter;
use tokserve_core::SharedProcessor;
use tokserve_server::{Server, ServerConfig, SignalHandler};

use crate::cli::ServeArgs;
use crate::config::{Config, TokenizerSettings};
use crate::error::{ClientError, ClientResult};

/// Starts the server and blocks until it has drained and stopped.
pub async fn run(args: &ServeArgs, config: &Config) -> ClientResult<()> {
    let (server_config, tokenizer) = resolve(args, config);
    if tokenizer.languages.is_empty() {
        return Err(ClientError::Config(
            "no languages configured; set [tokenizer] languages".into(),
        ));
    }

    let router = LanguageRouter::with_tokenizer(&tokenizer.languages, tokenizer.tokenizer()?);
    info!(
        languages = ?router.languages(),
        lowercase = tokenizer.lowercase,
        split_hyphens = tokenizer.split_hyphens,
        tag_entities = tokenizer.tags_entities(),
        "Tokenizer ready"
    );
    let processor: SharedProcessor = Arc::new(router);

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener();

    let running = Server::new(server_config, processor)
        .with_shutdown(signal_handler.shutdown_handle())
        .start()
        .await?;
    info!(address = %running.local_addr(), "Accepting connections");

    running.wait().await?;
    Ok(())
}

/// Applies command-line overrides on top of the file configuration.
fn resolve(args: &ServeArgs, config: &Config) -> (ServerConfig, TokenizerSettings) {
    let mut server = config.server.to_server_config();
    if let Some(ref listen) = args.listen {
        server.listen = listen.clone();
    }
    if let Some(max) = args.max_connections {
        server = server.with_max_connections(Some(max));
    }
    if let Some(secs) = args.grace_period {
        server = server.with_grace_period(Duration::from_secs(secs));
    }
    if let Some(max) = args.max_in_flight {
        server = server.with_max_in_flight(max);
    }

    let mut tokenizer = config.tokenizer.clone();
    if args.lowercase {
        tokenizer.lowercase = true;
    }
    if args.no_split_hyphens {
        tokenizer.split_hyphens = false;
    }

    (server, tokenizer)
}

//! Tokenize command: a line client for a running server.
//!
//! Each stdin line becomes one request. The request and the response are
//! both echoed to stdout, one JSON document per line.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::TokenizeArgs;
use crate::client::LineClient;
use crate::config::Config;
use crate::error::{ClientError, ClientResult};

/// Reads stdin until end of input, exchanging one request per line.
pub async fn run(args: &TokenizeArgs, config: &Config) -> ClientResult<()> {
    let address = args.address.as_deref().unwrap_or(&config.client.address);
    let language = args.language.as_deref().unwrap_or(&config.client.language);
    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.client.timeout_secs));

    let mut client = LineClient::connect(address, timeout).await?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = stdin.next_line().await? {
        let request = client.next_request(language, line.trim());
        let response = client.exchange(&request).await?;

        println!("{}", to_json(&request)?);
        println!("{}", to_json(&response)?);
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> ClientResult<String> {
    serde_json::to_string(value).map_err(|e| ClientError::Protocol(e.to_string()))
}

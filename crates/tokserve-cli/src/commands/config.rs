//! Configuration commands.

use crate::config::Config;
use crate::error::ClientResult;

/// Dump the effective configuration to stdout.
pub fn dump(config: &Config) -> ClientResult<()> {
    println!("# config.toml ({})", Config::default_path().display());
    println!("{}", config.to_toml()?);
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ClientResult<()> {
    println!("config: {}", Config::default_path().display());
    Ok(())
}

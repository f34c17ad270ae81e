//! Tracing setup shared by the server and the line client.
//!
//! ```ignore
//! use tokserve_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::server()).expect("failed to initialize tracing");
//! ```

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Crates whose events pass the default filter.
const LOG_TARGETS: &[&str] = &[
    "tokserve_core",
    "tokserve_protocol",
    "tokserve_analyzers",
    "tokserve_server",
    "tokserve_cli",
    "tokserve",
];

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),

    /// Unknown output format name
    #[error("unknown log format: {0} (expected pretty, compact or json)")]
    UnknownFormat(String),

    /// Unknown level name
    #[error("unknown log level: {0}")]
    UnknownLevel(String),
}

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Human-readable multi-line format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON lines, for log shippers
    Json,
}

impl FromStr for TracingOutputFormat {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TracingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// The default log level when RUST_LOG is not set
    pub default_level: Level,
    /// Output format for log messages
    pub output_format: TracingOutputFormat,
    /// Whether to include file/line information in logs
    pub include_location: bool,
    /// Whether to include target (module path) in logs
    pub include_target: bool,
    /// Whether to include timestamps
    pub include_timestamp: bool,
    /// Whether to include span events (enter/exit)
    pub include_span_events: bool,
    /// Custom env filter directive (overrides default_level if set)
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Pretty,
            include_location: false,
            include_target: true,
            include_timestamp: true,
            include_span_events: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Config for the interactive line client: quiet, compact, no timestamps.
    #[must_use]
    pub fn client() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            include_timestamp: false,
            include_span_events: false,
            env_filter: None,
        }
    }

    /// Config for the long-running server.
    #[must_use]
    pub fn server() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: true,
            include_timestamp: true,
            include_span_events: false,
            env_filter: None,
        }
    }

    /// Set the default log level
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set the default log level from its name (`trace` .. `error`).
    pub fn with_level_name(self, level: &str) -> Result<Self, TracingError> {
        let level =
            Level::from_str(level).map_err(|_| TracingError::UnknownLevel(level.to_string()))?;
        Ok(self.with_level(level))
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set a custom env filter directive
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn default_directive(&self) -> String {
        LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={}", self.default_level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initialize tracing with the given configuration.
///
/// Must be called at most once per process. `RUST_LOG` overrides the
/// configured level unless an explicit filter was set.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set or if
/// the env filter directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = if let Some(ref filter) = config.env_filter {
        EnvFilter::try_new(filter)?
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.default_directive()))
    };

    let span_events = if config.include_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match config.output_format {
        TracingOutputFormat::Pretty => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_target(config.include_target)
                    .with_span_events(span_events),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
        TracingOutputFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target)
                .with_span_events(span_events);

            let layer = if config.include_timestamp {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            };

            let subscriber = tracing_subscriber::registry().with(env_filter).with(layer);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        TracingOutputFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_target(config.include_target)
                    .with_span_events(span_events),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_defaults() {
        let config = TracingConfig::server();
        assert_eq!(config.default_level, Level::INFO);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(config.include_timestamp);
        assert!(config.env_filter.is_none());
    }

    #[test]
    fn client_config_is_quiet() {
        let config = TracingConfig::client();
        assert_eq!(config.default_level, Level::WARN);
        assert!(!config.include_timestamp);
    }

    #[test]
    fn format_from_str() {
        assert_eq!(
            "JSON".parse::<TracingOutputFormat>().unwrap(),
            TracingOutputFormat::Json
        );
        assert_eq!(
            "pretty".parse::<TracingOutputFormat>().unwrap(),
            TracingOutputFormat::Pretty
        );
        assert!(matches!(
            "xml".parse::<TracingOutputFormat>(),
            Err(TracingError::UnknownFormat(_))
        ));
    }

    #[test]
    fn level_by_name() {
        let config = TracingConfig::default().with_level_name("debug").unwrap();
        assert_eq!(config.default_level, Level::DEBUG);

        let err = TracingConfig::default().with_level_name("loud").unwrap_err();
        assert!(matches!(err, TracingError::UnknownLevel(_)));
    }

    #[test]
    fn default_directive_covers_all_crates() {
        let directive = TracingConfig::default()
            .with_level(Level::WARN)
            .default_directive();
        assert!(directive.contains("tokserve_server=WARN"));
        assert!(directive.contains("tokserve_protocol=WARN"));
    }

    #[test]
    fn builder_methods() {
        let config = TracingConfig::default()
            .with_format(TracingOutputFormat::Json)
            .with_env_filter("tokserve_server=trace");

        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.env_filter, Some("tokserve_server=trace".to_string()));
    }
}

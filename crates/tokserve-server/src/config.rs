//! Server configuration.

use std::time::Duration;

use tokserve_protocol::MAX_LINE_LENGTH;

use crate::error::{ServerError, ServerResult};

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8888";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, `host:port`.
    pub listen: String,

    /// Maximum concurrent connections; `None` for unlimited.
    pub max_connections: Option<usize>,

    /// Time allowed for in-flight requests to finish on shutdown.
    pub grace_period: Duration,

    /// Maximum responses pending per connection before reading pauses.
    pub max_in_flight: usize,

    /// Maximum length of one request line.
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            max_connections: Some(1024),
            grace_period: Duration::from_secs(5),
            max_in_flight: 128,
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration with the given listen address.
    pub fn new(listen: impl Into<String>) -> Self {
        Self {
            listen: listen.into(),
            ..Default::default()
        }
    }

    /// Builder: set max connections (`None` for unlimited).
    pub fn with_max_connections(mut self, max: Option<usize>) -> Self {
        self.max_connections = max;
        self
    }

    /// Builder: set the shutdown grace period.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Builder: set the per-connection in-flight limit.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Builder: set the maximum line length.
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Checks that every limit is usable.
    pub fn validate(&self) -> ServerResult<()> {
        if self.listen.trim().is_empty() {
            return Err(ServerError::config("listen address must not be empty"));
        }
        if self.max_connections == Some(0) {
            return Err(ServerError::config("max_connections must be at least 1"));
        }
        if self.max_in_flight == 0 {
            return Err(ServerError::config("max_in_flight must be at least 1"));
        }
        if self.max_line_length == 0 {
            return Err(ServerError::config("max_line_length must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.listen, "127.0.0.1:8888");
        assert_eq!(config.max_connections, Some(1024));
        assert_eq!(config.grace_period, Duration::from_secs(5));
        assert_eq!(config.max_in_flight, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_config() {
        let config = ServerConfig::new("0.0.0.0:9000")
            .with_max_connections(None)
            .with_grace_period(Duration::from_millis(250))
            .with_max_in_flight(4)
            .with_max_line_length(512);

        assert_eq!(config.listen, "0.0.0.0:9000");
        assert_eq!(config.max_connections, None);
        assert_eq!(config.grace_period, Duration::from_millis(250));
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.max_line_length, 512);
    }

    #[test]
    fn rejects_zero_limits() {
        let err = ServerConfig::default()
            .with_max_connections(Some(0))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("max_connections"));

        assert!(ServerConfig::default().with_max_in_flight(0).validate().is_err());
        assert!(ServerConfig::default().with_max_line_length(0).validate().is_err());
        assert!(ServerConfig::new(" ").validate().is_err());
    }
}

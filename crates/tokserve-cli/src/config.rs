//! Configuration file.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/tokserve/config.toml` by default. Every section and key is
//! optional; command-line flags override what the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tokserve_analyzers::{DEFAULT_LANGUAGES, EntityTagger, RuleTokenizer, TokenizerOptions};
use tokserve_protocol::MAX_LINE_LENGTH;
use tokserve_server::{DEFAULT_LISTEN, ServerConfig};

use crate::error::{ClientError, ClientResult};

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerSettings,

    /// Tokenizer settings.
    pub tokenizer: TokenizerSettings,

    /// Logging settings.
    pub logging: LoggingSettings,

    /// Line client settings.
    pub client: ClientSettings,
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: String,
    /// `0` for unlimited.
    pub max_connections: usize,
    pub grace_period_secs: u64,
    pub max_in_flight: usize,
    pub max_line_length: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            max_connections: 1024,
            grace_period_secs: 5,
            max_in_flight: 128,
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}

impl ServerSettings {
    /// Builds the server configuration these settings describe.
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::new(&self.listen)
            .with_max_connections((self.max_connections > 0).then_some(self.max_connections))
            .with_grace_period(Duration::from_secs(self.grace_period_secs))
            .with_max_in_flight(self.max_in_flight)
            .with_max_line_length(self.max_line_length)
    }
}

/// `[tokenizer]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerSettings {
    pub lowercase: bool,
    pub split_hyphens: bool,
    /// Language tags served by the rule tokenizer.
    pub languages: Vec<String>,
    /// Attach entity tags to the output even without recognizers.
    pub tag_entities: bool,
    /// Tag four-digit years as `NUMBER` instead of `DATE`.
    pub years_as_numbers: bool,
    /// Built-in recognizers: `phone`, `email`, `url`.
    pub entity_recognizers: Vec<String>,
    /// `TAG:regex` patterns matched against whole tokens.
    pub regular_expressions: Vec<String>,
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        let options = TokenizerOptions::default();
        Self {
            lowercase: options.lowercase,
            split_hyphens: options.split_hyphens,
            languages: DEFAULT_LANGUAGES.iter().map(|tag| tag.to_string()).collect(),
            tag_entities: false,
            years_as_numbers: false,
            entity_recognizers: Vec::new(),
            regular_expressions: Vec::new(),
        }
    }
}

impl TokenizerSettings {
    pub fn options(&self) -> TokenizerOptions {
        TokenizerOptions {
            split_hyphens: self.split_hyphens,
            lowercase: self.lowercase,
        }
    }

    /// True when the output carries entity tags.
    pub fn tags_entities(&self) -> bool {
        self.tag_entities
            || !self.entity_recognizers.is_empty()
            || !self.regular_expressions.is_empty()
    }

    /// Builds the tokenizer these settings describe.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for an unknown recognizer name or a
    /// malformed `TAG:regex` pattern.
    pub fn tokenizer(&self) -> ClientResult<RuleTokenizer> {
        let tokenizer = RuleTokenizer::new(self.options());
        if !self.tags_entities() {
            return Ok(tokenizer);
        }

        let tagger = EntityTagger::from_config(
            &self.entity_recognizers,
            &self.regular_expressions,
            self.years_as_numbers,
        )
        .map_err(|e| ClientError::Config(format!("[tokenizer] {e}")))?;
        Ok(tokenizer.with_tagger(tagger))
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// `[client]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub address: String,
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_LISTEN.to_string(),
            language: "en".to_string(),
            timeout_secs: 5,
        }
    }
}

impl Config {
    /// Loads configuration from the default path, or defaults if the file
    /// does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| ClientError::Config(format!("{} in {}", e, path.display())))
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("failed to parse config: {e}"))
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> ClientResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ClientError::Config(format!("failed to serialize config: {e}")))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tokserve")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.listen, "127.0.0.1:8888");
        assert_eq!(config.client.timeout_secs, 5);
        assert_eq!(config.tokenizer.languages, ["en", "de", "es", "fr", "it"]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
[server]
listen = "0.0.0.0:9999"
grace_period_secs = 1

[tokenizer]
lowercase = true
languages = ["en"]
"#,
        )
        .unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:9999");
        assert_eq!(config.server.max_in_flight, 128);
        assert!(config.tokenizer.lowercase);
        assert!(config.tokenizer.split_hyphens);
        assert_eq!(config.tokenizer.languages, ["en"]);
        assert_eq!(config.logging, LoggingSettings::default());

        let server = config.server.to_server_config();
        assert_eq!(server.grace_period, Duration::from_secs(1));
        assert_eq!(server.max_connections, Some(1024));
    }

    #[test]
    fn zero_max_connections_means_unlimited() {
        let config = Config::parse("[server]\nmax_connections = 0").unwrap();
        assert_eq!(config.server.to_server_config().max_connections, None);
    }

    #[test]
    fn entity_patterns_build_a_tagging_tokenizer() {
        let config = Config::parse(
            r#"
[tokenizer]
entity_recognizers = ["email"]
regular_expressions = ["USERNAME:[@](.+)", "HASHTAG:[#](.+)"]
years_as_numbers = true
"#,
        )
        .unwrap();
        assert!(config.tokenizer.tags_entities());

        let tagged = config
            .tokenizer
            .tokenizer()
            .unwrap()
            .analyze("@ann wrote to a@b.org in 2020")
            .unwrap();
        assert_eq!(
            tagged.ner_tags,
            ["USERNAME", "O", "O", "EMAIL_ADDRESS", "O", "NUMBER"]
        );
    }

    #[test]
    fn default_tokenizer_does_not_tag() {
        let tokenizer = TokenizerSettings::default().tokenizer().unwrap();
        assert_eq!(tokenizer.analyze("hi"), None);
    }

    #[test]
    fn malformed_entity_pattern_is_a_config_error() {
        let config = Config::parse(r#"[tokenizer]
regular_expressions = ["USERNAME[@](.+)"]"#).unwrap();
        let err = config.tokenizer.tokenizer().unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
        assert!(err.to_string().contains("TAG:regex"), "{err}");

        let config = Config::parse(r#"[tokenizer]
entity_recognizers = ["fax"]"#).unwrap();
        assert!(matches!(
            config.tokenizer.tokenizer().unwrap_err(),
            ClientError::Config(_)
        ));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let err = Config::parse("[server\nlisten = 1").unwrap_err();
        assert!(err.starts_with("failed to parse config"));

        let err = Config::parse("[server]\nlisten = 1").unwrap_err();
        assert!(err.contains("listen"), "{err}");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\naddress = \"10.0.0.1:8888\"\nlanguage = \"de\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.client.address, "10.0.0.1:8888");
        assert_eq!(config.client.language, "de");
    }

    #[test]
    fn load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn dump_round_trips() {
        let mut config = Config::default();
        config.server.max_connections = 0;
        config.logging.format = "json".into();

        let text = config.to_toml().unwrap();
        assert!(text.contains("max_connections = 0"));
        assert_eq!(Config::parse(&text).unwrap(), config);
    }

    #[test]
    fn default_path_ends_with_config_toml() {
        let path = Config::default_path();
        assert!(path.ends_with("tokserve/config.toml"));
    }
}

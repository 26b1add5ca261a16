pub mod validation;

use serde::{Deserialize, Serialize};

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Streaming pipeline settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Cap on buffered partial-line bytes in the SSE framer. `None` = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_buffer_bytes: Option<usize>,
    #[serde(default)]
    pub include_raw_chunks: bool,
}

/// HTTP client settings for the transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Honour `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY`.
    #[serde(default = "default_use_env_proxy")]
    pub use_env_proxy: bool,
}

fn default_timeout_secs() -> u64 {
    180
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_use_env_proxy() -> bool {
    true
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            use_env_proxy: default_use_env_proxy(),
        }
    }
}

/// Feature flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level SDK configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Parse and validate a YAML config document.
///
/// # Errors
///
/// Returns [`ConfigError`] when the YAML is malformed or fails validation.
pub fn parse_config(contents: &str) -> Result<SdkConfig, ConfigError> {
    let config: SdkConfig = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load, parse, and validate the YAML config at `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, is malformed, or
/// fails validation.
pub fn load_config(path: &str) -> Result<SdkConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config, SdkConfig::default());
        assert_eq!(config.features.log_level, "INFO");
        assert_eq!(config.http.timeout_secs, 180);
        assert_eq!(config.http.connect_timeout_secs, 5);
        assert!(config.http.use_env_proxy);
        assert!(config.stream.max_buffer_bytes.is_none());
        assert!(!config.stream.include_raw_chunks);
    }

    #[test]
    fn test_full_document() {
        let yaml = "\
features:
  log_level: DEBUG
stream:
  max_buffer_bytes: 65536
  include_raw_chunks: true
http:
  timeout_secs: 30
  connect_timeout_secs: 2
  use_env_proxy: false
";
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.features.log_level, "DEBUG");
        assert_eq!(config.stream.max_buffer_bytes, Some(65536));
        assert!(config.stream.include_raw_chunks);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.connect_timeout_secs, 2);
        assert!(!config.http.use_env_proxy);
    }

    #[test]
    fn test_malformed_yaml_is_rejected() {
        let err = parse_config("stream: [not, a, map]").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config("/nonexistent/omnillm.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

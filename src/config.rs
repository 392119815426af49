use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Search engine connection
    pub engine: EngineConfig,

    /// Index naming
    #[serde(default)]
    pub indexes: IndexesConfig,

    /// Startup corpus
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: SEARCH_AB)
            .add_source(
                config::Environment::with_prefix("SEARCH_AB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            indexes: IndexesConfig::default(),
            corpus: CorpusConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine backend type
    #[serde(default)]
    pub backend: EngineBackend,

    /// Base URL of the engine (meilisearch backend)
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Per-request timeout (seconds)
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,

    /// Interval between task status polls (milliseconds)
    #[serde(default = "default_task_poll_interval")]
    pub task_poll_interval_ms: u64,

    /// Give up waiting on an engine task after this many seconds
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    /// Abort startup when the engine is unreachable while applying settings
    #[serde(default = "default_true")]
    pub fail_fast: bool,
}

impl EngineConfig {
    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: EngineBackend::default(),
            url: default_engine_url(),
            api_key_env: Some("MEILI_MASTER_KEY".to_string()),
            timeout_secs: default_engine_timeout(),
            task_poll_interval_ms: default_task_poll_interval(),
            task_timeout_secs: default_task_timeout(),
            fail_fast: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EngineBackend {
    #[default]
    Meilisearch,
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexesConfig {
    /// Index uid prefix; each configuration lands in `{prefix}_{name}`
    #[serde(default = "default_index_prefix")]
    pub prefix: String,

    /// Primary key of the corpus documents
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

impl Default for IndexesConfig {
    fn default() -> Self {
        Self {
            prefix: default_index_prefix(),
            primary_key: default_primary_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// JSON file holding an array of documents
    pub path: Option<PathBuf>,

    /// Documents per addDocuments call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: None,
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_engine_url() -> String {
    "http://127.0.0.1:7700".to_string()
}

fn default_engine_timeout() -> u64 {
    10
}

fn default_task_poll_interval() -> u64 {
    100
}

fn default_task_timeout() -> u64 {
    60
}

fn default_index_prefix() -> String {
    "general_index".to_string()
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_http_port(), 8000);
        assert_eq!(default_index_prefix(), "general_index");
        assert_eq!(default_log_level(), "info");
        assert!(default_true());
    }

    #[test]
    fn test_engine_backend() {
        assert_eq!(EngineBackend::default(), EngineBackend::Meilisearch);
    }

    #[test]
    fn test_embedded_defaults_deserialize() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.http_port, 8000);
        assert_eq!(config.engine.backend, EngineBackend::Meilisearch);
        assert_eq!(config.indexes.prefix, "general_index");
        assert_eq!(config.corpus.batch_size, 1000);
        assert!(config.engine.fail_fast);
    }

    #[test]
    fn test_observability_section_ignores_retired_keys() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::from_str(
                "[observability]\nservice_name = \"legacy\"\njson_logs = true\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.observability.json_logs);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.observability.prometheus_enabled);
    }

    #[test]
    fn test_api_key_missing_env_is_none() {
        let engine = EngineConfig {
            api_key_env: Some("SEARCH_AB_TEST_UNSET_KEY_VAR".to_string()),
            ..Default::default()
        };
        assert_eq!(engine.api_key(), None);
    }
}

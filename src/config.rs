//! Service configuration
//!
//! Loaded from an optional TOML file, overridden by `MLB_METRICS__*`
//! environment variables (e.g. `MLB_METRICS__SERVER__PORT=8080`).

use crate::error::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// MLB Stats API base URL
    #[serde(default = "default_stats_api_url")]
    pub stats_api_url: String,
    /// Baseball Savant base URL (Statcast search)
    #[serde(default = "default_savant_url")]
    pub savant_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Held-out fraction for evaluation
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed shared by the splitter and every classifier
    #[serde(default)]
    pub seed: u64,
    /// Upper bound on a single training request; unbounded when unset
    #[serde(default)]
    pub train_timeout_secs: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_stats_api_url() -> String {
    "https://statsapi.mlb.com".to_string()
}

fn default_savant_url() -> String {
    "https://baseballsavant.mlb.com".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_test_fraction() -> f64 {
    0.1
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            stats_api_url: default_stats_api_url(),
            savant_url: default_savant_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            seed: 0,
            train_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from `path` (may be absent) and the environment
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("MLB_METRICS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        tracing::debug!(
            "Loaded config: server={}:{}, stats_api={}, savant={}",
            config.server.host,
            config.server.port,
            config.providers.stats_api_url,
            config.providers.savant_url
        );
        Ok(config)
    }
}

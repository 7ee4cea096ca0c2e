use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::resolver::ResolverConfig;

const LOCAL_CONFIG_PATH: &str = "dnsbatch.toml";

/// Main configuration structure for dnsbatch
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. dnsbatch.toml in current directory
    /// 3. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new(LOCAL_CONFIG_PATH).exists() {
            Self::from_file(LOCAL_CONFIG_PATH)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if !overrides.servers.is_empty() {
            self.resolver.servers = overrides.servers;
        }
        if !overrides.record_types.is_empty() {
            self.resolver.record_types = overrides.record_types;
        }
        if let Some(workers) = overrides.workers {
            self.resolver.workers = workers;
        }
        if let Some(rate) = overrides.rate_limit {
            self.resolver.rate_limit = rate;
        }
        if let Some(timeout) = overrides.query_timeout_secs {
            self.resolver.query_timeout_secs = timeout;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolver.validate()
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub servers: Vec<IpAddr>,
    pub record_types: Vec<String>,
    pub workers: Option<usize>,
    pub rate_limit: Option<u32>,
    pub query_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

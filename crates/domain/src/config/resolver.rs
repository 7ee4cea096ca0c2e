use crate::RecordType;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use super::errors::ConfigError;

/// Upstream servers, pacing and worker settings for batch resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Upstream resolvers, as IP literals.
    #[serde(default = "default_servers")]
    pub servers: Vec<IpAddr>,

    /// Number of concurrent workers executing task steps.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Queries per second allowed against each individual server.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Record types requested for every name unless overridden.
    #[serde(default = "default_record_types")]
    pub record_types: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            workers: default_workers(),
            rate_limit: default_rate_limit(),
            query_timeout_secs: default_query_timeout_secs(),
            port: default_port(),
            record_types: default_record_types(),
        }
    }
}

impl ResolverConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn parsed_record_types(&self) -> Result<Vec<RecordType>, ConfigError> {
        RecordType::parse_list(&self.record_types)
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::Validation(
                "No upstream servers configured".to_string(),
            ));
        }
        if self.rate_limit == 0 {
            return Err(ConfigError::Validation(
                "rate_limit must be greater than zero".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::Validation(
                "workers must be greater than zero".to_string(),
            ));
        }
        if self.query_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "query_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.record_types.is_empty() {
            return Err(ConfigError::Validation(
                "At least one record type must be requested".to_string(),
            ));
        }
        self.parsed_record_types()?;
        Ok(())
    }
}

fn default_servers() -> Vec<IpAddr> {
    vec![
        IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
        IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
    ]
}

fn default_workers() -> usize {
    10
}

fn default_rate_limit() -> u32 {
    10
}

fn default_query_timeout_secs() -> u64 {
    3
}

fn default_port() -> u16 {
    53
}

fn default_record_types() -> Vec<String> {
    vec!["A".to_string()]
}

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Empty domain name")]
    EmptyName,

    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Unsupported record type: {0}")]
    UnsupportedRecordType(String),

    #[error("At least one record type must be requested")]
    EmptyRecordTypes,

    #[error("Rate limit must be greater than zero, got {0}")]
    InvalidRateLimit(u32),

    #[error("At least one upstream server must be configured")]
    NoServers,

    #[error("Query timeout")]
    QueryTimeout,

    #[error("Transport timeout talking to {server}")]
    TransportTimeout { server: String },

    #[error("Transport connection refused by {server}")]
    TransportConnectionRefused { server: String },

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DomainError {
    /// Transient dispatch failures; the step that hit one is attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::QueryTimeout
                | DomainError::TransportTimeout { .. }
                | DomainError::TransportConnectionRefused { .. }
                | DomainError::InvalidDnsResponse(_)
                | DomainError::IoError(_)
        )
    }
}

pub mod tcp;
pub mod udp;

use async_trait::async_trait;
use dnsbatch_domain::DomainError;
use std::time::Duration;

#[derive(Debug)]
pub struct TransportResponse {
    pub bytes: Vec<u8>,

    pub protocol_used: &'static str,
}

#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError>;

    fn protocol_name(&self) -> &'static str;
}

pub(crate) fn io_error(
    server: std::net::SocketAddr,
    action: &str,
    e: std::io::Error,
) -> DomainError {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => DomainError::TransportConnectionRefused {
            server: server.to_string(),
        },
        _ => DomainError::IoError(format!("Failed to {} {}: {}", action, server, e)),
    }
}

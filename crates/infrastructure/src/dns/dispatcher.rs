//! One query, one server, one record type.

use crate::dns::forwarding::{MessageBuilder, ResponseParser};
use crate::dns::transport::{tcp::TcpTransport, udp::UdpTransport, DnsTransport};
use async_trait::async_trait;
use dnsbatch_domain::{DomainError, RecordType};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::debug;

pub const DNS_PORT: u16 = 53;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Performs a single exchange with an upstream server and returns the
/// normalized answers for the requested type.
///
/// Implementations hold no per-query state and are called concurrently.
#[async_trait]
pub trait QueryDispatcher: Send + Sync + 'static {
    async fn dispatch(
        &self,
        server: IpAddr,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<String>, DomainError>;

    /// Same as [`dispatch`](Self::dispatch) with the record type given as a
    /// tag. Unknown tags fail before anything is sent.
    async fn dispatch_tag(
        &self,
        server: IpAddr,
        name: &str,
        tag: &str,
    ) -> Result<Vec<String>, DomainError> {
        let record_type = tag.parse::<RecordType>()?;
        self.dispatch(server, name, record_type).await
    }
}

/// Appends the root separator when missing.
pub fn to_fqdn(name: &str) -> Result<String, DomainError> {
    if name.is_empty() {
        return Err(DomainError::EmptyName);
    }
    if name.ends_with('.') {
        Ok(name.to_string())
    } else {
        Ok(format!("{}.", name))
    }
}

/// Queries upstream servers over UDP, falling back to TCP when the answer
/// does not fit in a datagram.
#[derive(Debug, Clone)]
pub struct UpstreamDispatcher {
    port: u16,
    timeout: Duration,
}

impl Default for UpstreamDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamDispatcher {
    pub fn new() -> Self {
        Self {
            port: DNS_PORT,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn endpoint(&self, server: IpAddr) -> SocketAddr {
        SocketAddr::new(server, self.port)
    }
}

#[async_trait]
impl QueryDispatcher for UpstreamDispatcher {
    async fn dispatch(
        &self,
        server: IpAddr,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<String>, DomainError> {
        let fqdn = to_fqdn(name)?;
        let (id, query_bytes) = MessageBuilder::build_query(&fqdn, record_type)?;
        let endpoint = self.endpoint(server);

        let mut raw = UdpTransport::new(endpoint)
            .send(&query_bytes, self.timeout)
            .await?;
        let mut response = ResponseParser::parse(&raw.bytes)?;

        if response.truncated {
            debug!(server = %endpoint, name = %fqdn, "Truncated UDP answer, retrying over TCP");
            raw = TcpTransport::new(endpoint)
                .send(&query_bytes, self.timeout)
                .await?;
            response = ResponseParser::parse(&raw.bytes)?;
        }

        if response.id != id {
            return Err(DomainError::InvalidDnsResponse(format!(
                "Response id {} does not match query id {} from {}",
                response.id, id, endpoint
            )));
        }

        let answers = response.answers(record_type);

        debug!(
            server = %endpoint,
            name = %fqdn,
            qtype = %record_type,
            rcode = ResponseParser::rcode_to_status(response.rcode),
            protocol = raw.protocol_used,
            answers = answers.len(),
            "Query dispatched"
        );

        Ok(answers)
    }
}

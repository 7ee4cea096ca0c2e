//! UDP Transport for DNS queries (RFC 1035 §4.2.1)
//!
//! Messages are sent as-is (no framing). If the response has the TC
//! (truncated) bit set, the caller should retry via TCP.

use super::{io_error, DnsTransport, TransportResponse};
use async_trait::async_trait;
use dnsbatch_domain::DomainError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub struct UdpTransport {
    server_addr: SocketAddr,
}

impl UdpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    fn bind_addr(&self) -> SocketAddr {
        let ip = if self.server_addr.is_ipv4() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        };
        SocketAddr::new(ip, 0)
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        let server = self.server_addr;
        let timed_out = || DomainError::TransportTimeout {
            server: server.to_string(),
        };

        let socket = UdpSocket::bind(self.bind_addr())
            .await
            .map_err(|e| io_error(server, "bind UDP socket for", e))?;

        let exchange = async {
            socket
                .send_to(message_bytes, server)
                .await
                .map_err(|e| io_error(server, "send UDP query to", e))?;

            let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
            loop {
                let (bytes_received, from_addr) = socket
                    .recv_from(&mut recv_buf)
                    .await
                    .map_err(|e| io_error(server, "receive UDP response from", e))?;

                if from_addr != server {
                    warn!(
                        expected = %server,
                        received_from = %from_addr,
                        "UDP response from unexpected source, ignoring"
                    );
                    continue;
                }

                recv_buf.truncate(bytes_received);
                return Ok::<_, DomainError>(recv_buf);
            }
        };

        let bytes = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| timed_out())??;

        debug!(server = %server, bytes_received = bytes.len(), "UDP response received");

        Ok(TransportResponse {
            bytes,
            protocol_used: "UDP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}

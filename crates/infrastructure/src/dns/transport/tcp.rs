//! TCP Transport for DNS queries (RFC 1035 §4.2.2)
//!
//! Each message is prefixed with its length as a 2-byte big-endian integer.
//! Used when a UDP answer comes back truncated.

use super::{io_error, DnsTransport, TransportResponse};
use async_trait::async_trait;
use dnsbatch_domain::DomainError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

pub struct TcpTransport {
    server_addr: SocketAddr,
}

impl TcpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        let server = self.server_addr;

        let exchange = async {
            let mut stream = TcpStream::connect(server)
                .await
                .map_err(|e| io_error(server, "connect to TCP server", e))?;
            stream
                .set_nodelay(true)
                .map_err(|e| io_error(server, "set TCP_NODELAY on", e))?;

            send_with_length_prefix(&mut stream, message_bytes)
                .await
                .map_err(|e| io_error(server, "send TCP query to", e))?;

            debug!(server = %server, message_len = message_bytes.len(), "TCP query sent");

            read_with_length_prefix(&mut stream)
                .await
                .map_err(|e| io_error(server, "read TCP response from", e))
        };

        let bytes = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| DomainError::TransportTimeout {
                server: server.to_string(),
            })??;

        debug!(server = %server, bytes_received = bytes.len(), "TCP response received");

        Ok(TransportResponse {
            bytes,
            protocol_used: "TCP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TCP"
    }
}

async fn send_with_length_prefix<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message_bytes: &[u8],
) -> std::io::Result<()> {
    let len = u16::try_from(message_bytes.len()).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "DNS message too large")
    })?;

    let mut framed = Vec::with_capacity(2 + message_bytes.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(message_bytes);
    writer.write_all(&framed).await?;
    writer.flush().await
}

async fn read_with_length_prefix<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    reader.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;

    let mut response = vec![0u8; len];
    reader.read_exact(&mut response).await?;
    Ok(response)
}

#![allow(dead_code)]
use hickory_proto::op::{Message, MessageType, OpCode};
use hickory_proto::rr::{Name, RData, Record};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;

/// Authoritative-looking upstream on loopback answering from a fixed record
/// list over UDP and TCP on the same port.
pub struct MockDnsServer {
    addr: SocketAddr,
    udp_queries: Arc<AtomicUsize>,
    tcp_queries: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

#[derive(Default)]
pub struct MockDnsServerBuilder {
    records: Vec<Record>,
    truncate_udp: bool,
    wrong_id: bool,
    rotate: bool,
    replies: AtomicUsize,
}

impl MockDnsServerBuilder {
    pub fn record(mut self, name: &str, rdata: RData) -> Self {
        let name = Name::from_str(name).unwrap();
        self.records.push(Record::from_rdata(name, 300, rdata));
        self
    }

    /// UDP replies carry the TC bit and no answers.
    pub fn truncate_udp(mut self) -> Self {
        self.truncate_udp = true;
        self
    }

    /// Replies use an id different from the query's.
    pub fn wrong_id(mut self) -> Self {
        self.wrong_id = true;
        self
    }

    /// Each reply starts its answers one record further along, the way a
    /// round-robin server would.
    pub fn rotate_answers(mut self) -> Self {
        self.rotate = true;
        self
    }

    pub async fn start(self) -> MockDnsServer {
        let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = udp.local_addr().unwrap();
        let tcp = TcpListener::bind(addr).await.unwrap();

        let zone = Arc::new(self);
        let udp_queries = Arc::new(AtomicUsize::new(0));
        let tcp_queries = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        tokio::spawn(serve_udp(
            udp,
            Arc::clone(&zone),
            Arc::clone(&udp_queries),
            shutdown.clone(),
        ));
        tokio::spawn(serve_tcp(
            tcp,
            zone,
            Arc::clone(&tcp_queries),
            shutdown.clone(),
        ));

        MockDnsServer {
            addr,
            udp_queries,
            tcp_queries,
            shutdown,
        }
    }

    fn respond(&self, query: &[u8], over_udp: bool) -> Option<Vec<u8>> {
        let request = Message::from_vec(query).ok()?;
        let id = if self.wrong_id {
            request.id().wrapping_add(1)
        } else {
            request.id()
        };

        let mut response = Message::new(id, MessageType::Response, OpCode::Query);
        response.set_recursion_desired(true);
        response.set_recursion_available(true);

        let turn = self.replies.fetch_add(1, Ordering::SeqCst);
        for query in request.queries() {
            response.add_query(query.clone());
            if over_udp && self.truncate_udp {
                response.set_truncated(true);
                continue;
            }
            let mut answers: Vec<Record> = self
                .records
                .iter()
                .filter(|r| r.name() == query.name() && r.record_type() == query.query_type())
                .cloned()
                .collect();
            if self.rotate && !answers.is_empty() {
                let shift = turn % answers.len();
                answers.rotate_left(shift);
            }
            for record in answers {
                response.add_answer(record);
            }
        }

        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);
        response.emit(&mut encoder).ok()?;
        Some(buf)
    }
}

impl MockDnsServer {
    pub fn builder() -> MockDnsServerBuilder {
        MockDnsServerBuilder::default()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn udp_queries(&self) -> usize {
        self.udp_queries.load(Ordering::SeqCst)
    }

    pub fn tcp_queries(&self) -> usize {
        self.tcp_queries.load(Ordering::SeqCst)
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn serve_udp(
    socket: UdpSocket,
    zone: Arc<MockDnsServerBuilder>,
    counter: Arc<AtomicUsize>,
    shutdown: CancellationToken,
) {
    let mut buf = vec![0u8; 512];
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = socket.recv_from(&mut buf) => {
                let Ok((len, peer)) = result else { continue };
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(reply) = zone.respond(&buf[..len], true) {
                    let _ = socket.send_to(&reply, peer).await;
                }
            }
        }
    }
}

async fn serve_tcp(
    listener: TcpListener,
    zone: Arc<MockDnsServerBuilder>,
    counter: Arc<AtomicUsize>,
    shutdown: CancellationToken,
) {
    loop {
        let (mut stream, _) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(_) => continue,
            },
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let zone = Arc::clone(&zone);
        tokio::spawn(async move {
            let mut len = [0u8; 2];
            if stream.read_exact(&mut len).await.is_err() {
                return;
            }
            let mut query = vec![0u8; u16::from_be_bytes(len) as usize];
            if stream.read_exact(&mut query).await.is_err() {
                return;
            }
            if let Some(reply) = zone.respond(&query, false) {
                let mut framed = (reply.len() as u16).to_be_bytes().to_vec();
                framed.extend_from_slice(&reply);
                let _ = stream.write_all(&framed).await;
            }
        });
    }
}

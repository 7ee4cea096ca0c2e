use crate::dns::dispatcher::QueryDispatcher;
use dnsbatch_domain::{DomainError, RecordType};
use std::net::IpAddr;
use tokio::time::Instant;

/// One upstream resolver and its usage counters.
///
/// Only the holder of the [`ServerLease`](super::ServerLease) can reach a
/// `Server` mutably, so its counters are never updated concurrently.
#[derive(Debug)]
pub struct Server {
    addr: IpAddr,
    queries: u64,
    created_at: Instant,
    last_dispatch: Option<Instant>,
}

impl Server {
    pub(crate) fn new(addr: IpAddr) -> Self {
        Self {
            addr,
            queries: 0,
            created_at: Instant::now(),
            last_dispatch: None,
        }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Dispatches started against this server so far.
    pub fn queries(&self) -> u64 {
        self.queries
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_dispatch(&self) -> Option<Instant> {
        self.last_dispatch
    }

    /// Average queries per second since the server was created.
    pub fn rate(&self) -> f64 {
        let elapsed = self.created_at.elapsed().as_secs_f64();
        if elapsed <= f64::EPSILON {
            return 0.0;
        }
        self.queries as f64 / elapsed
    }

    pub(crate) fn record_dispatch(&mut self) {
        self.queries += 1;
        self.last_dispatch = Some(Instant::now());
    }

    /// Sends one query through `dispatcher`, stamping the dispatch time first
    /// so that pacing is measured between dispatch starts.
    pub async fn query<D>(
        &mut self,
        dispatcher: &D,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<String>, DomainError>
    where
        D: QueryDispatcher + ?Sized,
    {
        self.record_dispatch();
        dispatcher.dispatch(self.addr, name, record_type).await
    }
}

use super::server::Server;
use dnsbatch_domain::DomainError;
use std::net::IpAddr;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Fixed set of upstream servers handed out one at a time and re-admitted
/// after a per-server pacing delay.
///
/// The availability buffer is a bounded channel sized to the server count,
/// so a re-admission can never block. Pacing delays run on detached timer
/// tasks and never occupy the worker that released the server.
#[derive(Clone)]
pub struct ServerPool {
    inner: Arc<PoolInner>,
}

/// Where every server of a pool is at one instant.
///
/// `available + delayed + checked_out` always equals the pool size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub available: usize,
    pub delayed: usize,
    pub checked_out: usize,
}

impl PoolSnapshot {
    pub fn total(&self) -> usize {
        self.available + self.delayed + self.checked_out
    }
}

struct PoolInner {
    ready_tx: mpsc::Sender<Server>,
    ready_rx: AsyncMutex<mpsc::Receiver<Server>>,
    size: usize,
    rate_limit: u32,
    interval: Duration,
    counts: Mutex<PoolSnapshot>,
    shutdown: CancellationToken,
}

impl ServerPool {
    /// Builds a pool over `servers`, allowing at most `rate_limit` queries per
    /// second against each of them.
    pub fn new(servers: &[IpAddr], rate_limit: u32) -> Result<Self, DomainError> {
        if servers.is_empty() {
            return Err(DomainError::NoServers);
        }
        if rate_limit == 0 {
            return Err(DomainError::InvalidRateLimit(rate_limit));
        }

        let (ready_tx, ready_rx) = mpsc::channel(servers.len());
        for addr in servers {
            if ready_tx.try_send(Server::new(*addr)).is_err() {
                return Err(DomainError::ConfigError(format!(
                    "server pool buffer rejected {addr}"
                )));
            }
        }

        let interval = Duration::from_secs_f64(1.0 / f64::from(rate_limit));

        info!(
            servers = servers.len(),
            rate_limit,
            interval_ms = interval.as_millis() as u64,
            "Server pool initialized"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                ready_tx,
                ready_rx: AsyncMutex::new(ready_rx),
                size: servers.len(),
                rate_limit,
                interval,
                counts: Mutex::new(PoolSnapshot {
                    available: servers.len(),
                    delayed: 0,
                    checked_out: 0,
                }),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Waits until a server is available and checks it out.
    ///
    /// The server goes back to the pool when the returned lease is dropped.
    pub async fn take(&self) -> ServerLease {
        let server = {
            let mut ready = self.inner.ready_rx.lock().await;
            match ready.recv().await {
                Some(server) => server,
                // The pool owns a sender for as long as the receiver exists.
                None => unreachable!("server pool channel closed while pool alive"),
            }
        };
        self.inner.update(|counts| {
            counts.available -= 1;
            counts.checked_out += 1;
        });

        ServerLease {
            server: Some(server),
            pool: Arc::clone(&self.inner),
        }
    }

    /// Returns a lease to the pool. Equivalent to dropping it.
    pub fn release(&self, lease: ServerLease) {
        drop(lease);
    }

    /// Re-admits every delayed server immediately. Taking and releasing keep
    /// working afterwards, without pacing.
    pub fn close(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();
        info!(
            delayed = self.delayed(),
            checked_out = self.checked_out(),
            "Server pool closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Total number of servers owned by the pool.
    pub fn len(&self) -> usize {
        self.inner.size
    }

    pub fn is_empty(&self) -> bool {
        self.inner.size == 0
    }

    /// Consistent view of where every server is.
    ///
    /// The counters move in single steps, so the three figures always add up
    /// to [`len`](Self::len). Reading them through the individual getters
    /// below takes one snapshot per call and may mix instants.
    pub fn snapshot(&self) -> PoolSnapshot {
        *self.inner.lock_counts()
    }

    /// Servers ready to be taken.
    pub fn available(&self) -> usize {
        self.snapshot().available
    }

    /// Servers released but still inside their pacing delay.
    pub fn delayed(&self) -> usize {
        self.snapshot().delayed
    }

    pub fn checked_out(&self) -> usize {
        self.snapshot().checked_out
    }

    pub fn rate_limit(&self) -> u32 {
        self.inner.rate_limit
    }

    /// Minimum spacing between two dispatches to the same server.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl PoolInner {
    fn lock_counts(&self) -> std::sync::MutexGuard<'_, PoolSnapshot> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, change: impl FnOnce(&mut PoolSnapshot)) {
        change(&mut self.lock_counts());
    }

    fn pacing_delay(&self, server: &Server) -> Duration {
        match server.last_dispatch() {
            Some(at) => self.interval.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    fn release(self: &Arc<Self>, server: Server) {
        let delay = self.pacing_delay(&server);
        let runtime = Handle::try_current().ok();

        let runtime = match runtime {
            Some(runtime) if !delay.is_zero() && !self.shutdown.is_cancelled() => runtime,
            _ => {
                self.update(|counts| {
                    counts.checked_out -= 1;
                    counts.available += 1;
                });
                self.readmit(server);
                return;
            }
        };

        self.update(|counts| {
            counts.checked_out -= 1;
            counts.delayed += 1;
        });

        debug!(
            server = %server.addr(),
            delay_ms = delay.as_millis() as u64,
            "Delaying server re-admission"
        );

        let pool = Arc::clone(self);
        runtime.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = pool.shutdown.cancelled() => {}
            }
            pool.update(|counts| {
                counts.delayed -= 1;
                counts.available += 1;
            });
            pool.readmit(server);
        });
    }

    /// Puts a server back into the buffer. The counters must already list it
    /// as available.
    fn readmit(&self, server: Server) {
        let addr = server.addr();
        if let Err(e) = self.ready_tx.try_send(server) {
            error!(server = %addr, error = %e, "Failed to re-admit server to pool");
        }
    }
}

/// Exclusive, temporary ownership of one [`Server`].
///
/// Dropping the lease hands the server back to its pool, paced by the time
/// since its last dispatch.
pub struct ServerLease {
    server: Option<Server>,
    pool: Arc<PoolInner>,
}

impl Deref for ServerLease {
    type Target = Server;

    fn deref(&self) -> &Server {
        match self.server.as_ref() {
            Some(server) => server,
            None => unreachable!("server lease used after release"),
        }
    }
}

impl DerefMut for ServerLease {
    fn deref_mut(&mut self) -> &mut Server {
        match self.server.as_mut() {
            Some(server) => server,
            None => unreachable!("server lease used after release"),
        }
    }
}

impl Drop for ServerLease {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            self.pool.release(server);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn addrs(n: u8) -> Vec<IpAddr> {
        (1..=n).map(|i| IpAddr::from([10, 0, 0, i])).collect()
    }

    #[test]
    fn test_new_rejects_empty_server_list() {
        assert!(matches!(ServerPool::new(&[], 10), Err(DomainError::NoServers)));
    }

    #[test]
    fn test_new_rejects_zero_rate_limit() {
        assert!(matches!(
            ServerPool::new(&addrs(1), 0),
            Err(DomainError::InvalidRateLimit(0))
        ));
    }

    #[test]
    fn test_interval_is_inverse_of_rate() {
        let pool = ServerPool::new(&addrs(2), 4).unwrap();
        assert_eq!(pool.interval(), Duration::from_millis(250));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.rate_limit(), 4);
    }

    #[tokio::test]
    async fn test_unused_server_is_readmitted_immediately() {
        let pool = ServerPool::new(&addrs(1), 1).unwrap();
        let lease = pool.take().await;
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.checked_out(), 1);

        pool.release(lease);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.checked_out(), 0);
        assert_eq!(pool.delayed(), 0);
    }

    #[tokio::test]
    async fn test_dispatched_server_is_paced() {
        let pool = ServerPool::new(&addrs(1), 5).unwrap();

        let start = Instant::now();
        let mut lease = pool.take().await;
        lease.record_dispatch();
        drop(lease);
        assert_eq!(
            pool.snapshot(),
            PoolSnapshot { available: 0, delayed: 1, checked_out: 0 }
        );

        let lease = pool.take().await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(190), "waited {waited:?}");
        assert_eq!(lease.queries(), 1);
        assert_eq!(pool.delayed(), 0);
    }

    #[tokio::test]
    async fn test_close_readmits_delayed_servers() {
        let pool = ServerPool::new(&addrs(1), 1).unwrap();
        let mut lease = pool.take().await;
        lease.record_dispatch();
        drop(lease);
        assert_eq!(pool.delayed(), 1);

        pool.close();
        let taken = tokio::time::timeout(Duration::from_millis(200), pool.take()).await;
        assert!(taken.is_ok());
        assert!(pool.is_closed());
    }
}

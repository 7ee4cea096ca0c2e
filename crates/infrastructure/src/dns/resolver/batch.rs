use super::{prepare_task, ResolveError, ResolveHandler, ResolverGroup};
use crate::dns::dispatcher::{QueryDispatcher, UpstreamDispatcher};
use crate::dns::pool::ServerPool;
use dnsbatch_domain::{DomainError, RecordType, Resolution, ResolverConfig};
use dnsbatch_jobs::{JobQueue, QueueError};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

/// Accepted submissions allowed per worker before `add` waits.
const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// Resolves batches of names against a rate-limited set of upstream servers.
///
/// `M` is caller metadata carried untouched from submission to result.
pub struct Resolver<D, M = ()>
where
    D: QueryDispatcher,
    M: Send + 'static,
{
    queue: JobQueue<ResolveHandler<D, M>>,
    pool: ServerPool,
}

impl<M: Send + 'static> Resolver<UpstreamDispatcher, M> {
    /// Builds a resolver querying real upstream servers as configured.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, DomainError> {
        config
            .validate()
            .map_err(|e| DomainError::ConfigError(e.to_string()))?;

        let dispatcher = UpstreamDispatcher::new()
            .with_port(config.port)
            .with_timeout(config.query_timeout());

        Self::new(dispatcher, &config.servers, config.workers, config.rate_limit)
    }
}

impl<D, M> Resolver<D, M>
where
    D: QueryDispatcher,
    M: Send + 'static,
{
    pub fn new(
        dispatcher: D,
        servers: &[IpAddr],
        workers: usize,
        rate_limit: u32,
    ) -> Result<Self, DomainError> {
        if workers == 0 {
            return Err(DomainError::ConfigError(
                "workers must be greater than zero".to_string(),
            ));
        }

        let pool = ServerPool::new(servers, rate_limit)?;
        let handler = ResolveHandler::new(Arc::new(dispatcher), pool.clone());
        let queue = JobQueue::new(handler, workers, workers * QUEUE_DEPTH_PER_WORKER);

        info!(
            servers = servers.len(),
            workers,
            rate_limit,
            "Resolver created"
        );

        Ok(Self { queue, pool })
    }

    /// Spawns the workers. Idempotent.
    pub fn start(&self) {
        self.queue.start();
    }

    /// Submits `name` for resolution of `record_types`, in that order.
    ///
    /// Waits while the queue is full. Fails on invalid input or once the
    /// resolver is closed.
    pub async fn add(
        &self,
        name: &str,
        record_types: &[RecordType],
        meta: M,
    ) -> Result<(), ResolveError> {
        let task = prepare_task(name, record_types, meta)?;
        self.queue.add(task).await?;
        Ok(())
    }

    /// Like [`add`](Self::add) with record types given as tags.
    pub async fn add_str<S: AsRef<str>>(
        &self,
        name: &str,
        tags: &[S],
        meta: M,
    ) -> Result<(), ResolveError> {
        let record_types = RecordType::parse_list(tags)?;
        self.add(name, &record_types, meta).await
    }

    /// Next finished resolution, in completion order.
    ///
    /// `None` once the resolver is closed and its stream is drained. A
    /// `QueueError::Shutdown` item reports a name abandoned by `close`.
    pub async fn next(&self) -> Option<Result<Resolution<M>, QueueError>> {
        self.queue.next().await
    }

    /// Waits until every name submitted through `add` has been delivered.
    pub async fn wait(&self) {
        self.queue.wait().await
    }

    /// Creates an independently awaitable group on the same workers and pool.
    pub fn group(&self) -> ResolverGroup<M> {
        ResolverGroup::new(self.queue.group())
    }

    /// Stops accepting names, lets in-flight queries finish and returns every
    /// server to the pool.
    pub async fn close(&self) {
        self.queue.handler().shutdown();
        self.queue.close().await;
        self.pool.close();
        info!(
            available = self.pool.available(),
            servers = self.pool.len(),
            "Resolver closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn speed(&self) -> f64 {
        self.queue.speed()
    }

    pub fn progress(&self) -> f64 {
        self.queue.progress()
    }

    pub fn dispatcher(&self) -> &D {
        self.queue.handler().dispatcher()
    }

    pub fn pool(&self) -> &ServerPool {
        &self.pool
    }

    pub fn workers(&self) -> usize {
        self.queue.workers()
    }
}

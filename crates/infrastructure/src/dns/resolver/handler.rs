use crate::dns::dispatcher::QueryDispatcher;
use crate::dns::pool::ServerPool;
use async_trait::async_trait;
use dnsbatch_domain::{Advance, Resolution, ResolutionTask};
use dnsbatch_jobs::{JobHandler, Step};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Consecutive failures on one record type between two warnings.
const FAILURE_WARN_INTERVAL: u32 = 10;

/// Runs one resolution step: takes a server, resolves the task's current
/// record type and either finishes the task or hands it back for the next
/// type. Failed attempts are retried without a cap.
pub struct ResolveHandler<D, M> {
    dispatcher: Arc<D>,
    pool: ServerPool,
    shutdown: CancellationToken,
    _meta: PhantomData<fn() -> M>,
}

impl<D: QueryDispatcher, M> ResolveHandler<D, M> {
    pub fn new(dispatcher: Arc<D>, pool: ServerPool) -> Self {
        Self {
            dispatcher,
            pool,
            shutdown: CancellationToken::new(),
            _meta: PhantomData,
        }
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn pool(&self) -> &ServerPool {
        &self.pool
    }

    /// Stops steps that have not yet checked out a server from doing so.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl<D, M> JobHandler for ResolveHandler<D, M>
where
    D: QueryDispatcher,
    M: Send + 'static,
{
    type Job = ResolutionTask<M>;
    type Output = Resolution<M>;

    async fn handle(&self, mut task: Self::Job) -> Step<Self::Job, Self::Output> {
        let name = task.name().to_string();
        let record_type = task.current();

        let mut lease = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Step::Retry(task),
            lease = self.pool.take() => lease,
        };
        let server = lease.addr();
        let result = lease.query(self.dispatcher.as_ref(), &name, record_type).await;
        drop(lease);

        match result {
            Ok(answers) => {
                debug!(
                    domain = %name,
                    record_type = %record_type,
                    server = %server,
                    answers = answers.len(),
                    "Record type resolved"
                );
                match task.record_answer(answers) {
                    Advance::Done(resolution) => Step::Done(resolution),
                    Advance::Pending(task) => Step::Retry(task),
                }
            }
            Err(e) => {
                let failures = task.record_failure();
                if failures % FAILURE_WARN_INTERVAL == 0 {
                    warn!(
                        domain = %name,
                        record_type = %record_type,
                        server = %server,
                        failures,
                        error = %e,
                        "Resolution keeps failing, retrying"
                    );
                } else {
                    debug!(
                        domain = %name,
                        record_type = %record_type,
                        server = %server,
                        failures,
                        error = %e,
                        "Resolution attempt failed, retrying"
                    );
                }
                Step::Retry(task)
            }
        }
    }
}

use crate::group::GroupStats;
use crate::QueueError;
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit};

pub(crate) type ResultSender<R> = mpsc::UnboundedSender<Result<R, QueueError>>;

pub(crate) struct WorkItem<J, R> {
    pub(crate) job: J,
    pub(crate) ticket: Ticket<R>,
}

/// Travels with a job through every retry and settles it exactly once.
///
/// Dropping an unsettled ticket reports the job as abandoned to its group.
pub(crate) struct Ticket<R> {
    results: ResultSender<R>,
    stats: Arc<GroupStats>,
    settled: bool,
    _permit: OwnedSemaphorePermit,
}

impl<R> Ticket<R> {
    pub(crate) fn new(
        results: ResultSender<R>,
        stats: Arc<GroupStats>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        stats.on_submit();
        Self {
            results,
            stats,
            settled: false,
            _permit: permit,
        }
    }

    pub(crate) fn deliver(mut self, output: R) {
        self.settled = true;
        self.stats.on_complete();
        let _ = self.results.send(Ok(output));
    }

    /// Undoes a submission that never reached the inbox.
    pub(crate) fn withdraw(mut self) {
        self.settled = true;
        self.stats.on_withdraw();
    }
}

impl<R> Drop for Ticket<R> {
    fn drop(&mut self) {
        if !self.settled {
            self.stats.on_abandon();
            let _ = self.results.send(Err(QueueError::Shutdown));
        }
        self.stats.on_settled();
    }
}

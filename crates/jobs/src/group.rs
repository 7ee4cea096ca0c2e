use crate::ticket::{ResultSender, Ticket, WorkItem};
use crate::QueueError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Instant;
use tokio::sync::{mpsc, Notify, Semaphore};
use tokio_util::sync::CancellationToken;

/// Shared entry point into the worker inbox.
pub(crate) struct Submitter<J, R> {
    pub(crate) inbox: mpsc::UnboundedSender<WorkItem<J, R>>,
    pub(crate) capacity: Arc<Semaphore>,
    pub(crate) shutdown: CancellationToken,
}

#[derive(Debug)]
pub(crate) struct GroupStats {
    started: Instant,
    submitted: AtomicUsize,
    completed: AtomicUsize,
    abandoned: AtomicUsize,
    pending: AtomicUsize,
    idle: Notify,
}

impl GroupStats {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            submitted: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            abandoned: AtomicUsize::new(0),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    pub(crate) fn on_submit(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn on_withdraw(&self) {
        self.submitted.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn on_complete(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_abandon(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_settled(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

pub(crate) struct GroupInner<J, R> {
    submitter: Arc<Submitter<J, R>>,
    results_tx: Mutex<Option<ResultSender<R>>>,
    results_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<R, QueueError>>>,
    stats: Arc<GroupStats>,
}

/// A set of submissions that can be awaited and drained independently while
/// sharing the queue's workers.
pub struct JobGroup<J, R> {
    inner: Arc<GroupInner<J, R>>,
}

impl<J, R> Clone for JobGroup<J, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<J: Send + 'static, R: Send + 'static> JobGroup<J, R> {
    pub(crate) fn new(submitter: Arc<Submitter<J, R>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(GroupInner {
                submitter,
                results_tx: Mutex::new(Some(tx)),
                results_rx: tokio::sync::Mutex::new(rx),
                stats: Arc::new(GroupStats::new()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<GroupInner<J, R>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<GroupInner<J, R>>) -> Self {
        Self { inner }
    }

    /// Submits a job. Waits while the queue is at capacity.
    pub async fn add(&self, job: J) -> Result<(), QueueError> {
        let results = self
            .inner
            .results_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(QueueError::Closed)?;

        let submitter = &self.inner.submitter;
        let permit = tokio::select! {
            biased;
            _ = submitter.shutdown.cancelled() => return Err(QueueError::Closed),
            permit = Arc::clone(&submitter.capacity).acquire_owned() => {
                permit.map_err(|_| QueueError::Closed)?
            }
        };

        let ticket = Ticket::new(results, Arc::clone(&self.inner.stats), permit);
        submitter
            .inbox
            .send(WorkItem { job, ticket })
            .map_err(|rejected| {
                rejected.0.ticket.withdraw();
                QueueError::Closed
            })
    }

    /// Next finished output, in completion order.
    ///
    /// Returns `None` once the group is closed and every job it accepted has
    /// been settled.
    pub async fn next(&self) -> Option<Result<R, QueueError>> {
        self.inner.results_rx.lock().await.recv().await
    }

    /// Blocks until every accepted job has been settled.
    pub async fn wait(&self) {
        self.inner.stats.wait_idle().await
    }

    /// Stops accepting jobs. Outputs of jobs already accepted are still
    /// delivered before the result stream ends.
    pub fn close(&self) {
        self.inner
            .results_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .results_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn submitted(&self) -> usize {
        self.inner.stats.submitted.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> usize {
        self.inner.stats.completed.load(Ordering::Relaxed)
    }

    pub fn abandoned(&self) -> usize {
        self.inner.stats.abandoned.load(Ordering::Relaxed)
    }

    /// Jobs accepted but not settled yet.
    pub fn pending(&self) -> usize {
        self.inner.stats.pending.load(Ordering::Acquire)
    }

    /// Completed jobs per second since the group was created.
    pub fn speed(&self) -> f64 {
        let elapsed = self.inner.stats.started.elapsed().as_secs_f64();
        if elapsed <= f64::EPSILON {
            return 0.0;
        }
        self.completed() as f64 / elapsed
    }

    /// Completed share of submitted jobs, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let submitted = self.submitted();
        if submitted == 0 {
            return 1.0;
        }
        self.completed() as f64 / submitted as f64
    }
}

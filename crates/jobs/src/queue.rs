use crate::group::{GroupInner, JobGroup, Submitter};
use crate::handler::{JobHandler, Step};
use crate::ticket::WorkItem;
use crate::QueueError;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type Inbox<J, R> = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<WorkItem<J, R>>>>;

/// Fixed-size worker pool over a shared inbox.
///
/// `capacity` bounds how many jobs may be accepted and not yet settled at the
/// same time across all groups; retried jobs keep their slot. The queue itself
/// acts as a default [`JobGroup`], and [`JobQueue::group`] creates more.
pub struct JobQueue<H: JobHandler> {
    handler: Arc<H>,
    workers: usize,
    submitter: Arc<Submitter<H::Job, H::Output>>,
    inbox: Inbox<H::Job, H::Output>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    groups: Mutex<Vec<Weak<GroupInner<H::Job, H::Output>>>>,
    default_group: JobGroup<H::Job, H::Output>,
}

impl<H: JobHandler> JobQueue<H> {
    pub fn new(handler: H, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let submitter = Arc::new(Submitter {
            inbox: tx,
            capacity: Arc::new(Semaphore::new(capacity.max(1))),
            shutdown: CancellationToken::new(),
        });
        let default_group = JobGroup::new(Arc::clone(&submitter));

        Self {
            handler: Arc::new(handler),
            workers: workers.max(1),
            submitter,
            inbox: Arc::new(tokio::sync::Mutex::new(rx)),
            handles: Mutex::new(Vec::new()),
            groups: Mutex::new(Vec::new()),
            default_group,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawns the workers. Calling it again, or after `close`, does nothing.
    pub fn start(&self) {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        if !handles.is_empty() || self.submitter.shutdown.is_cancelled() {
            return;
        }

        for id in 0..self.workers {
            handles.push(tokio::spawn(run_worker(
                id,
                Arc::clone(&self.handler),
                Arc::clone(&self.inbox),
                self.submitter.inbox.clone(),
                self.submitter.shutdown.clone(),
            )));
        }

        info!(workers = self.workers, "Job queue started");
    }

    pub fn is_closed(&self) -> bool {
        self.submitter.shutdown.is_cancelled()
    }

    /// Creates a group sharing this queue's workers.
    pub fn group(&self) -> JobGroup<H::Job, H::Output> {
        let group = JobGroup::new(Arc::clone(&self.submitter));
        if self.is_closed() {
            group.close();
            return group;
        }

        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        groups.retain(|g| g.strong_count() > 0);
        groups.push(group.downgrade());
        group
    }

    pub fn default_group(&self) -> &JobGroup<H::Job, H::Output> {
        &self.default_group
    }

    pub async fn add(&self, job: H::Job) -> Result<(), QueueError> {
        self.default_group.add(job).await
    }

    pub async fn next(&self) -> Option<Result<H::Output, QueueError>> {
        self.default_group.next().await
    }

    pub async fn wait(&self) {
        self.default_group.wait().await
    }

    pub fn speed(&self) -> f64 {
        self.default_group.speed()
    }

    pub fn progress(&self) -> f64 {
        self.default_group.progress()
    }

    /// Stops the workers after their current step, abandons queued jobs and
    /// ends every group's result stream.
    pub async fn close(&self) {
        self.submitter.shutdown.cancel();
        self.submitter.capacity.close();

        let handles = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker terminated abnormally");
            }
        }

        let mut abandoned = 0usize;
        {
            let mut inbox = self.inbox.lock().await;
            inbox.close();
            while let Ok(item) = inbox.try_recv() {
                drop(item);
                abandoned += 1;
            }
        }

        self.default_group.close();
        let groups = std::mem::take(
            &mut *self.groups.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for group in groups.iter().filter_map(Weak::upgrade) {
            JobGroup::from_inner(group).close();
        }

        info!(abandoned, "Job queue closed");
    }
}

impl<H: JobHandler> Drop for JobQueue<H> {
    // Without `close`, workers stop where they are and the jobs they held are
    // reported as abandoned.
    fn drop(&mut self) {
        self.submitter.shutdown.cancel();
        self.submitter.capacity.close();

        let handles = std::mem::take(
            self.handles.get_mut().unwrap_or_else(PoisonError::into_inner),
        );
        if !handles.is_empty() {
            debug!(
                workers = handles.len(),
                "Job queue dropped without close, aborting workers"
            );
        }
        for handle in handles {
            handle.abort();
        }
    }
}

async fn run_worker<H: JobHandler>(
    id: usize,
    handler: Arc<H>,
    inbox: Inbox<H::Job, H::Output>,
    requeue: mpsc::UnboundedSender<WorkItem<H::Job, H::Output>>,
    shutdown: CancellationToken,
) {
    debug!(worker = id, "Worker started");

    loop {
        let item = {
            let mut inbox = inbox.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                item = inbox.recv() => item,
            }
        };

        let Some(WorkItem { job, ticket }) = item else {
            break;
        };

        match handler.handle(job).await {
            Step::Done(output) => ticket.deliver(output),
            Step::Retry(job) => {
                // Fails only once the inbox is closed; the ticket then reports
                // the job as abandoned.
                let _ = requeue.send(WorkItem { job, ticket });
            }
        }
    }

    debug!(worker = id, "Worker stopped");
}

use async_trait::async_trait;

/// What a handler did with a job.
#[derive(Debug)]
pub enum Step<J, R> {
    /// The job is finished; `R` is delivered to its group.
    Done(R),
    /// The job needs another pass and goes back into the queue.
    Retry(J),
}

#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    type Job: Send + 'static;
    type Output: Send + 'static;

    async fn handle(&self, job: Self::Job) -> Step<Self::Job, Self::Output>;
}

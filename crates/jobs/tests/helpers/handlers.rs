#![allow(dead_code)]
use async_trait::async_trait;
use dnsbatch_jobs::{JobHandler, Step};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A job that needs `remaining` retries before it finishes.
#[derive(Debug)]
pub struct CountdownJob {
    pub id: usize,
    pub remaining: usize,
    pub passes: usize,
}

impl CountdownJob {
    pub fn new(id: usize, remaining: usize) -> Self {
        Self {
            id,
            remaining,
            passes: 0,
        }
    }
}

#[derive(Default)]
pub struct CountdownHandler {
    pub calls: AtomicUsize,
}

impl CountdownHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobHandler for CountdownHandler {
    type Job = CountdownJob;
    type Output = (usize, usize);

    async fn handle(&self, mut job: CountdownJob) -> Step<CountdownJob, (usize, usize)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        job.passes += 1;
        if job.remaining == 0 {
            Step::Done((job.id, job.passes))
        } else {
            job.remaining -= 1;
            Step::Retry(job)
        }
    }
}

/// Finishes every job after sleeping for `delay`.
pub struct SlowHandler {
    pub delay: Duration,
    pub started: AtomicUsize,
}

impl SlowHandler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl JobHandler for SlowHandler {
    type Job = usize;
    type Output = usize;

    async fn handle(&self, job: usize) -> Step<usize, usize> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Step::Done(job)
    }
}

/// Sleeps for `delay` on every job and raises `dropped` when it goes away.
pub struct DropFlagHandler {
    pub delay: Duration,
    pub dropped: Arc<AtomicBool>,
}

impl DropFlagHandler {
    pub fn new(delay: Duration) -> (Self, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let handler = Self {
            delay,
            dropped: Arc::clone(&dropped),
        };
        (handler, dropped)
    }
}

impl Drop for DropFlagHandler {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobHandler for DropFlagHandler {
    type Job = usize;
    type Output = usize;

    async fn handle(&self, job: usize) -> Step<usize, usize> {
        tokio::time::sleep(self.delay).await;
        Step::Done(job)
    }
}

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed,

    #[error("Job abandoned during shutdown")]
    Shutdown,
}

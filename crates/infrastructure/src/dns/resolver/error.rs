use dnsbatch_domain::DomainError;
use dnsbatch_jobs::QueueError;
use thiserror::Error;

/// Why a name could not be submitted for resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

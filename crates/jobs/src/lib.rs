//! Generic worker queue with retry-as-continuation.
//!
//! A fixed set of workers pulls jobs from a shared inbox and hands each one to
//! a [`JobHandler`]. The handler either finishes the job, producing an output
//! that is delivered to the submitting [`JobGroup`], or hands the job back to be
//! queued again.

pub mod error;
pub mod group;
pub mod handler;
pub mod queue;
mod ticket;

pub use error::QueueError;
pub use group::JobGroup;
pub use handler::{JobHandler, Step};
pub use queue::JobQueue;

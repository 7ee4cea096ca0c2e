//! Per-name resolution state machine.
//!
//! A [`ResolutionTask`] advances one record type per step. Once every requested
//! type has an answer list it turns into an immutable [`Resolution`].

pub mod resolved;
pub mod task;

pub use resolved::Resolution;
pub use task::{Advance, ResolutionTask};

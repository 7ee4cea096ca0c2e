//! Batch resolution on top of the job queue and the server pool.
//!
//! Every queue step answers one record type of one name. A task that still
//! has types left goes back into the queue, so names interleave across the
//! workers and the pool's pacing.

pub mod batch;
pub mod error;
pub mod group;
pub mod handler;

pub use batch::Resolver;
pub use error::ResolveError;
pub use group::ResolverGroup;
pub use handler::ResolveHandler;

use crate::dns::dispatcher::to_fqdn;
use crate::dns::forwarding::MessageBuilder;
use dnsbatch_domain::{RecordType, ResolutionTask};

/// Validates a submission and turns it into a task.
///
/// Names that cannot be encoded on the wire are rejected here; once queued
/// they would be retried forever.
pub(crate) fn prepare_task<M>(
    name: &str,
    record_types: &[RecordType],
    meta: M,
) -> Result<ResolutionTask<M>, ResolveError> {
    let task = ResolutionTask::new(name, record_types, meta)?;
    MessageBuilder::parse_name(&to_fqdn(name)?)?;
    Ok(task)
}

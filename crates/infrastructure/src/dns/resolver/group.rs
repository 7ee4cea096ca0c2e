use super::{prepare_task, ResolveError};
use dnsbatch_domain::{RecordType, Resolution, ResolutionTask};
use dnsbatch_jobs::{JobGroup, QueueError};

/// A subset of submissions with its own result stream, sharing the
/// resolver's workers and server pool.
pub struct ResolverGroup<M> {
    group: JobGroup<ResolutionTask<M>, Resolution<M>>,
}

impl<M> Clone for ResolverGroup<M> {
    fn clone(&self) -> Self {
        Self {
            group: self.group.clone(),
        }
    }
}

impl<M: Send + 'static> ResolverGroup<M> {
    pub(crate) fn new(group: JobGroup<ResolutionTask<M>, Resolution<M>>) -> Self {
        Self { group }
    }

    /// Submits `name` for resolution of `record_types`, in that order.
    pub async fn add(
        &self,
        name: &str,
        record_types: &[RecordType],
        meta: M,
    ) -> Result<(), ResolveError> {
        let task = prepare_task(name, record_types, meta)?;
        self.group.add(task).await?;
        Ok(())
    }

    /// Like [`add`](Self::add) with record types given as tags.
    pub async fn add_str<S: AsRef<str>>(
        &self,
        name: &str,
        tags: &[S],
        meta: M,
    ) -> Result<(), ResolveError> {
        let record_types = RecordType::parse_list(tags)?;
        self.add(name, &record_types, meta).await
    }

    /// Next finished resolution of this group, in completion order.
    ///
    /// `None` once the group is closed and everything it accepted is settled.
    pub async fn next(&self) -> Option<Result<Resolution<M>, QueueError>> {
        self.group.next().await
    }

    /// Waits until nothing submitted to this group is pending.
    pub async fn wait(&self) {
        self.group.wait().await
    }

    pub fn close(&self) {
        self.group.close()
    }

    pub fn is_closed(&self) -> bool {
        self.group.is_closed()
    }

    pub fn pending(&self) -> usize {
        self.group.pending()
    }

    /// Completed resolutions per second since the first submission.
    pub fn speed(&self) -> f64 {
        self.group.speed()
    }

    /// Fraction of submitted names already delivered.
    pub fn progress(&self) -> f64 {
        self.group.progress()
    }
}

use super::Resolution;
use crate::{DomainError, RecordType};
use std::collections::BTreeMap;

/// One name awaiting answers for an ordered list of record types.
///
/// A live task always has at least one unanswered type: the transition that
/// answers the last one consumes the task and yields a [`Resolution`].
#[derive(Debug)]
pub struct ResolutionTask<M> {
    name: String,
    record_types: Vec<RecordType>,
    answers: BTreeMap<RecordType, Vec<String>>,
    next: usize,
    failures: u32,
    meta: M,
}

/// Outcome of recording an answer on a task.
#[derive(Debug)]
pub enum Advance<M> {
    Pending(ResolutionTask<M>),
    Done(Resolution<M>),
}

impl<M> ResolutionTask<M> {
    /// Creates a task in its initial state.
    ///
    /// Repeated record types are collapsed to their first occurrence so that
    /// the task can always reach its terminal state.
    pub fn new(
        name: impl Into<String>,
        record_types: &[RecordType],
        meta: M,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DomainError::EmptyName);
        }

        let mut ordered = Vec::with_capacity(record_types.len());
        for rt in record_types {
            if !ordered.contains(rt) {
                ordered.push(*rt);
            }
        }
        if ordered.is_empty() {
            return Err(DomainError::EmptyRecordTypes);
        }

        Ok(Self {
            name,
            record_types: ordered,
            answers: BTreeMap::new(),
            next: 0,
            failures: 0,
            meta,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_types(&self) -> &[RecordType] {
        &self.record_types
    }

    pub fn meta(&self) -> &M {
        &self.meta
    }

    /// The record type the next step must resolve.
    pub fn current(&self) -> RecordType {
        self.record_types[self.next]
    }

    /// Number of record types answered so far.
    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    /// Consecutive failed attempts on the current record type.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Records a failed attempt. The current index is left untouched.
    pub fn record_failure(&mut self) -> u32 {
        self.failures = self.failures.saturating_add(1);
        self.failures
    }

    /// Stores the answers for the current record type and moves to the next.
    pub fn record_answer(mut self, answers: Vec<String>) -> Advance<M> {
        let rt = self.current();
        self.answers.insert(rt, answers);
        self.next += 1;
        self.failures = 0;

        if self.answers.len() == self.record_types.len() {
            Advance::Done(Resolution {
                name: self.name,
                answers: self.answers,
                meta: self.meta,
            })
        } else {
            Advance::Pending(self)
        }
    }
}

use crate::RecordType;
use serde::Serialize;
use std::collections::BTreeMap;

/// Terminal result of a resolution task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution<M> {
    pub name: String,
    pub answers: BTreeMap<RecordType, Vec<String>>,
    pub meta: M,
}

impl<M> Resolution<M> {
    /// Sorts every answer list lexicographically.
    pub fn sort_answers(&mut self) {
        for list in self.answers.values_mut() {
            list.sort();
        }
    }

    pub fn answer_count(&self) -> usize {
        self.answers.values().map(Vec::len).sum()
    }

    /// True when no requested type returned any record.
    pub fn is_empty(&self) -> bool {
        self.answer_count() == 0
    }

    pub fn answers_for(&self, record_type: RecordType) -> Option<&[String]> {
        self.answers.get(&record_type).map(Vec::as_slice)
    }
}

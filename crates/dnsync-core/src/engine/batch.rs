//! Per-record outcomes of a batch sync

use crate::error::{Error, Result};
use crate::record::ProviderRecord;

/// Outcome of syncing one record of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Record name as given by the caller
    pub name: String,
    /// The written record, or why this record was not written
    pub result: Result<ProviderRecord>,
}

impl RecordOutcome {
    /// Whether the record was written
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a batch sync, one per input record, in input order
///
/// Nothing is rolled back when a record fails: every outcome marked as
/// success was written at the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    outcomes: Vec<RecordOutcome>,
}

impl BatchResult {
    /// Wrap per-record outcomes
    pub fn new(outcomes: Vec<RecordOutcome>) -> Self {
        Self { outcomes }
    }

    /// All outcomes, in input order
    pub fn outcomes(&self) -> &[RecordOutcome] {
        &self.outcomes
    }

    /// Number of records in the batch
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the batch was empty
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Whether every record was written
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(RecordOutcome::is_success)
    }

    /// Records that were written
    pub fn succeeded(&self) -> impl Iterator<Item = &ProviderRecord> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Names and errors of records that were not written
    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.name.as_str(), e)))
    }

    /// Collapse into the written records, or the first failure in input order
    pub fn into_result(self) -> Result<Vec<ProviderRecord>> {
        self.outcomes.into_iter().map(|o| o.result).collect()
    }
}

impl IntoIterator for BatchResult {
    type Item = RecordOutcome;
    type IntoIter = std::vec::IntoIter<RecordOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

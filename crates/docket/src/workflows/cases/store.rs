use std::collections::BTreeMap;

use super::domain::{Case, CaseId, HistoryRecord, StatusIndicator, Task};
use crate::workflows::checklist::{ChecklistItem, SubmittedDocument};
use crate::workflows::deadline::SequenceSource;

/// Storage abstraction over the case collections. Every call reads or writes
/// the authoritative copy; callers re-read before mutating and concurrent
/// writers resolve as last-write-wins.
pub trait CaseStore: SequenceSource {
    fn insert_case(&self, case: Case) -> Result<Case, StoreError>;
    fn update_case(&self, case: Case) -> Result<(), StoreError>;
    fn fetch_case(&self, id: &CaseId) -> Result<Option<Case>, StoreError>;
    fn query_cases(&self, predicate: &dyn Fn(&Case) -> bool) -> Result<Vec<Case>, StoreError>;
    fn find_renewal_of(&self, source: &CaseId) -> Result<Option<Case>, StoreError>;

    fn save_tasks(&self, case_id: &CaseId, tasks: Vec<Task>) -> Result<(), StoreError>;
    fn tasks(&self, case_id: &CaseId) -> Result<Vec<Task>, StoreError>;

    fn save_checklist(&self, case_id: &CaseId, items: Vec<ChecklistItem>)
        -> Result<(), StoreError>;
    fn checklist(&self, case_id: &CaseId) -> Result<Option<Vec<ChecklistItem>>, StoreError>;

    fn add_document(&self, document: SubmittedDocument) -> Result<(), StoreError>;
    fn documents(&self, case_id: &CaseId) -> Result<Vec<SubmittedDocument>, StoreError>;

    /// Append-only; records are never edited once written.
    fn append_history(&self, record: HistoryRecord) -> Result<(), StoreError>;
    fn history(&self, case_id: &CaseId) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Replace the published indicator map read by the UI.
    fn publish_status_indicators(
        &self,
        indicators: BTreeMap<CaseId, StatusIndicator>,
    ) -> Result<(), StoreError>;
    fn status_indicators(&self) -> Result<BTreeMap<CaseId, StatusIndicator>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

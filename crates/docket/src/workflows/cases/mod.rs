//! Case records, the transition graph, and the lifecycle service.

pub mod domain;
pub mod report;
mod service;
pub mod store;
mod transitions;

#[cfg(test)]
mod tests;

pub use domain::{
    Case, CaseId, CaseState, HistoryRecord, NewCase, Priority, StatusIndicator, Task, TaskState,
};
pub use report::CaseReport;
pub use service::{CaseChecklist, CaseError, CaseLifecycle, SYSTEM_ACTOR};
pub use store::{CaseStore, StoreError};
pub use transitions::TransitionOrigin;

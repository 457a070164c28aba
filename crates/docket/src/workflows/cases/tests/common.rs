use std::sync::Arc;

use chrono::NaiveDate;

use crate::clock::ManualClock;
use crate::workflows::cases::{CaseLifecycle, NewCase};
use crate::workflows::catalog::StaticCatalog;
use crate::workflows::checklist::ChecklistEngine;
use crate::workflows::deadline::DeadlineCalculator;
use crate::workflows::memory::MemoryStore;

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Friday, used as the opening day in most lifecycle tests.
pub(super) fn friday() -> NaiveDate {
    date(2025, 3, 7)
}

pub(super) fn build_lifecycle(
    today: NaiveDate,
) -> (
    CaseLifecycle<MemoryStore>,
    Arc<MemoryStore>,
    Arc<ManualClock>,
) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::at_date(today));
    let lifecycle = CaseLifecycle::new(
        store.clone(),
        ChecklistEngine::new(Arc::new(StaticCatalog::standard())),
        DeadlineCalculator::default(),
        clock.clone(),
    );
    (lifecycle, store, clock)
}

pub(super) fn license_request(client_id: &str) -> NewCase {
    NewCase {
        procedure_id: "operating-license".to_string(),
        client_id: client_id.to_string(),
        alias: "Corner bakery license".to_string(),
        ..NewCase::default()
    }
}

pub(super) const LICENSE_DOCUMENTS: [&str; 4] = [
    "tax registration certificate 2025.pdf",
    "Identity Document - owner.jpg",
    "Zoning compatibility certificate",
    "premises floor plan v2.pdf",
];

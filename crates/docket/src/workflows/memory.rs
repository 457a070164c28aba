//! Process-local store backing the service binary, the CLI demo, and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::cases::{Case, CaseId, CaseStore, HistoryRecord, StatusIndicator, StoreError, Task};
use super::checklist::{ChecklistItem, SubmittedDocument};
use super::deadline::SequenceSource;
use super::notifications::{
    Notification, NotificationId, NotificationState, NotificationStore, Throttle, WatermarkKey,
};

#[derive(Debug, Default)]
struct Collections {
    sequences: HashMap<(i32, String), u32>,
    cases: BTreeMap<CaseId, Case>,
    tasks: HashMap<CaseId, Vec<Task>>,
    checklists: HashMap<CaseId, Vec<ChecklistItem>>,
    documents: Vec<SubmittedDocument>,
    history: Vec<HistoryRecord>,
    indicators: BTreeMap<CaseId, StatusIndicator>,
    queue: BTreeMap<NotificationId, Notification>,
    sent: Vec<Notification>,
    watermarks: HashMap<WatermarkKey, DateTime<Utc>>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".to_string()))
    }

    /// Number of cases, for readiness and demo output.
    pub fn case_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.cases.len())
    }
}

impl SequenceSource for MemoryStore {
    fn next_sequence(&self, year: i32, org_code: &str) -> Result<u32, StoreError> {
        let mut guard = self.lock()?;
        let counter = guard
            .sequences
            .entry((year, org_code.to_string()))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

impl CaseStore for MemoryStore {
    fn insert_case(&self, case: Case) -> Result<Case, StoreError> {
        let mut guard = self.lock()?;
        if guard.cases.contains_key(&case.id) {
            return Err(StoreError::Conflict);
        }
        guard.cases.insert(case.id.clone(), case.clone());
        Ok(case)
    }

    fn update_case(&self, case: Case) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        match guard.cases.get_mut(&case.id) {
            Some(existing) => {
                *existing = case;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn fetch_case(&self, id: &CaseId) -> Result<Option<Case>, StoreError> {
        Ok(self.lock()?.cases.get(id).cloned())
    }

    fn query_cases(&self, predicate: &dyn Fn(&Case) -> bool) -> Result<Vec<Case>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .cases
            .values()
            .filter(|case| predicate(case))
            .cloned()
            .collect())
    }

    fn find_renewal_of(&self, source: &CaseId) -> Result<Option<Case>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .cases
            .values()
            .find(|case| case.renewal_of.as_ref() == Some(source))
            .cloned())
    }

    fn save_tasks(&self, case_id: &CaseId, tasks: Vec<Task>) -> Result<(), StoreError> {
        self.lock()?.tasks.insert(case_id.clone(), tasks);
        Ok(())
    }

    fn tasks(&self, case_id: &CaseId) -> Result<Vec<Task>, StoreError> {
        Ok(self.lock()?.tasks.get(case_id).cloned().unwrap_or_default())
    }

    fn save_checklist(
        &self,
        case_id: &CaseId,
        items: Vec<ChecklistItem>,
    ) -> Result<(), StoreError> {
        self.lock()?.checklists.insert(case_id.clone(), items);
        Ok(())
    }

    fn checklist(&self, case_id: &CaseId) -> Result<Option<Vec<ChecklistItem>>, StoreError> {
        Ok(self.lock()?.checklists.get(case_id).cloned())
    }

    fn add_document(&self, document: SubmittedDocument) -> Result<(), StoreError> {
        self.lock()?.documents.push(document);
        Ok(())
    }

    fn documents(&self, case_id: &CaseId) -> Result<Vec<SubmittedDocument>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .documents
            .iter()
            .filter(|document| &document.case_id == case_id)
            .cloned()
            .collect())
    }

    fn append_history(&self, record: HistoryRecord) -> Result<(), StoreError> {
        self.lock()?.history.push(record);
        Ok(())
    }

    fn history(&self, case_id: &CaseId) -> Result<Vec<HistoryRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .history
            .iter()
            .filter(|record| &record.case_id == case_id)
            .cloned()
            .collect())
    }

    fn publish_status_indicators(
        &self,
        indicators: BTreeMap<CaseId, StatusIndicator>,
    ) -> Result<(), StoreError> {
        self.lock()?.indicators = indicators;
        Ok(())
    }

    fn status_indicators(&self) -> Result<BTreeMap<CaseId, StatusIndicator>, StoreError> {
        Ok(self.lock()?.indicators.clone())
    }
}

impl NotificationStore for MemoryStore {
    fn enqueue(&self, notification: Notification) -> Result<Notification, StoreError> {
        let mut guard = self.lock()?;
        if guard.queue.contains_key(&notification.id) {
            return Err(StoreError::Conflict);
        }
        guard
            .queue
            .insert(notification.id.clone(), notification.clone());
        Ok(notification)
    }

    fn update_queued(&self, notification: Notification) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        match guard.queue.get_mut(&notification.id) {
            Some(existing) => {
                *existing = notification;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn queued(&self) -> Result<Vec<Notification>, StoreError> {
        Ok(self.lock()?.queue.values().cloned().collect())
    }

    fn archive(&self, notification: Notification) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if guard.queue.remove(&notification.id).is_none() {
            return Err(StoreError::NotFound);
        }
        guard.sent.push(notification);
        Ok(())
    }

    fn sent_history(&self, case_id: Option<&CaseId>) -> Result<Vec<Notification>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .sent
            .iter()
            .filter(|notification| case_id.map_or(true, |id| &notification.case_id == id))
            .cloned()
            .collect())
    }

    fn claim_for_delivery(&self, id: &NotificationId) -> Result<Option<Notification>, StoreError> {
        let mut guard = self.lock()?;
        let Some(queued) = guard.queue.get_mut(id) else {
            return Ok(None);
        };
        if !matches!(
            queued.state,
            NotificationState::Pending | NotificationState::Error
        ) {
            return Ok(None);
        }
        queued.state = NotificationState::Sending;
        Ok(Some(queued.clone()))
    }

    fn claim_watermark(
        &self,
        key: &WatermarkKey,
        now: DateTime<Utc>,
        throttle: Throttle,
    ) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let last = guard.watermarks.get(key).copied();
        if !throttle.permits(last, now) {
            return Ok(false);
        }
        guard.watermarks.insert(key.clone(), now);
        Ok(true)
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::*;
use crate::clock::{Clock, ManualClock};
use crate::workflows::cases::{
    Case, CaseId, CaseLifecycle, CaseState, CaseStore, HistoryRecord, NewCase, StatusIndicator,
    StoreError, Task,
};
use crate::workflows::catalog::StaticCatalog;
use crate::workflows::checklist::{ChecklistEngine, ChecklistItem, SubmittedDocument};
use crate::workflows::deadline::{DeadlineCalculator, SequenceSource};
use crate::workflows::desk::CaseDesk;
use crate::workflows::memory::MemoryStore;
use crate::workflows::notifications::{EnqueueRequest, NotificationDispatcher, OutboxTransport};

const DESK: &str = "case-desk";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn nine_am(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(9, 0, 0).expect("valid time").and_utc()
}

struct Harness<S> {
    desk: CaseDesk<S, MemoryStore, OutboxTransport>,
    runner: Arc<SweepRunner<S, MemoryStore, OutboxTransport>>,
    transport: Arc<OutboxTransport>,
    clock: Arc<ManualClock>,
}

impl<S: CaseStore + 'static> Harness<S> {
    fn with_store(store: Arc<S>, notifications: Arc<MemoryStore>, start: NaiveDate) -> Self {
        let clock = Arc::new(ManualClock::at_date(start));
        let transport = Arc::new(OutboxTransport::new());
        let lifecycle = Arc::new(CaseLifecycle::new(
            store,
            ChecklistEngine::new(Arc::new(StaticCatalog::standard())),
            DeadlineCalculator::default(),
            clock.clone(),
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            notifications,
            transport.clone(),
            clock.clone(),
        ));
        let runner = Arc::new(SweepRunner::new(
            lifecycle.clone(),
            dispatcher.clone(),
            DESK,
        ));
        Self {
            desk: CaseDesk::new(lifecycle, dispatcher),
            runner,
            transport,
            clock,
        }
    }

    fn tick(&self) -> SweepReport {
        self.runner.run(self.clock.now())
    }

    fn tick_on(&self, day: NaiveDate) -> SweepReport {
        self.clock.set(nine_am(day));
        self.tick()
    }

    fn sent_with_subject(&self, fragment: &str) -> usize {
        self.transport
            .sent()
            .iter()
            .filter(|delivery| delivery.subject.contains(fragment))
            .count()
    }

    fn open_license(&self) -> Case {
        self.desk
            .create_case(NewCase {
                procedure_id: "operating-license".to_string(),
                client_id: "CL-1".to_string(),
                alias: "Corner bakery".to_string(),
                ..NewCase::default()
            })
            .expect("case created")
    }
}

fn harness(start: NaiveDate) -> Harness<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    Harness::with_store(store.clone(), store, start)
}

fn submit_all_license_documents<S: CaseStore + 'static>(harness: &Harness<S>, case: &Case) {
    for name in [
        "Tax registration certificate",
        "Identity document",
        "Zoning compatibility certificate",
        "Premises floor plan",
    ] {
        harness
            .desk
            .submit_document(&case.id, name)
            .expect("document stored");
    }
}

#[test]
fn threshold_alert_fires_once_per_day_and_indicators_are_stable() {
    let harness = harness(date(2025, 3, 7));
    let case = harness.open_license();
    assert_eq!(case.deadline, date(2025, 3, 21));

    let first = harness.tick_on(date(2025, 3, 18));
    assert!(first.is_clean());
    assert_eq!(first.deadline_alerts, 1);
    let after_first = harness.desk.get_status_indicators().expect("indicators");
    assert_eq!(after_first.get(&case.id), Some(&StatusIndicator::Yellow));

    harness.clock.advance(Duration::minutes(5));
    let second = harness.tick();
    assert_eq!(second.deadline_alerts, 0);
    assert_eq!(
        harness.desk.get_status_indicators().expect("indicators"),
        after_first
    );
    assert_eq!(harness.sent_with_subject("due in 3 days"), 1);

    assert_eq!(harness.tick_on(date(2025, 3, 19)).deadline_alerts, 0);
    assert_eq!(harness.tick_on(date(2025, 3, 20)).deadline_alerts, 1);
    assert_eq!(harness.sent_with_subject("due tomorrow"), 1);
}

#[test]
fn passing_the_deadline_escalates_once_and_turns_red() {
    let harness = harness(date(2025, 3, 7));
    let case = harness.open_license();

    let report = harness.tick_on(date(2025, 3, 24));
    assert_eq!(report.overdue_escalations, 1);

    let reloaded = harness.desk.get_case(&case.id).expect("case");
    assert_eq!(reloaded.case.state, CaseState::Overdue);
    assert_eq!(reloaded.status_indicator, StatusIndicator::Red);
    assert_eq!(
        harness
            .desk
            .get_status_indicators()
            .expect("indicators")
            .get(&case.id),
        Some(&StatusIndicator::Red)
    );
    assert_eq!(harness.sent_with_subject("OVERDUE"), 1);

    let again = harness.tick();
    assert_eq!(again.overdue_escalations, 0);
    assert_eq!(harness.sent_with_subject("OVERDUE"), 1);
}

#[test]
fn terminal_and_approved_cases_are_not_escalated() {
    let harness = harness(date(2025, 3, 7));
    let approved = harness.open_license();
    let cancelled = harness.open_license();
    harness
        .desk
        .transition_case(&approved.id, CaseState::InProgress, "start", "ana")
        .expect("in progress");
    submit_all_license_documents(&harness, &approved);
    harness
        .desk
        .transition_case(&approved.id, CaseState::Approved, "approved", "ana")
        .expect("approved");
    harness
        .desk
        .transition_case(&cancelled.id, CaseState::Cancelled, "withdrawn", "ana")
        .expect("cancelled");

    let report = harness.tick_on(date(2025, 4, 30));
    assert_eq!(report.overdue_escalations, 0);
    let indicators = harness.desk.get_status_indicators().expect("indicators");
    assert_eq!(
        indicators.get(&approved.id),
        Some(&StatusIndicator::Red),
        "approved but undelivered past the deadline"
    );
    assert_eq!(indicators.get(&cancelled.id), Some(&StatusIndicator::Green));
    assert_eq!(
        harness.desk.get_case(&approved.id).expect("case").case.state,
        CaseState::Approved
    );
}

#[test]
fn missing_document_reminder_waits_a_full_day() {
    let harness = harness(date(2025, 3, 7));
    let case = harness.open_license();

    assert_eq!(harness.tick_on(date(2025, 3, 10)).document_reminders, 1);
    let reminder = harness
        .transport
        .sent()
        .into_iter()
        .find(|delivery| delivery.subject.starts_with("Documents pending"))
        .expect("reminder delivered");
    assert_eq!(reminder.recipient, "CL-1");
    assert!(reminder.body.contains("Premises floor plan"));
    assert!(reminder.body.contains("0% complete"));

    harness.clock.advance(Duration::hours(23));
    assert_eq!(harness.tick().document_reminders, 0);

    harness.clock.advance(Duration::hours(1));
    assert_eq!(harness.tick().document_reminders, 1);

    submit_all_license_documents(&harness, &case);
    harness.clock.advance(Duration::days(2));
    assert_eq!(harness.tick().document_reminders, 0);
}

#[test]
fn renewal_opens_exactly_once_thirty_days_before_expiry() {
    let harness = harness(date(2025, 3, 10));
    let source = harness.open_license();
    harness
        .desk
        .transition_case(&source.id, CaseState::InProgress, "start", "ana")
        .expect("in progress");
    submit_all_license_documents(&harness, &source);
    harness
        .desk
        .transition_case(&source.id, CaseState::Approved, "approved", "ana")
        .expect("approved");
    let completed = harness
        .desk
        .transition_case(&source.id, CaseState::Completed, "delivered", "ana")
        .expect("completed");
    assert_eq!(certificate_expiry(&completed), Some(date(2026, 3, 10)));

    assert_eq!(harness.tick_on(date(2026, 2, 7)).renewals_opened, 0);

    let trigger_day = date(2025, 3, 10) + Duration::days(335);
    assert_eq!(trigger_day, date(2026, 2, 8));
    let report = harness.tick_on(trigger_day);
    assert_eq!(report.renewals_opened, 1);

    let renewal = harness
        .desk
        .lifecycle()
        .store()
        .find_renewal_of(&source.id)
        .expect("store")
        .expect("renewal case");
    assert_eq!(renewal.id.as_str(), "EXP-2026-GEN-00001");
    assert_eq!(renewal.procedure_id, "operating-license");
    assert_eq!(renewal.client_id, "CL-1");
    assert_eq!(renewal.state, CaseState::Initiated);
    assert_eq!(harness.sent_with_subject("Renewal opened"), 1);

    harness.clock.advance(Duration::hours(2));
    assert_eq!(harness.tick().renewals_opened, 0);
    assert_eq!(harness.tick_on(date(2026, 2, 9)).renewals_opened, 0);

    let renewals = harness
        .desk
        .lifecycle()
        .store()
        .query_cases(&|case: &Case| case.renewal_of.as_ref() == Some(&source.id))
        .expect("query");
    assert_eq!(renewals.len(), 1);
}

#[test]
fn validity_spanning_a_leap_day_is_a_fixed_number_of_days() {
    let harness = harness(date(2027, 6, 1));
    let source = harness.open_license();
    harness
        .desk
        .transition_case(&source.id, CaseState::InProgress, "start", "ana")
        .expect("in progress");
    submit_all_license_documents(&harness, &source);
    harness
        .desk
        .transition_case(&source.id, CaseState::Approved, "approved", "ana")
        .expect("approved");
    let completed = harness
        .desk
        .transition_case(&source.id, CaseState::Completed, "delivered", "ana")
        .expect("completed");

    let expiry = certificate_expiry(&completed).expect("expiry");
    assert_eq!(expiry, date(2028, 5, 31));
    assert_eq!(expiry - date(2027, 6, 1), Duration::days(CERTIFICATE_VALIDITY_DAYS));

    assert_eq!(harness.tick_on(date(2028, 4, 30)).renewals_opened, 0);
    assert_eq!(harness.tick_on(date(2028, 5, 1)).renewals_opened, 1);
    assert_eq!(harness.tick_on(date(2028, 5, 2)).renewals_opened, 0);
}

#[test]
fn queue_drain_retries_failed_deliveries_on_later_ticks() {
    let harness = harness(date(2025, 3, 7));
    let case = harness.open_license();
    harness.transport.set_offline(true);

    harness
        .desk
        .enqueue_notification(
            EnqueueRequest::new(case.id.clone(), "case_opened", "CL-1")
                .at(harness.clock.now() - Duration::hours(1)),
        )
        .expect("queued");

    let offline = harness.tick();
    assert!(offline.is_clean());
    assert!(offline.delivery_failures >= 1);
    assert_eq!(offline.delivered, 0);

    harness.transport.set_offline(false);
    let online = harness.tick();
    assert!(online.delivered >= 1);
    assert_eq!(online.delivery_failures, 0);
    assert!(harness
        .desk
        .dispatcher()
        .queued()
        .expect("queue")
        .is_empty());
}

#[derive(Clone, Copy)]
enum Breakage {
    Error,
    Panic,
}

/// Case store whose predicate queries fail while every other call works.
struct BrokenQueries {
    inner: MemoryStore,
    breakage: Breakage,
}

impl SequenceSource for BrokenQueries {
    fn next_sequence(&self, year: i32, org_code: &str) -> Result<u32, StoreError> {
        self.inner.next_sequence(year, org_code)
    }
}

impl CaseStore for BrokenQueries {
    fn insert_case(&self, case: Case) -> Result<Case, StoreError> {
        self.inner.insert_case(case)
    }

    fn update_case(&self, case: Case) -> Result<(), StoreError> {
        self.inner.update_case(case)
    }

    fn fetch_case(&self, id: &CaseId) -> Result<Option<Case>, StoreError> {
        self.inner.fetch_case(id)
    }

    fn query_cases(&self, _predicate: &dyn Fn(&Case) -> bool) -> Result<Vec<Case>, StoreError> {
        match self.breakage {
            Breakage::Error => Err(StoreError::Unavailable("query replica down".to_string())),
            Breakage::Panic => panic!("query planner exploded"),
        }
    }

    fn find_renewal_of(&self, source: &CaseId) -> Result<Option<Case>, StoreError> {
        self.inner.find_renewal_of(source)
    }

    fn save_tasks(&self, case_id: &CaseId, tasks: Vec<Task>) -> Result<(), StoreError> {
        self.inner.save_tasks(case_id, tasks)
    }

    fn tasks(&self, case_id: &CaseId) -> Result<Vec<Task>, StoreError> {
        self.inner.tasks(case_id)
    }

    fn save_checklist(
        &self,
        case_id: &CaseId,
        items: Vec<ChecklistItem>,
    ) -> Result<(), StoreError> {
        self.inner.save_checklist(case_id, items)
    }

    fn checklist(&self, case_id: &CaseId) -> Result<Option<Vec<ChecklistItem>>, StoreError> {
        self.inner.checklist(case_id)
    }

    fn add_document(&self, document: SubmittedDocument) -> Result<(), StoreError> {
        self.inner.add_document(document)
    }

    fn documents(&self, case_id: &CaseId) -> Result<Vec<SubmittedDocument>, StoreError> {
        self.inner.documents(case_id)
    }

    fn append_history(&self, record: HistoryRecord) -> Result<(), StoreError> {
        self.inner.append_history(record)
    }

    fn history(&self, case_id: &CaseId) -> Result<Vec<HistoryRecord>, StoreError> {
        CaseStore::history(&self.inner, case_id)
    }

    fn publish_status_indicators(
        &self,
        indicators: BTreeMap<CaseId, StatusIndicator>,
    ) -> Result<(), StoreError> {
        self.inner.publish_status_indicators(indicators)
    }

    fn status_indicators(&self) -> Result<BTreeMap<CaseId, StatusIndicator>, StoreError> {
        self.inner.status_indicators()
    }
}

fn broken_harness(breakage: Breakage) -> Harness<BrokenQueries> {
    let store = Arc::new(BrokenQueries {
        inner: MemoryStore::new(),
        breakage,
    });
    Harness::with_store(store, Arc::new(MemoryStore::new()), date(2025, 3, 7))
}

fn assert_queue_drain_survives(harness: &Harness<BrokenQueries>, report: &SweepReport) {
    let failed: Vec<SweepCheck> = report.failures.iter().map(|failure| failure.check).collect();
    assert_eq!(
        failed,
        vec![
            SweepCheck::Deadline,
            SweepCheck::MissingDocuments,
            SweepCheck::Renewal,
            SweepCheck::StatusRecompute,
        ]
    );
    assert_eq!(report.delivered, 1);
    assert!(harness
        .desk
        .dispatcher()
        .queued()
        .expect("queue")
        .is_empty());
}

#[test]
fn failing_check_does_not_stop_the_others() {
    let harness = broken_harness(Breakage::Error);
    let case = harness.open_license();
    harness
        .desk
        .enqueue_notification(
            EnqueueRequest::new(case.id, "case_opened", "CL-1").at(harness.clock.now()),
        )
        .expect("queued");

    let report = harness.tick();
    assert_queue_drain_survives(&harness, &report);
    assert!(report.failures[0].error.contains("query replica down"));
}

#[test]
fn panicking_check_is_contained() {
    let harness = broken_harness(Breakage::Panic);
    let case = harness.open_license();
    harness
        .desk
        .enqueue_notification(
            EnqueueRequest::new(case.id, "case_opened", "CL-1").at(harness.clock.now()),
        )
        .expect("queued");

    let report = harness.tick();
    assert_queue_drain_survives(&harness, &report);
    assert!(report.failures[0].error.contains("query planner exploded"));
}

#[tokio::test]
async fn scheduler_start_and_stop_are_idempotent() {
    let harness = harness(date(2025, 3, 7));
    harness.open_license();
    let scheduler = AutomationScheduler::new(
        harness.runner.clone(),
        harness.clock.clone(),
        std::time::Duration::from_millis(20),
    );

    assert!(!scheduler.is_running());
    assert!(scheduler.start());
    assert!(!scheduler.start());
    assert!(scheduler.is_running());

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while scheduler.last_report().is_none() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first tick ran");

    scheduler.stop().await;
    assert!(!scheduler.is_running());
    scheduler.stop().await;

    assert!(scheduler.start());
    scheduler.stop().await;
    assert!(!scheduler.is_running());
}

#[test]
fn manual_tick_records_last_report() {
    let harness = harness(date(2025, 3, 7));
    harness.open_license();
    let scheduler = AutomationScheduler::new(
        harness.runner.clone(),
        harness.clock.clone(),
        std::time::Duration::from_secs(60),
    );

    let report = scheduler.run_tick();
    assert_eq!(report.indicators, 1);
    assert_eq!(scheduler.last_report(), Some(report));
}

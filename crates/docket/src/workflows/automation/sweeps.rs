//! The checks run on every automation tick.
//!
//! Each check is isolated: an error or panic in one is logged and recorded in
//! the [`SweepReport`], and the remaining checks still run. Inside a check a
//! failure on one case is logged and the case is skipped until the next tick.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, info_span, warn};

use crate::workflows::cases::{
    Case, CaseError, CaseLifecycle, CaseState, CaseStore, NewCase, StoreError,
};
use crate::workflows::notifications::templates::{
    CASE_OVERDUE, MISSING_DOCUMENTS, RENEWAL_OPENED,
};
use crate::workflows::notifications::{
    DrainReport, EnqueueRequest, NotificationDispatcher, NotificationError, NotificationStore,
    TemplateSet, Throttle, Transport, WatermarkKey,
};

/// Certificates are assumed valid for this many days after the case completes.
pub const CERTIFICATE_VALIDITY_DAYS: i64 = 365;
/// Renewal cases open when exactly this many days of validity remain.
pub const RENEWAL_LEAD_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepCheck {
    Deadline,
    MissingDocuments,
    Renewal,
    QueueDrain,
    StatusRecompute,
}

impl SweepCheck {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Deadline => "deadline",
            Self::MissingDocuments => "missing_documents",
            Self::Renewal => "renewal",
            Self::QueueDrain => "queue_drain",
            Self::StatusRecompute => "status_recompute",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Case(#[from] CaseError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error("check panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub check: SweepCheck,
    pub error: String,
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub ran_at: DateTime<Utc>,
    pub overdue_escalations: usize,
    pub deadline_alerts: usize,
    pub document_reminders: usize,
    pub renewals_opened: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
    pub indicators: usize,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    fn new(ran_at: DateTime<Utc>) -> Self {
        Self {
            ran_at,
            overdue_escalations: 0,
            deadline_alerts: 0,
            document_reminders: 0,
            renewals_opened: 0,
            delivered: 0,
            delivery_failures: 0,
            indicators: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct DeadlineOutcome {
    escalated: usize,
    alerts: usize,
}

/// Runs the periodic checks against the lifecycle service and the dispatcher.
pub struct SweepRunner<S, N, T> {
    lifecycle: Arc<CaseLifecycle<S>>,
    dispatcher: Arc<NotificationDispatcher<N, T>>,
    alert_recipient: String,
    serial: Mutex<()>,
}

impl<S, N, T> SweepRunner<S, N, T>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    pub fn new(
        lifecycle: Arc<CaseLifecycle<S>>,
        dispatcher: Arc<NotificationDispatcher<N, T>>,
        alert_recipient: impl Into<String>,
    ) -> Self {
        Self {
            lifecycle,
            dispatcher,
            alert_recipient: alert_recipient.into(),
            serial: Mutex::new(()),
        }
    }

    /// One full tick at `now`. Concurrent callers wait for the tick in
    /// progress.
    pub fn run(&self, now: DateTime<Utc>) -> SweepReport {
        let _serial = self
            .serial
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let span = info_span!("automation_tick", ran_at = %now);
        let _entered = span.enter();
        let today = now.date_naive();
        let mut report = SweepReport::new(now);

        if let Some(outcome) = isolate(SweepCheck::Deadline, &mut report, || {
            self.deadline_sweep(today, now)
        }) {
            report.overdue_escalations = outcome.escalated;
            report.deadline_alerts = outcome.alerts;
        }

        if let Some(sent) = isolate(SweepCheck::MissingDocuments, &mut report, || {
            self.missing_document_sweep(now)
        }) {
            report.document_reminders = sent;
        }

        if let Some(opened) = isolate(SweepCheck::Renewal, &mut report, || {
            self.renewal_sweep(today)
        }) {
            report.renewals_opened = opened;
        }

        if let Some(drain) = isolate(SweepCheck::QueueDrain, &mut report, || {
            self.queue_drain(now)
        }) {
            report.delivered = drain.delivered;
            report.delivery_failures = drain.failed;
        }

        if let Some(published) = isolate(SweepCheck::StatusRecompute, &mut report, || {
            self.status_recompute(today)
        }) {
            report.indicators = published;
        }

        info!(
            escalations = report.overdue_escalations,
            deadline_alerts = report.deadline_alerts,
            document_reminders = report.document_reminders,
            renewals = report.renewals_opened,
            delivered = report.delivered,
            failures = report.failures.len(),
            "automation tick finished"
        );
        report
    }

    /// Escalate open cases whose deadline has passed and alert staff on the
    /// 3/1/0 day thresholds, at most once per day per (case, threshold).
    fn deadline_sweep(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DeadlineOutcome, SweepError> {
        let cases = self
            .lifecycle
            .store()
            .query_cases(&|case: &Case| case.state.is_open_work())?;
        let mut outcome = DeadlineOutcome::default();

        for case in cases {
            let days = case.days_remaining(today);
            if days < 0 {
                match self.escalate(&case) {
                    Ok(()) => outcome.escalated += 1,
                    Err(error) => {
                        warn!(case_id = %case.id, %error, "overdue escalation skipped")
                    }
                }
                continue;
            }

            let Some(template) = TemplateSet::deadline_template_for(days) else {
                continue;
            };
            match self.deadline_alert(&case, template, now) {
                Ok(true) => outcome.alerts += 1,
                Ok(false) => {}
                Err(error) => {
                    warn!(case_id = %case.id, template, %error, "deadline alert skipped")
                }
            }
        }

        Ok(outcome)
    }

    fn escalate(&self, case: &Case) -> Result<(), SweepError> {
        let reason = format!("deadline {} passed", case.deadline);
        let escalated = self.lifecycle.escalate_overdue(&case.id, &reason)?;
        self.dispatcher.enqueue(
            EnqueueRequest::new(escalated.id.clone(), CASE_OVERDUE, &self.alert_recipient)
                .var("alias", &escalated.alias)
                .var("deadline", escalated.deadline),
        )?;
        Ok(())
    }

    fn deadline_alert(
        &self,
        case: &Case,
        template: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SweepError> {
        let key = WatermarkKey::new(&case.id, template);
        if !self
            .dispatcher
            .store()
            .claim_watermark(&key, now, Throttle::OncePerDay)?
        {
            return Ok(false);
        }

        self.dispatcher.enqueue(
            EnqueueRequest::new(case.id.clone(), template, &self.alert_recipient)
                .var("alias", &case.alias)
                .var("deadline", case.deadline),
        )?;
        Ok(true)
    }

    /// Remind the client about missing mandatory documents, at most once per
    /// 24 hours per case.
    fn missing_document_sweep(&self, now: DateTime<Utc>) -> Result<usize, SweepError> {
        let cases = self.lifecycle.store().query_cases(&|case: &Case| {
            matches!(case.state, CaseState::Initiated | CaseState::InProgress)
        })?;
        let mut sent = 0;

        for case in cases {
            match self.document_reminder(&case, now) {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(error) => {
                    warn!(case_id = %case.id, %error, "document reminder skipped")
                }
            }
        }

        Ok(sent)
    }

    fn document_reminder(&self, case: &Case, now: DateTime<Utc>) -> Result<bool, SweepError> {
        let evaluation = self.lifecycle.evaluate_case(case)?;
        if evaluation.complete {
            return Ok(false);
        }

        let key = WatermarkKey::new(&case.id, MISSING_DOCUMENTS);
        let throttle = Throttle::Window(Duration::hours(24));
        if !self.dispatcher.store().claim_watermark(&key, now, throttle)? {
            return Ok(false);
        }

        self.dispatcher.enqueue(
            EnqueueRequest::new(case.id.clone(), MISSING_DOCUMENTS, &case.client_id)
                .var("missing", evaluation.missing.join(", "))
                .var("percent", evaluation.percent),
        )?;
        Ok(true)
    }

    /// Open one renewal case per completed case when its certificate has
    /// exactly [`RENEWAL_LEAD_DAYS`] of validity left.
    fn renewal_sweep(&self, today: NaiveDate) -> Result<usize, SweepError> {
        let cases = self
            .lifecycle
            .store()
            .query_cases(&|case: &Case| case.state == CaseState::Completed)?;
        let mut opened = 0;

        for case in cases {
            let Some(expires_on) = certificate_expiry(&case) else {
                continue;
            };
            if (expires_on - today).num_days() != RENEWAL_LEAD_DAYS {
                continue;
            }

            match self.open_renewal(&case, expires_on) {
                Ok(true) => opened += 1,
                Ok(false) => {}
                Err(error) => warn!(case_id = %case.id, %error, "renewal skipped"),
            }
        }

        Ok(opened)
    }

    fn open_renewal(&self, source: &Case, expires_on: NaiveDate) -> Result<bool, SweepError> {
        if let Some(existing) = self.lifecycle.store().find_renewal_of(&source.id)? {
            warn!(
                case_id = %source.id,
                renewal_id = %existing.id,
                "renewal already exists; not opening another"
            );
            return Ok(false);
        }

        let renewal = self.lifecycle.create(NewCase {
            procedure_id: source.procedure_id.clone(),
            client_id: source.client_id.clone(),
            alias: format!("Renewal: {}", source.alias),
            priority: source.priority,
            notes: format!("Renewal of {} (certificate expires {expires_on})", source.id),
            org_code: None,
            renewal_of: Some(source.id.clone()),
        })?;

        info!(
            case_id = %source.id,
            renewal_id = %renewal.id,
            %expires_on,
            "renewal case opened"
        );

        self.dispatcher.enqueue(
            EnqueueRequest::new(renewal.id.clone(), RENEWAL_OPENED, &self.alert_recipient)
                .var("source_case_id", &source.id)
                .var("expires_on", expires_on),
        )?;
        Ok(true)
    }

    fn queue_drain(&self, now: DateTime<Utc>) -> Result<DrainReport, SweepError> {
        Ok(self.dispatcher.drain_queue(now)?)
    }

    /// Publish the indicator for every case so readers never recompute.
    fn status_recompute(&self, today: NaiveDate) -> Result<usize, SweepError> {
        let store = self.lifecycle.store();
        let indicators: BTreeMap<_, _> = store
            .query_cases(&|_: &Case| true)?
            .into_iter()
            .map(|case| {
                let indicator = case.status_indicator(today);
                (case.id, indicator)
            })
            .collect();
        let published = indicators.len();
        store.publish_status_indicators(indicators)?;
        Ok(published)
    }
}

/// Completion date plus the fixed validity period.
pub fn certificate_expiry(case: &Case) -> Option<NaiveDate> {
    case.completed_on?
        .checked_add_signed(Duration::days(CERTIFICATE_VALIDITY_DAYS))
}

fn isolate<R>(
    check: SweepCheck,
    report: &mut SweepReport,
    run: impl FnOnce() -> Result<R, SweepError>,
) -> Option<R> {
    let error = match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(error)) => error,
        Err(payload) => SweepError::Panicked(panic_message(payload.as_ref())),
    };

    error!(check = check.label(), %error, "sweep check failed; retrying next tick");
    report.failures.push(SweepFailure {
        check,
        error: error.to_string(),
    });
    None
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

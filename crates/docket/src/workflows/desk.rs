//! UI-facing commands over the lifecycle service and the dispatcher.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::cases::report::CaseReportSummary;
use super::cases::{
    Case, CaseChecklist, CaseError, CaseId, CaseLifecycle, CaseReport, CaseState, CaseStore,
    HistoryRecord, NewCase, StatusIndicator, Task,
};
use super::catalog::ProcedureDefinition;
use super::checklist::SubmittedDocument;
use super::notifications::templates::{CASE_OPENED, STATE_CHANGED};
use super::notifications::{
    EnqueueRequest, Notification, NotificationDispatcher, NotificationError, NotificationStore,
    Transport,
};

/// Case with its tasks and the live urgency signal.
#[derive(Debug, Clone, Serialize)]
pub struct CaseView {
    #[serde(flatten)]
    pub case: Case,
    pub days_remaining: i64,
    pub status_indicator: StatusIndicator,
    pub tasks: Vec<Task>,
}

pub struct CaseDesk<S, N, T> {
    lifecycle: Arc<CaseLifecycle<S>>,
    dispatcher: Arc<NotificationDispatcher<N, T>>,
}

impl<S, N, T> CaseDesk<S, N, T>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    pub fn new(
        lifecycle: Arc<CaseLifecycle<S>>,
        dispatcher: Arc<NotificationDispatcher<N, T>>,
    ) -> Self {
        Self {
            lifecycle,
            dispatcher,
        }
    }

    pub fn lifecycle(&self) -> &Arc<CaseLifecycle<S>> {
        &self.lifecycle
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher<N, T>> {
        &self.dispatcher
    }

    pub fn procedures(&self) -> Vec<ProcedureDefinition> {
        self.lifecycle.checklist_engine().catalog().procedures()
    }

    /// Open a case and tell the client. A notification failure does not undo
    /// the case.
    pub fn create_case(&self, request: NewCase) -> Result<Case, CaseError> {
        let case = self.lifecycle.create(request)?;
        let procedure = self
            .lifecycle
            .checklist_engine()
            .catalog()
            .lookup(&case.procedure_id)
            .map(|procedure| procedure.name)
            .unwrap_or_else(|| case.procedure_id.clone());

        self.notify(
            EnqueueRequest::new(case.id.clone(), CASE_OPENED, &case.client_id)
                .var("procedure", procedure)
                .var("deadline", case.deadline),
        );
        Ok(case)
    }

    pub fn transition_case(
        &self,
        case_id: &CaseId,
        target: CaseState,
        reason: &str,
        actor: &str,
    ) -> Result<Case, CaseError> {
        let previous = self.lifecycle.get(case_id)?.state;
        let case = self.lifecycle.transition(case_id, target, reason, actor)?;

        self.notify(
            EnqueueRequest::new(case.id.clone(), STATE_CHANGED, &case.client_id)
                .var("previous", previous)
                .var("state", case.state)
                .var("reason", reason),
        );
        Ok(case)
    }

    pub fn complete_step(&self, case_id: &CaseId, actor: &str) -> Result<Case, CaseError> {
        self.lifecycle.complete_step(case_id, actor)
    }

    pub fn submit_document(
        &self,
        case_id: &CaseId,
        name: &str,
    ) -> Result<SubmittedDocument, CaseError> {
        self.lifecycle.submit_document(case_id, name)
    }

    pub fn enqueue_notification(
        &self,
        request: EnqueueRequest,
    ) -> Result<Notification, NotificationError> {
        self.dispatcher.enqueue(request)
    }

    pub fn get_case(&self, case_id: &CaseId) -> Result<CaseView, CaseError> {
        let case = self.lifecycle.get(case_id)?;
        let tasks = self.lifecycle.tasks(case_id)?;
        let today = self.lifecycle.clock().today();
        Ok(CaseView {
            days_remaining: case.days_remaining(today),
            status_indicator: case.status_indicator(today),
            case,
            tasks,
        })
    }

    pub fn get_checklist(&self, case_id: &CaseId) -> Result<CaseChecklist, CaseError> {
        self.lifecycle.checklist(case_id)
    }

    pub fn history(&self, case_id: &CaseId) -> Result<Vec<HistoryRecord>, CaseError> {
        self.lifecycle.history(case_id)
    }

    /// Indicators as last published by the automation tick.
    pub fn get_status_indicators(&self) -> Result<BTreeMap<CaseId, StatusIndicator>, CaseError> {
        Ok(self.lifecycle.store().status_indicators()?)
    }

    pub fn report(&self, today: NaiveDate) -> Result<CaseReportSummary, CaseError> {
        let store = self.lifecycle.store();
        let cases = store.query_cases(&|_: &Case| true)?;
        let mut tasks = Vec::new();
        for case in &cases {
            tasks.extend(store.tasks(&case.id)?);
        }
        Ok(CaseReport::build(&cases, &tasks, today).summary())
    }

    fn notify(&self, request: EnqueueRequest) {
        let case_id = request.case_id.clone();
        let template = request.template.clone();
        if let Err(error) = self.dispatcher.enqueue(request) {
            warn!(%case_id, %template, %error, "case notification not queued");
        }
    }
}

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Case, CaseId, CaseState, HistoryRecord, NewCase, Task, TaskState};
use super::store::{CaseStore, StoreError};
use super::transitions::TransitionOrigin;
use crate::clock::Clock;
use crate::workflows::catalog::{CatalogError, ProcedureDefinition};
use crate::workflows::checklist::{
    ChecklistEngine, ChecklistEvaluation, ChecklistItem, SubmittedDocument,
};
use crate::workflows::deadline::DeadlineCalculator;

/// Actor recorded on transitions the automation sweep performs.
pub const SYSTEM_ACTOR: &str = "system:automation";

/// Checklist slots for a case with `matched` resolved against its documents.
#[derive(Debug, Clone, Serialize)]
pub struct CaseChecklist {
    pub case_id: CaseId,
    pub items: Vec<ChecklistItem>,
    pub evaluation: ChecklistEvaluation,
}

/// Error raised by the lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("case {0} not found")]
    NotFound(CaseId),
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: CaseState, to: CaseState },
    #[error("missing mandatory documents: {}", .0.join(", "))]
    MissingMandatoryDocuments(Vec<String>),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// State machine over cases: creation, transitions, step progress, and the
/// audit trail.
#[derive(Debug)]
pub struct CaseLifecycle<S> {
    store: Arc<S>,
    checklist: ChecklistEngine,
    calculator: DeadlineCalculator,
    clock: Arc<dyn Clock>,
    default_org_code: String,
}

impl<S> CaseLifecycle<S>
where
    S: CaseStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        checklist: ChecklistEngine,
        calculator: DeadlineCalculator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            checklist,
            calculator,
            clock,
            default_org_code: "GEN".to_string(),
        }
    }

    pub fn with_default_org_code(mut self, org_code: impl Into<String>) -> Self {
        self.default_org_code = org_code.into();
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn checklist_engine(&self) -> &ChecklistEngine {
        &self.checklist
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn procedure(&self, procedure_id: &str) -> Result<ProcedureDefinition, CaseError> {
        self.checklist
            .catalog()
            .lookup(procedure_id)
            .ok_or_else(|| CatalogError::UnknownProcedure(procedure_id.to_string()).into())
    }

    /// Open a case: identifier, business-day deadline, one task per catalog
    /// step, and the checklist shape for later evaluation.
    pub fn create(&self, request: NewCase) -> Result<Case, CaseError> {
        let client_id = request.client_id.trim().to_string();
        if client_id.is_empty() {
            return Err(CaseError::MissingField("client_id"));
        }
        if request.procedure_id.trim().is_empty() {
            return Err(CaseError::MissingField("procedure_id"));
        }
        let procedure = self.procedure(&request.procedure_id)?;
        let checklist = self.checklist.build_checklist(&procedure.id)?;

        let now = self.clock.now();
        let today = now.date_naive();
        let org_code = request
            .org_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .unwrap_or(&self.default_org_code);
        let id = self
            .calculator
            .generate_identifier(self.store.as_ref(), org_code, today);

        let alias = if request.alias.trim().is_empty() {
            procedure.name.clone()
        } else {
            request.alias.trim().to_string()
        };

        let case = Case {
            id: id.clone(),
            alias,
            procedure_id: procedure.id.clone(),
            client_id,
            priority: request.priority,
            state: CaseState::Initiated,
            start_date: today,
            deadline: self.calculator.deadline_for(today, procedure.sla_days),
            completed_on: None,
            current_step: 1,
            total_steps: procedure.total_steps().max(1),
            notes: request.notes,
            renewal_of: request.renewal_of,
            created_at: now,
            updated_at: now,
        };

        let tasks: Vec<Task> = procedure
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| Task {
                case_id: id.clone(),
                order: step.order,
                name: step.name.clone(),
                description: step.description.clone(),
                owner: step.role,
                state: if index == 0 {
                    TaskState::InProgress
                } else {
                    TaskState::Pending
                },
                due_date: self.calculator.deadline_for(today, step.sla_days),
            })
            .collect();

        let stored = self.store.insert_case(case)?;
        self.store.save_tasks(&id, tasks)?;
        self.store.save_checklist(&id, checklist)?;
        self.store.append_history(HistoryRecord {
            case_id: id.clone(),
            previous: None,
            next: CaseState::Initiated,
            reason: "case opened".to_string(),
            actor: SYSTEM_ACTOR.to_string(),
            recorded_at: now,
        })?;

        info!(
            case_id = %stored.id,
            procedure = %stored.procedure_id,
            deadline = %stored.deadline,
            "case opened"
        );
        Ok(stored)
    }

    /// Apply a user-requested transition.
    pub fn transition(
        &self,
        case_id: &CaseId,
        target: CaseState,
        reason: &str,
        actor: &str,
    ) -> Result<Case, CaseError> {
        self.apply(case_id, target, reason, actor, TransitionOrigin::User)
    }

    /// System transition used by the deadline sweep once `today > deadline`.
    pub fn escalate_overdue(&self, case_id: &CaseId, reason: &str) -> Result<Case, CaseError> {
        self.apply(
            case_id,
            CaseState::Overdue,
            reason,
            SYSTEM_ACTOR,
            TransitionOrigin::System,
        )
    }

    fn apply(
        &self,
        case_id: &CaseId,
        target: CaseState,
        reason: &str,
        actor: &str,
        origin: TransitionOrigin,
    ) -> Result<Case, CaseError> {
        let mut case = self.get(case_id)?;
        let previous = case.state;

        if !previous.can_transition_to(target, origin) {
            return Err(CaseError::InvalidTransition {
                from: previous,
                to: target,
            });
        }

        if target == CaseState::Approved {
            let evaluation = self.evaluate_case(&case)?;
            if !evaluation.complete {
                return Err(CaseError::MissingMandatoryDocuments(evaluation.missing));
            }
        }

        let now = self.clock.now();
        case.state = target;
        case.updated_at = now;
        if target == CaseState::Completed {
            case.completed_on = Some(now.date_naive());
        }

        self.store.update_case(case.clone())?;
        self.store.append_history(HistoryRecord {
            case_id: case.id.clone(),
            previous: Some(previous),
            next: target,
            reason: reason.to_string(),
            actor: actor.to_string(),
            recorded_at: now,
        })?;

        info!(
            case_id = %case.id,
            from = %previous,
            to = %target,
            actor,
            "case transitioned"
        );
        Ok(case)
    }

    /// Finish the current task, start the next one, and advance the step
    /// index. The index never moves past the last step.
    pub fn complete_step(&self, case_id: &CaseId, actor: &str) -> Result<Case, CaseError> {
        let mut case = self.get(case_id)?;
        if case.state.is_terminal() {
            return Err(CaseError::InvalidTransition {
                from: case.state,
                to: case.state,
            });
        }

        let mut tasks = self.store.tasks(case_id)?;
        let current = case.current_step;
        let mut finished = None;
        for task in tasks.iter_mut() {
            if task.order == current && task.state != TaskState::Done {
                task.state = TaskState::Done;
                finished = Some(task.name.clone());
            } else if task.order == current + 1 && task.state == TaskState::Pending {
                task.state = TaskState::InProgress;
            }
        }

        let Some(finished) = finished else {
            warn!(case_id = %case.id, step = current, "no open task at current step");
            return Ok(case);
        };

        let now = self.clock.now();
        case.current_step = (current + 1).min(case.total_steps);
        case.updated_at = now;

        self.store.save_tasks(case_id, tasks)?;
        self.store.update_case(case.clone())?;
        self.store.append_history(HistoryRecord {
            case_id: case.id.clone(),
            previous: Some(case.state),
            next: case.state,
            reason: format!("step {current} completed: {finished}"),
            actor: actor.to_string(),
            recorded_at: now,
        })?;

        Ok(case)
    }

    /// Record an uploaded document against the case checklist.
    pub fn submit_document(
        &self,
        case_id: &CaseId,
        name: &str,
    ) -> Result<SubmittedDocument, CaseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CaseError::MissingField("name"));
        }
        let case = self.get(case_id)?;
        let document = SubmittedDocument {
            case_id: case.id,
            name: name.to_string(),
            submitted_at: self.clock.now(),
        };
        self.store.add_document(document.clone())?;
        Ok(document)
    }

    pub fn get(&self, case_id: &CaseId) -> Result<Case, CaseError> {
        self.store
            .fetch_case(case_id)?
            .ok_or_else(|| CaseError::NotFound(case_id.clone()))
    }

    pub fn tasks(&self, case_id: &CaseId) -> Result<Vec<Task>, CaseError> {
        self.get(case_id)?;
        let mut tasks = self.store.tasks(case_id)?;
        tasks.sort_by_key(|task| task.order);
        Ok(tasks)
    }

    pub fn history(&self, case_id: &CaseId) -> Result<Vec<HistoryRecord>, CaseError> {
        self.get(case_id)?;
        Ok(self.store.history(case_id)?)
    }

    pub fn checklist(&self, case_id: &CaseId) -> Result<CaseChecklist, CaseError> {
        let case = self.get(case_id)?;
        let items = self.stored_items(&case)?;
        let documents = self.store.documents(case_id)?;
        Ok(CaseChecklist {
            case_id: case.id,
            items: self.checklist.mark_matches(&items, &documents),
            evaluation: self.checklist.evaluate_items(&items, &documents),
        })
    }

    /// Evaluate the persisted checklist against the case's current documents.
    pub fn evaluate_case(&self, case: &Case) -> Result<ChecklistEvaluation, CaseError> {
        let items = self.stored_items(case)?;
        let documents = self.store.documents(&case.id)?;
        Ok(self.checklist.evaluate_items(&items, &documents))
    }

    fn stored_items(&self, case: &Case) -> Result<Vec<ChecklistItem>, CaseError> {
        match self.store.checklist(&case.id)? {
            Some(items) => Ok(items),
            None => Ok(self.checklist.build_checklist(&case.procedure_id)?),
        }
    }
}

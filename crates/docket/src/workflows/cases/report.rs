use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{Case, CaseId, CaseState, StatusIndicator, Task, TaskState};
use crate::workflows::catalog::StepRole;

#[derive(Debug, Clone, Serialize)]
pub struct StateCountEntry {
    pub state: CaseState,
    pub state_label: String,
    pub cases: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorCountEntry {
    pub indicator: StatusIndicator,
    pub indicator_label: String,
    pub cases: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleLoadEntry {
    pub role: StepRole,
    pub role_label: String,
    pub open: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueTaskView {
    pub case_id: CaseId,
    pub order: u32,
    pub name: String,
    pub role: StepRole,
    pub role_label: String,
    pub due_date: NaiveDate,
    pub days_late: i64,
    pub status: TaskState,
    pub status_label: String,
}

#[derive(Debug, Default, Clone)]
pub struct RoleLoad {
    pub open: usize,
    pub overdue: usize,
}

/// Portfolio snapshot for one day: where cases sit and who holds the open
/// work.
#[derive(Debug, Default)]
pub struct CaseReport {
    pub as_of: Option<NaiveDate>,
    pub by_state: HashMap<CaseState, usize>,
    pub by_indicator: HashMap<StatusIndicator, usize>,
    pub role_load: HashMap<StepRole, RoleLoad>,
    pub overdue_tasks: Vec<OverdueTaskView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseReportSummary {
    pub as_of: Option<NaiveDate>,
    pub total_cases: usize,
    pub by_state: Vec<StateCountEntry>,
    pub by_indicator: Vec<IndicatorCountEntry>,
    pub role_load: Vec<RoleLoadEntry>,
    pub overdue_tasks: Vec<OverdueTaskView>,
}

impl CaseReport {
    /// Tasks of terminal cases are ignored; a task is overdue when it is not
    /// done and its due date is before `today`.
    pub fn build(cases: &[Case], tasks: &[Task], today: NaiveDate) -> Self {
        let mut report = Self {
            as_of: Some(today),
            ..Self::default()
        };

        for case in cases {
            *report.by_state.entry(case.state).or_default() += 1;
            *report
                .by_indicator
                .entry(case.status_indicator(today))
                .or_default() += 1;
        }

        let live: HashMap<&CaseId, &Case> = cases
            .iter()
            .filter(|case| !case.state.is_terminal())
            .map(|case| (&case.id, case))
            .collect();

        for task in tasks {
            if task.state == TaskState::Done || !live.contains_key(&task.case_id) {
                continue;
            }
            let load = report.role_load.entry(task.owner).or_default();
            load.open += 1;
            if task.due_date < today {
                load.overdue += 1;
                report.overdue_tasks.push(OverdueTaskView {
                    case_id: task.case_id.clone(),
                    order: task.order,
                    name: task.name.clone(),
                    role: task.owner,
                    role_label: task.owner.label().to_string(),
                    due_date: task.due_date,
                    days_late: (today - task.due_date).num_days(),
                    status: task.state,
                    status_label: task.state.label().to_string(),
                });
            }
        }

        report
            .overdue_tasks
            .sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.case_id.cmp(&b.case_id)));
        report
    }

    pub fn summary(&self) -> CaseReportSummary {
        let by_state = CaseState::ordered()
            .into_iter()
            .filter_map(|state| {
                self.by_state.get(&state).map(|cases| StateCountEntry {
                    state,
                    state_label: state.label().to_string(),
                    cases: *cases,
                })
            })
            .collect();

        let by_indicator = StatusIndicator::ordered()
            .into_iter()
            .map(|indicator| IndicatorCountEntry {
                indicator,
                indicator_label: indicator.label().to_string(),
                cases: self.by_indicator.get(&indicator).copied().unwrap_or(0),
            })
            .collect();

        let role_load = StepRole::ordered()
            .into_iter()
            .filter_map(|role| {
                self.role_load.get(&role).map(|load| RoleLoadEntry {
                    role,
                    role_label: role.label().to_string(),
                    open: load.open,
                    overdue: load.overdue,
                })
            })
            .collect();

        CaseReportSummary {
            as_of: self.as_of,
            total_cases: self.by_state.values().sum(),
            by_state,
            by_indicator,
            role_load,
            overdue_tasks: self.overdue_tasks.clone(),
        }
    }
}

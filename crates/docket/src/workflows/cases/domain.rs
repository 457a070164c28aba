use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflows::catalog::StepRole;
use crate::workflows::deadline::days_remaining;

/// Structured case identifier, `PREFIX-YEAR-ORG-SEQ`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseId(pub String);

impl CaseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    Initiated,
    InProgress,
    Observed,
    Approved,
    Completed,
    Cancelled,
    Overdue,
}

impl CaseState {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Initiated,
            Self::InProgress,
            Self::Observed,
            Self::Approved,
            Self::Completed,
            Self::Cancelled,
            Self::Overdue,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::InProgress => "in_progress",
            Self::Observed => "observed",
            Self::Approved => "approved",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Overdue => "overdue",
        }
    }

    /// No transition leaves these states.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// States still working towards approval, which the deadline sweep may
    /// escalate to `Overdue`.
    pub const fn is_open_work(self) -> bool {
        matches!(self, Self::Initiated | Self::InProgress | Self::Observed)
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Green/yellow/red urgency signal, always derivable from deadline and state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIndicator {
    Green,
    Yellow,
    Red,
}

impl StatusIndicator {
    pub const YELLOW_THRESHOLD_DAYS: i64 = 3;

    pub const fn ordered() -> [Self; 3] {
        [Self::Green, Self::Yellow, Self::Red]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }

    pub fn from_days_remaining(days: i64) -> Self {
        if days < 0 {
            Self::Red
        } else if days <= Self::YELLOW_THRESHOLD_DAYS {
            Self::Yellow
        } else {
            Self::Green
        }
    }

    pub fn derive(state: CaseState, deadline: NaiveDate, today: NaiveDate) -> Self {
        match state {
            CaseState::Overdue => Self::Red,
            CaseState::Completed | CaseState::Cancelled => Self::Green,
            _ => Self::from_days_remaining(days_remaining(deadline, today)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub alias: String,
    pub procedure_id: String,
    pub client_id: String,
    pub priority: Priority,
    pub state: CaseState,
    pub start_date: NaiveDate,
    pub deadline: NaiveDate,
    pub completed_on: Option<NaiveDate>,
    /// 1-based index into the procedure's steps.
    pub current_step: u32,
    pub total_steps: u32,
    pub notes: String,
    /// Source case when this case was opened as a renewal.
    pub renewal_of: Option<CaseId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        days_remaining(self.deadline, today)
    }

    pub fn status_indicator(&self, today: NaiveDate) -> StatusIndicator {
        StatusIndicator::derive(self.state, self.deadline, today)
    }
}

/// Case creation input as issued by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCase {
    pub procedure_id: String,
    pub client_id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub notes: String,
    /// Overrides the configured organisation code in the identifier.
    #[serde(default)]
    pub org_code: Option<String>,
    #[serde(default)]
    pub renewal_of: Option<CaseId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    InProgress,
    Done,
}

impl TaskState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub case_id: CaseId,
    pub order: u32,
    pub name: String,
    pub description: String,
    pub owner: StepRole,
    pub state: TaskState,
    pub due_date: NaiveDate,
}

/// Immutable audit entry. `previous` is empty for the record written when the
/// case is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub case_id: CaseId,
    pub previous: Option<CaseState>,
    pub next: CaseState,
    pub reason: String,
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
}

use super::domain::CaseState;

/// Who asked for a transition. `Overdue` can only be entered by the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOrigin {
    User,
    System,
}

impl CaseState {
    /// Targets reachable in one step.
    pub const fn allowed_targets(self) -> &'static [CaseState] {
        use CaseState::*;
        match self {
            Initiated => &[InProgress, Cancelled, Overdue],
            InProgress => &[Observed, Approved, Cancelled, Overdue],
            Observed => &[InProgress, Cancelled, Overdue],
            Approved => &[Completed, Cancelled],
            Overdue => &[Approved, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, target: CaseState, origin: TransitionOrigin) -> bool {
        if target == CaseState::Overdue && origin != TransitionOrigin::System {
            return false;
        }
        self.allowed_targets().contains(&target)
    }
}

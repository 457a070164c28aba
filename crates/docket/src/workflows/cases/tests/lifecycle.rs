use super::common::*;
use chrono::Duration;

use crate::workflows::cases::{
    CaseError, CaseId, CaseState, NewCase, StatusIndicator, TaskState, SYSTEM_ACTOR,
};
use crate::workflows::catalog::{CatalogError, StepRole};

#[test]
fn create_on_friday_counts_ten_business_days() {
    let (lifecycle, _, _) = build_lifecycle(friday());

    let case = lifecycle
        .create(license_request("CL-100"))
        .expect("case created");

    assert_eq!(case.id.as_str(), "EXP-2025-GEN-00001");
    assert_eq!(case.state, CaseState::Initiated);
    assert_eq!(case.start_date, friday());
    assert_eq!(case.deadline, date(2025, 3, 21));
    assert_eq!(case.current_step, 1);
    assert_eq!(case.total_steps, 4);
    assert_eq!(case.status_indicator(friday()), StatusIndicator::Green);

    let tasks = lifecycle.tasks(&case.id).expect("tasks");
    assert_eq!(tasks.len(), 4);
    assert_eq!(tasks[0].state, TaskState::InProgress);
    assert_eq!(tasks[0].owner, StepRole::Client);
    assert_eq!(tasks[0].due_date, date(2025, 3, 12));
    assert!(tasks[1..].iter().all(|task| task.state == TaskState::Pending));

    let history = lifecycle.history(&case.id).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous, None);
    assert_eq!(history[0].next, CaseState::Initiated);
}

#[test]
fn identifiers_increment_and_honour_org_override() {
    let (lifecycle, _, _) = build_lifecycle(friday());

    let first = lifecycle.create(license_request("CL-1")).expect("first");
    let second = lifecycle.create(license_request("CL-2")).expect("second");
    let ministry = lifecycle
        .create(NewCase {
            org_code: Some("minsa".to_string()),
            ..license_request("CL-3")
        })
        .expect("ministry case");

    assert_eq!(first.id.as_str(), "EXP-2025-GEN-00001");
    assert_eq!(second.id.as_str(), "EXP-2025-GEN-00002");
    assert_eq!(ministry.id.as_str(), "EXP-2025-MINSA-00001");
}

#[test]
fn blank_alias_falls_back_to_procedure_name() {
    let (lifecycle, _, _) = build_lifecycle(friday());
    let case = lifecycle
        .create(NewCase {
            alias: "   ".to_string(),
            ..license_request("CL-1")
        })
        .expect("created");
    assert_eq!(case.alias, "Municipal Operating License");
}

#[test]
fn create_rejects_unknown_procedure_and_missing_client() {
    let (lifecycle, store, _) = build_lifecycle(friday());

    let unknown = lifecycle.create(NewCase {
        procedure_id: "fishing-license".to_string(),
        ..license_request("CL-1")
    });
    assert!(matches!(
        unknown,
        Err(CaseError::Catalog(CatalogError::UnknownProcedure(ref id))) if id == "fishing-license"
    ));

    let blank = lifecycle.create(license_request("  "));
    assert!(matches!(blank, Err(CaseError::MissingField("client_id"))));

    assert_eq!(store.case_count().expect("count"), 0);
}

#[test]
fn invalid_transition_leaves_case_untouched() {
    let (lifecycle, _, _) = build_lifecycle(friday());
    let case = lifecycle.create(license_request("CL-1")).expect("created");

    let result = lifecycle.transition(&case.id, CaseState::Completed, "skip ahead", "ana");
    assert!(matches!(
        result,
        Err(CaseError::InvalidTransition {
            from: CaseState::Initiated,
            to: CaseState::Completed
        })
    ));

    let reloaded = lifecycle.get(&case.id).expect("case");
    assert_eq!(reloaded, case);
    assert_eq!(lifecycle.history(&case.id).expect("history").len(), 1);
}

#[test]
fn users_cannot_mark_a_case_overdue() {
    let (lifecycle, _, _) = build_lifecycle(friday());
    let case = lifecycle.create(license_request("CL-1")).expect("created");

    let result = lifecycle.transition(&case.id, CaseState::Overdue, "late", "ana");
    assert!(matches!(result, Err(CaseError::InvalidTransition { .. })));

    let escalated = lifecycle
        .escalate_overdue(&case.id, "deadline passed")
        .expect("system escalation");
    assert_eq!(escalated.state, CaseState::Overdue);
    let history = lifecycle.history(&case.id).expect("history");
    assert_eq!(history.last().map(|record| record.actor.as_str()), Some(SYSTEM_ACTOR));
}

#[test]
fn approval_waits_for_every_mandatory_document() {
    let (lifecycle, _, clock) = build_lifecycle(friday());
    let case = lifecycle.create(license_request("CL-1")).expect("created");
    lifecycle
        .transition(&case.id, CaseState::InProgress, "work started", "ana")
        .expect("in progress");

    match lifecycle.transition(&case.id, CaseState::Approved, "agency approved", "ana") {
        Err(CaseError::MissingMandatoryDocuments(missing)) => assert_eq!(missing.len(), 4),
        other => panic!("expected missing documents, got {other:?}"),
    }

    for name in &LICENSE_DOCUMENTS[..3] {
        lifecycle.submit_document(&case.id, name).expect("submitted");
    }
    match lifecycle.transition(&case.id, CaseState::Approved, "agency approved", "ana") {
        Err(CaseError::MissingMandatoryDocuments(missing)) => {
            assert_eq!(missing, vec!["Premises floor plan".to_string()]);
        }
        other => panic!("expected one missing document, got {other:?}"),
    }
    assert_eq!(
        lifecycle.get(&case.id).expect("case").state,
        CaseState::InProgress
    );

    lifecycle
        .submit_document(&case.id, LICENSE_DOCUMENTS[3])
        .expect("submitted");
    let approved = lifecycle
        .transition(&case.id, CaseState::Approved, "agency approved", "ana")
        .expect("approved");
    assert_eq!(approved.state, CaseState::Approved);
    assert_eq!(approved.completed_on, None);

    clock.advance(Duration::days(4));
    let completed = lifecycle
        .transition(&case.id, CaseState::Completed, "license delivered", "ana")
        .expect("completed");
    assert_eq!(completed.completed_on, Some(date(2025, 3, 11)));
}

#[test]
fn overdue_case_can_still_be_approved_once_documents_arrive() {
    let (lifecycle, _, _) = build_lifecycle(friday());
    let case = lifecycle.create(license_request("CL-1")).expect("created");
    lifecycle
        .escalate_overdue(&case.id, "deadline passed")
        .expect("overdue");

    assert!(lifecycle
        .transition(&case.id, CaseState::InProgress, "resume", "ana")
        .is_err());

    for name in LICENSE_DOCUMENTS {
        lifecycle.submit_document(&case.id, name).expect("submitted");
    }
    let approved = lifecycle
        .transition(&case.id, CaseState::Approved, "late approval", "ana")
        .expect("approved");
    assert_eq!(approved.state, CaseState::Approved);
}

#[test]
fn complete_step_advances_and_stops_at_last_step() {
    let (lifecycle, _, _) = build_lifecycle(friday());
    let case = lifecycle.create(license_request("CL-1")).expect("created");

    let after_first = lifecycle.complete_step(&case.id, "ana").expect("step 1");
    assert_eq!(after_first.current_step, 2);
    let tasks = lifecycle.tasks(&case.id).expect("tasks");
    assert_eq!(tasks[0].state, TaskState::Done);
    assert_eq!(tasks[1].state, TaskState::InProgress);
    assert_eq!(tasks[2].state, TaskState::Pending);

    for _ in 0..3 {
        lifecycle.complete_step(&case.id, "ana").expect("step");
    }
    let finished = lifecycle.complete_step(&case.id, "ana").expect("no-op");
    assert_eq!(finished.current_step, 4);
    assert!(lifecycle
        .tasks(&case.id)
        .expect("tasks")
        .iter()
        .all(|task| task.state == TaskState::Done));

    // One opening record plus one per completed step.
    assert_eq!(lifecycle.history(&case.id).expect("history").len(), 5);
}

#[test]
fn complete_step_rejected_on_closed_case() {
    let (lifecycle, _, _) = build_lifecycle(friday());
    let case = lifecycle.create(license_request("CL-1")).expect("created");
    lifecycle
        .transition(&case.id, CaseState::Cancelled, "client withdrew", "ana")
        .expect("cancelled");

    assert!(matches!(
        lifecycle.complete_step(&case.id, "ana"),
        Err(CaseError::InvalidTransition { .. })
    ));
}

#[test]
fn history_chains_previous_to_next() {
    let (lifecycle, _, clock) = build_lifecycle(friday());
    let case = lifecycle.create(license_request("CL-1")).expect("created");

    let path = [
        CaseState::InProgress,
        CaseState::Observed,
        CaseState::InProgress,
        CaseState::Cancelled,
    ];
    for target in path {
        clock.advance(Duration::hours(1));
        lifecycle
            .transition(&case.id, target, "review", "ana")
            .expect("allowed");
    }

    let history = lifecycle.history(&case.id).expect("history");
    assert_eq!(history.len(), path.len() + 1);
    for pair in history.windows(2) {
        assert_eq!(pair[1].previous, Some(pair[0].next));
        assert!(pair[1].recorded_at > pair[0].recorded_at);
    }
    assert_eq!(history[2].actor, "ana");
}

#[test]
fn checklist_view_marks_submitted_documents() {
    let (lifecycle, _, _) = build_lifecycle(friday());
    let case = lifecycle.create(license_request("CL-1")).expect("created");
    lifecycle
        .submit_document(&case.id, LICENSE_DOCUMENTS[0])
        .expect("submitted");
    lifecycle
        .submit_document(&case.id, LICENSE_DOCUMENTS[1])
        .expect("submitted");

    let checklist = lifecycle.checklist(&case.id).expect("checklist");
    assert_eq!(checklist.items.len(), 5);
    assert_eq!(checklist.evaluation.percent, 50);
    assert!(!checklist.evaluation.complete);
    assert!(checklist.items[0].matched);
    assert!(!checklist.items[2].matched);

    assert!(matches!(
        lifecycle.submit_document(&case.id, "  "),
        Err(CaseError::MissingField("name"))
    ));
}

#[test]
fn unknown_case_reports_not_found() {
    let (lifecycle, _, _) = build_lifecycle(friday());
    let ghost = CaseId("EXP-2025-GEN-99999".to_string());

    assert!(matches!(lifecycle.get(&ghost), Err(CaseError::NotFound(_))));
    assert!(matches!(
        lifecycle.transition(&ghost, CaseState::InProgress, "start", "ana"),
        Err(CaseError::NotFound(_))
    ));
    assert!(matches!(lifecycle.history(&ghost), Err(CaseError::NotFound(_))));
    assert!(matches!(
        lifecycle.submit_document(&ghost, "invoice.pdf"),
        Err(CaseError::NotFound(_))
    ));
}

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::cases::{CaseId, CaseState, CaseStore, NewCase};
use super::desk::CaseDesk;
use super::notifications::{EnqueueRequest, NotificationStore, Transport};
use crate::error::AppError;

pub const ACTOR_HEADER: &str = "x-actor";
const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub target: CaseState,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub name: String,
}

/// HTTP surface over the case desk.
pub fn case_router<S, N, T>(desk: Arc<CaseDesk<S, N, T>>) -> Router
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    Router::new()
        .route("/api/v1/procedures", get(procedures_handler::<S, N, T>))
        .route("/api/v1/cases", post(create_handler::<S, N, T>))
        .route("/api/v1/cases/:case_id", get(case_handler::<S, N, T>))
        .route(
            "/api/v1/cases/:case_id/transitions",
            post(transition_handler::<S, N, T>),
        )
        .route(
            "/api/v1/cases/:case_id/steps/complete",
            post(complete_step_handler::<S, N, T>),
        )
        .route(
            "/api/v1/cases/:case_id/checklist",
            get(checklist_handler::<S, N, T>),
        )
        .route(
            "/api/v1/cases/:case_id/documents",
            post(document_handler::<S, N, T>),
        )
        .route(
            "/api/v1/cases/:case_id/history",
            get(history_handler::<S, N, T>),
        )
        .route(
            "/api/v1/notifications",
            post(notification_handler::<S, N, T>),
        )
        .route(
            "/api/v1/status-indicators",
            get(indicators_handler::<S, N, T>),
        )
        .route("/api/v1/report", get(report_handler::<S, N, T>))
        .with_state(desk)
}

fn actor(headers: &HeaderMap) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS)
        .to_string()
}

pub(crate) async fn procedures_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    Json(desk.procedures()).into_response()
}

pub(crate) async fn create_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
    Json(request): Json<NewCase>,
) -> Result<Response, AppError>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    let case = desk.create_case(request)?;
    Ok((StatusCode::CREATED, Json(case)).into_response())
}

pub(crate) async fn case_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
    Path(case_id): Path<String>,
) -> Result<Response, AppError>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    let view = desk.get_case(&CaseId(case_id))?;
    Ok(Json(view).into_response())
}

pub(crate) async fn transition_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
    Path(case_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<TransitionRequest>,
) -> Result<Response, AppError>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    let case = desk.transition_case(
        &CaseId(case_id),
        request.target,
        &request.reason,
        &actor(&headers),
    )?;
    Ok(Json(case).into_response())
}

pub(crate) async fn complete_step_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
    Path(case_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    let case = desk.complete_step(&CaseId(case_id), &actor(&headers))?;
    Ok(Json(case).into_response())
}

pub(crate) async fn checklist_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
    Path(case_id): Path<String>,
) -> Result<Response, AppError>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    let checklist = desk.get_checklist(&CaseId(case_id))?;
    Ok(Json(checklist).into_response())
}

pub(crate) async fn document_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
    Path(case_id): Path<String>,
    Json(request): Json<DocumentRequest>,
) -> Result<Response, AppError>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    let case_id = CaseId(case_id);
    let document = desk.submit_document(&case_id, &request.name)?;
    let checklist = desk.get_checklist(&case_id)?;
    let payload = json!({
        "document": document,
        "evaluation": checklist.evaluation,
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

pub(crate) async fn history_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
    Path(case_id): Path<String>,
) -> Result<Response, AppError>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    let case_id = CaseId(case_id);
    let transitions = desk.history(&case_id)?;
    let notifications = desk.dispatcher().history(Some(&case_id))?;
    let payload = json!({
        "case_id": case_id,
        "transitions": transitions,
        "notifications": notifications,
    });
    Ok(Json(payload).into_response())
}

pub(crate) async fn notification_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
    Json(request): Json<EnqueueRequest>,
) -> Result<Response, AppError>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    let notification = desk.enqueue_notification(request)?;
    Ok((StatusCode::ACCEPTED, Json(notification)).into_response())
}

pub(crate) async fn indicators_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
) -> Result<Response, AppError>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    let indicators = desk.get_status_indicators()?;
    Ok(Json(indicators).into_response())
}

pub(crate) async fn report_handler<S, N, T>(
    State(desk): State<Arc<CaseDesk<S, N, T>>>,
) -> Result<Response, AppError>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    let today = desk.lifecycle().clock().today();
    let report = desk.report(today)?;
    Ok(Json(report).into_response())
}

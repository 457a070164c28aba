use crate::infra::{AppState, Desk};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use docket::workflows::router::case_router;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_case_routes(desk: Arc<Desk>) -> axum::Router {
    case_router(desk)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/automation", axum::routing::get(automation_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the listener is bound and the automation loop is running.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let bound = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let automation = state.scheduler.is_running();
    let ready = bound && automation;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = json!({
        "status": if ready { "ready" } else { "initializing" },
        "automation": if automation { "running" } else { "stopped" },
    });

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Last tick outcome, or 204 before the first tick.
pub(crate) async fn automation_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    match state.scheduler.last_report() {
        Some(report) => (StatusCode::OK, Json(json!(report))).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

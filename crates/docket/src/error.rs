use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::cases::{CaseError, StoreError};
use crate::workflows::catalog::CatalogImportError;
use crate::workflows::notifications::NotificationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    CatalogImport(CatalogImportError),
    Case(CaseError),
    Notification(NotificationError),
    Store(StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Case(err) => match err {
                CaseError::NotFound(_) => StatusCode::NOT_FOUND,
                CaseError::InvalidTransition { .. } => StatusCode::CONFLICT,
                CaseError::MissingMandatoryDocuments(_)
                | CaseError::Catalog(_)
                | CaseError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CaseError::Store(store) => store_status(store),
            },
            AppError::Notification(err) => match err {
                NotificationError::UnknownTemplate(_) | NotificationError::MissingField(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                NotificationError::Store(store) => store_status(store),
            },
            AppError::Store(err) => store_status(err),
            AppError::CatalogImport(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Conflict => StatusCode::CONFLICT,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::CatalogImport(err) => write!(f, "catalog import error: {}", err),
            AppError::Case(err) => write!(f, "{}", err),
            AppError::Notification(err) => write!(f, "{}", err),
            AppError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::CatalogImport(err) => Some(err),
            AppError::Case(err) => Some(err),
            AppError::Notification(err) => Some(err),
            AppError::Store(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Case(CaseError::MissingMandatoryDocuments(missing)) => json!({
                "error": self.to_string(),
                "missing": missing,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CatalogImportError> for AppError {
    fn from(value: CatalogImportError) -> Self {
        Self::CatalogImport(value)
    }
}

impl From<CaseError> for AppError {
    fn from(value: CaseError) -> Self {
        Self::Case(value)
    }
}

impl From<NotificationError> for AppError {
    fn from(value: NotificationError) -> Self {
        Self::Notification(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

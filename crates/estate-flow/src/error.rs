use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::audit::AuditError;
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::desk::{DeskError, StoreError};

/// Top-level error of the binaries: startup, storage and desk failures.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
    #[error("listing store error: {0}")]
    Store(#[from] StoreError),
    #[error("listing desk error: {0}")]
    Desk(#[from] DeskError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Desk(err) => err.into_response(),
            other => {
                let body = Json(json!({ "error": other.to_string() }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

use crate::config::ConfigError;
use crate::pipeline::{status_and_reason, PipelineError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the salesdesk binary. `Pipeline` is the only variant
/// that can reach a request path; the rest abort startup.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("listener: {0}")]
    Listener(#[from] std::io::Error),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Same status and machine-readable reason the pipeline router
            // uses, so a lead-not-found stays a 404 and a double-sale a 409
            // no matter which surface reports it.
            AppError::Pipeline(error) => {
                let (status, reason) = status_and_reason(&error);
                let body = Json(json!({ "error": error.to_string(), "reason": reason }));
                (status, body).into_response()
            }
            startup => {
                let body = Json(json!({ "error": startup.to_string(), "reason": "internal" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

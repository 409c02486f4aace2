//! services/api/src/error.rs
//!
//! Defines the startup error type for the service and the JSON error body
//! returned by every handler.

use axum::{http::StatusCode, Json};
use huella_core::ReportError;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Stable machine-readable code.
    pub code: String,
    /// User-facing message.
    pub message: String,
    /// Where the client should navigate next, when the error implies it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

pub type HandlerError = (StatusCode, Json<ErrorResponse>);

pub fn reject(status: StatusCode, code: &str, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            message: message.into(),
            redirect_to: None,
        }),
    )
}

/// Logs a store/network failure and hides it behind one generic message.
pub fn internal(message: &str, cause: impl std::fmt::Debug) -> HandlerError {
    error!("{}: {:?}", message, cause);
    reject(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Maps report rule failures onto HTTP.
pub fn report_rejection(err: ReportError) -> HandlerError {
    let message = err.to_string();
    match err {
        ReportError::Validation(_) => reject(StatusCode::BAD_REQUEST, "validation", message),
        ReportError::NotConfirmed => reject(StatusCode::BAD_REQUEST, "confirmation_required", message),
        ReportError::Forbidden => reject(StatusCode::FORBIDDEN, "forbidden", message),
        ReportError::NotFound => reject(StatusCode::NOT_FOUND, "not_found", message),
        ReportError::Upload(_) => reject(StatusCode::BAD_GATEWAY, "upload_failed", message),
        ReportError::Store { .. } => reject(StatusCode::INTERNAL_SERVER_ERROR, "internal", message),
    }
}

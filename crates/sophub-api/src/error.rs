//! Maps domain `AppError` to HTTP responses.
//!
//! `AppError` lives in `sophub-core`, so handlers return the local
//! [`ApiError`] wrapper, which `?` builds from any `AppError`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use sophub_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Optional details, such as the integrity failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// HTTP status and error code for an error kind.
pub fn status_for(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
        ErrorKind::NoHistory => (StatusCode::CONFLICT, "NO_HISTORY"),
        ErrorKind::Integrity => (StatusCode::UNPROCESSABLE_ENTITY, "INTEGRITY_ERROR"),
        ErrorKind::Storage => (StatusCode::BAD_GATEWAY, "STORAGE_ERROR"),
        ErrorKind::Database
        | ErrorKind::Configuration
        | ErrorKind::Serialization
        | ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl From<&AppError> for ApiErrorResponse {
    fn from(err: &AppError) -> Self {
        let (_, code) = status_for(err.kind);
        Self {
            success: false,
            error: code.to_string(),
            message: err.message.clone(),
            details: err
                .code
                .map(|reason| serde_json::json!({ "reason": reason })),
        }
    }
}

/// Handler error: an `AppError` rendered in the standard envelope.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Result type returned by handlers and extractors.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, _) = status_for(err.kind);
        if status.is_server_error() {
            tracing::error!(kind = %err.kind, error = %err.message, source = ?err.source, "Request failed");
        }
        (status, Json(ApiErrorResponse::from(&err))).into_response()
    }
}

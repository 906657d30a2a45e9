//! Health check handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::response::{ApiResponse, ComponentHealth, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let metadata_store = ComponentHealth {
        backend: state.version_manager.store_backend().to_string(),
        healthy: state.version_manager.store_healthy().await,
    };
    let blob_store = ComponentHealth {
        backend: state.blob_store.provider_type().to_string(),
        healthy: state.blob_store.health_check().await.unwrap_or(false),
    };

    let healthy = metadata_store.healthy && blob_store.healthy;
    let (status, label) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(ApiResponse::ok(
            "Health report",
            HealthResponse {
                status: label.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                metadata_store,
                blob_store,
            },
        )),
    )
}

//! Route definitions for the SOP Hub HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// All API routes, before state and middleware are attached.
pub fn build_router() -> Router<AppState> {
    let api_routes = Router::new()
        .merge(sop_routes())
        .merge(blob_routes())
        .merge(health_routes());

    Router::new().nest("/api", api_routes)
}

/// Document version lifecycle
fn sop_routes() -> Router<AppState> {
    Router::new()
        .route("/sops/sign-upload", post(handlers::sop::sign_upload))
        .route("/sops/commit", post(handlers::sop::commit))
        .route("/sops/list", get(handlers::sop::list))
        .route("/sops/replace/{id}", post(handlers::sop::replace))
        .route("/sops/restore/{id}", post(handlers::sop::restore))
        .route("/sops/signed/{id}", get(handlers::sop::signed))
        .route("/sops/{id}", get(handlers::sop::get_version))
        .route("/sops/{id}/history", get(handlers::sop::history))
}

/// Signed URL targets of the local blob store
fn blob_routes() -> Router<AppState> {
    Router::new().route(
        "/blobs/{*key}",
        get(handlers::blob::get_blob).put(handlers::blob::put_blob),
    )
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

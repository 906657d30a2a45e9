//! SOP document version handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use sophub_entity::document::DocumentVersion;

use crate::dto::request::{CommitRequest, ListQuery, ReplaceRequest, SignUploadRequest};
use crate::dto::response::{ApiResponse, ReplaceResponse, SignUploadResponse, SignedReadResponse};
use crate::error::ApiError;
use crate::extractors::{ValidatedJson, parse_uuid};
use crate::state::AppState;

type JsonResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// POST /api/sops/sign-upload
pub async fn sign_upload(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignUploadRequest>,
) -> JsonResult<SignUploadResponse> {
    let ticket = state.version_manager.initiate(req.into()).await?;
    Ok(Json(ApiResponse::ok("Signed URL ready", ticket.into())))
}

/// POST /api/sops/commit
pub async fn commit(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CommitRequest>,
) -> JsonResult<DocumentVersion> {
    let version = state.version_manager.commit(req.version_id).await?;
    Ok(Json(ApiResponse::ok(
        "File upload committed and verified",
        version,
    )))
}

/// GET /api/sops/list?state=&machine_name=&department=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> JsonResult<Vec<DocumentVersion>> {
    let filter = query.into_filter()?;
    let versions = state.version_manager.list(&filter).await?;
    Ok(Json(ApiResponse::ok("SOPs fetched", versions)))
}

/// POST /api/sops/replace/{id}
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ReplaceRequest>,
) -> JsonResult<ReplaceResponse> {
    let id = parse_uuid(&id)?;
    let ticket = state.version_manager.replace(id, req.into()).await?;
    Ok(Json(ApiResponse::ok("Ready to replace file", ticket.into())))
}

/// POST /api/sops/restore/{id}
pub async fn restore(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult<DocumentVersion> {
    let id = parse_uuid(&id)?;
    let restored = state.version_manager.restore(id).await?;
    Ok(Json(ApiResponse::ok(
        "Previous version restored and current version deleted",
        restored,
    )))
}

/// GET /api/sops/signed/{id}
pub async fn signed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult<SignedReadResponse> {
    let id = parse_uuid(&id)?;
    let read = state.version_manager.signed_read(id).await?;
    Ok(Json(ApiResponse::ok("Signed URL generated", read.into())))
}

/// GET /api/sops/{id}
pub async fn get_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult<DocumentVersion> {
    let id = parse_uuid(&id)?;
    let version = state.version_manager.get(id).await?;
    Ok(Json(ApiResponse::ok("SOP version fetched", version)))
}

/// GET /api/sops/{id}/history
pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult<Vec<DocumentVersion>> {
    let id = parse_uuid(&id)?;
    let versions = state.version_manager.history(id).await?;
    Ok(Json(ApiResponse::ok("SOP history fetched", versions)))
}

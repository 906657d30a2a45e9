//! Endpoints answering the signed URLs issued by the local blob store.
//!
//! These stand in for an object store's own endpoints: the signature in
//! the query string is the only authorization.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use tracing::info;

use sophub_core::error::AppError;
use sophub_core::traits::{BlobStore, HttpMethod};
use sophub_storage::LocalBlobStore;
use sophub_storage::sniff::effective_content_type;

use crate::dto::request::BlobQuery;
use crate::error::ApiResult;
use crate::state::AppState;

fn local_store(state: &AppState) -> Result<&Arc<LocalBlobStore>, AppError> {
    state
        .local_blobs
        .as_ref()
        .ok_or_else(|| AppError::not_found("Blob endpoint is not enabled"))
}

/// PUT /api/blobs/{*key}
pub async fn put_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<BlobQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let store = local_store(&state)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    store.verify(
        HttpMethod::Put,
        &key,
        query.expires,
        content_type,
        &query.signature,
    )?;
    let written = store.put(&key, body).await?;

    info!(key = %key, bytes = written, "Blob uploaded");
    Ok(StatusCode::OK)
}

/// GET /api/blobs/{*key}
pub async fn get_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<BlobQuery>,
) -> ApiResult<Response> {
    let store = local_store(&state)?;
    store.verify(HttpMethod::Get, &key, query.expires, "", &query.signature)?;

    let object = store
        .fetch(&key)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Blob not found: {key}")))?;

    let content_type = effective_content_type(object.content_type.as_deref(), &object.data)
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let filename: String = key
        .rsplit('/')
        .next()
        .unwrap_or(&key)
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && *c != '"')
        .collect();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{filename}\""),
        )
        .header(header::CONTENT_LENGTH, object.data.len())
        .body(Body::from(object.data))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")).into())
}

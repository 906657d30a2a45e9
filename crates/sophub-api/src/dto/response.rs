//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sophub_core::traits::PresignedUrl;
use sophub_service::{SignedRead, UploadTicket};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Short description of the outcome.
    pub message: String,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Headers an uploader must send with the write request.
fn header_map(url: &PresignedUrl) -> serde_json::Map<String, serde_json::Value> {
    url.headers
        .iter()
        .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
        .collect()
}

/// Result of `sign-upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUploadResponse {
    /// New pending version.
    pub version_id: Uuid,
    /// Pre-signed write URL.
    pub upload_url: String,
    /// Headers to send with the upload.
    pub upload_headers: serde_json::Map<String, serde_json::Value>,
    /// Storage key of the object.
    pub storage_path: String,
    /// When the upload URL expires.
    pub expires_at: DateTime<Utc>,
}

impl From<UploadTicket> for SignUploadResponse {
    fn from(ticket: UploadTicket) -> Self {
        Self {
            version_id: ticket.version.id,
            upload_headers: header_map(&ticket.upload),
            upload_url: ticket.upload.url,
            storage_path: ticket.version.storage_key,
            expires_at: ticket.upload.expires_at,
        }
    }
}

/// Result of `replace`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceResponse {
    /// New pending version.
    pub new_version_id: Uuid,
    /// The archived version it supersedes.
    pub prev_version_id: Option<Uuid>,
    /// Pre-signed write URL.
    pub upload_url: String,
    /// Headers to send with the upload.
    pub upload_headers: serde_json::Map<String, serde_json::Value>,
    /// Storage key of the object.
    pub storage_path: String,
    /// When the upload URL expires.
    pub expires_at: DateTime<Utc>,
}

impl From<UploadTicket> for ReplaceResponse {
    fn from(ticket: UploadTicket) -> Self {
        Self {
            new_version_id: ticket.version.id,
            prev_version_id: ticket.version.prev_version_id,
            upload_headers: header_map(&ticket.upload),
            upload_url: ticket.upload.url,
            storage_path: ticket.version.storage_key,
            expires_at: ticket.upload.expires_at,
        }
    }
}

/// Result of `signed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedReadResponse {
    /// Pre-signed read URL.
    pub download_url: String,
    /// File name to present.
    pub filename: String,
    /// When the URL expires.
    pub expires_at: DateTime<Utc>,
}

impl From<SignedRead> for SignedReadResponse {
    fn from(read: SignedRead) -> Self {
        Self {
            download_url: read.download.url,
            filename: read.version.filename,
            expires_at: read.download.expires_at,
        }
    }
}

/// Component status in the health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Backend or provider name.
    pub backend: String,
    /// Whether it answered.
    pub healthy: bool,
}

/// Health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Metadata store status.
    pub metadata_store: ComponentHealth,
    /// Blob store status.
    pub blob_store: ComponentHealth,
}

//! Blob store trait for pluggable object storage backends.
//!
//! The blob store is an external capability: it signs URLs that let a
//! client read or write one object directly, and lets the server inspect
//! or remove an object by key. It never decides *when* bytes live or die;
//! the version manager does.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// HTTP method a presigned URL authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Download the object.
    Get,
    /// Write the object.
    Put,
}

/// A time-limited, credential-bearing URL for one object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUrl {
    /// The URL itself.
    pub url: String,
    /// The method the URL is valid for.
    pub method: HttpMethod,
    /// When the URL stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Headers the client must send with the request (e.g. `Content-Type`
    /// for a signed write).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
}

impl PresignedUrl {
    /// Build a presigned URL expiring `ttl` from now.
    pub fn new(url: String, method: HttpMethod, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl.min(MAX_PRESIGN_TTL))
            .unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            url,
            method,
            expires_at: Utc::now() + ttl,
            headers: Vec::new(),
        }
    }

    /// Add a header the client must send.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// An object fetched from the blob store.
#[derive(Debug, Clone)]
pub struct BlobObject {
    /// Storage key.
    pub key: String,
    /// Full object content.
    pub data: Bytes,
    /// Content type reported by the store, if it keeps one.
    pub content_type: Option<String>,
    /// Last modification time, if known.
    pub last_modified: Option<DateTime<Utc>>,
}

impl BlobObject {
    /// Object size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Maximum presigned URL lifetime (7 days, the S3 limit).
pub const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Reject zero or over-long presign lifetimes.
pub fn validate_ttl(ttl: Duration) -> AppResult<()> {
    if ttl.is_zero() {
        return Err(crate::AppError::validation(
            "Presigned URL lifetime must be greater than zero",
        ));
    }
    if ttl > MAX_PRESIGN_TTL {
        return Err(crate::AppError::validation(format!(
            "Presigned URL lifetime {ttl:?} exceeds maximum {MAX_PRESIGN_TTL:?}"
        )));
    }
    Ok(())
}

/// Trait for blob storage backends.
///
/// Implementations exist for S3, the local filesystem, and memory. The
/// trait is defined here in `sophub-core` and implemented in
/// `sophub-storage`.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "s3", "local").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Issue a URL authorizing a single write of `key` with the given
    /// content type.
    async fn issue_write_url(
        &self,
        key: &str,
        ttl: Duration,
        content_type: &str,
    ) -> AppResult<PresignedUrl>;

    /// Issue a URL authorizing reads of `key`. When `inline_filename` is
    /// set, the store is asked to serve the object with an inline content
    /// disposition under that name.
    async fn issue_read_url(
        &self,
        key: &str,
        ttl: Duration,
        inline_filename: Option<&str>,
    ) -> AppResult<PresignedUrl>;

    /// Fetch the whole object. `Ok(None)` means the object does not exist.
    async fn fetch(&self, key: &str) -> AppResult<Option<BlobObject>>;

    /// Delete the object. `Ok(false)` means it did not exist.
    async fn delete(&self, key: &str) -> AppResult<bool>;
}

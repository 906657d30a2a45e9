//! Local filesystem blob store.
//!
//! Objects live under a root directory at their key path. Pre-signed URLs
//! point back at this server's `/api/blobs/{key}` route and carry an HMAC
//! signature that the route checks before touching the filesystem.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::debug;

use sophub_core::config::LocalStorageConfig;
use sophub_core::error::{AppError, ErrorKind};
use sophub_core::result::AppResult;
use sophub_core::traits::{BlobObject, BlobStore, HttpMethod, PresignedUrl};

use crate::signing::{encode_key, UrlSigner};

/// Route prefix the API serves local blobs under.
pub const BLOB_ROUTE: &str = "/api/blobs";

/// Blob store on the local filesystem with self-served signed URLs.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
    signer: UrlSigner,
}

impl LocalBlobStore {
    /// Create the store, making sure the root directory exists.
    pub async fn new(config: &LocalStorageConfig) -> AppResult<Self> {
        let root = PathBuf::from(&config.root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create blob root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            signer: UrlSigner::new(&config.signing_secret)?,
        })
    }

    /// Map a key to a path under the root. Keys with empty, `.` or `..`
    /// segments are rejected.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let bad_segment = key
            .split('/')
            .any(|s| s.is_empty() || s == "." || s == ".." || s.contains('\\'));
        if bad_segment {
            return Err(AppError::validation(format!("Invalid blob key '{key}'")));
        }
        Ok(self.root.join(key))
    }

    fn signed_url(
        &self,
        method: HttpMethod,
        key: &str,
        ttl: Duration,
        content_type: &str,
    ) -> AppResult<PresignedUrl> {
        self.resolve(key)?;
        let presigned = PresignedUrl::new(String::new(), method, ttl);
        let expires = presigned.expires_at.timestamp();
        let signature = self.signer.sign(method, key, expires, content_type)?;
        Ok(PresignedUrl {
            url: format!(
                "{}{BLOB_ROUTE}/{}?expires={expires}&signature={signature}",
                self.public_base_url,
                encode_key(key)
            ),
            ..presigned
        })
    }

    /// Check a signature presented to the blob route.
    pub fn verify(
        &self,
        method: HttpMethod,
        key: &str,
        expires: i64,
        content_type: &str,
        signature: &str,
    ) -> AppResult<()> {
        self.signer.verify(
            method,
            key,
            expires,
            content_type,
            signature,
            Utc::now().timestamp(),
        )
    }

    /// Store a new object. Each key is written once: the bytes go to a
    /// sibling temp file which is then hard-linked into place, so readers
    /// never observe a partial object and an existing object is never
    /// replaced. A second write to the same key is a `Conflict`.
    pub async fn put(&self, key: &str, data: Bytes) -> AppResult<u64> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Err(already_written(key));
        }

        let mut partial = path.clone().into_os_string();
        partial.push(".part");
        fs::write(&partial, &data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write blob: {key}"), e)
        })?;
        let linked = fs::hard_link(&partial, &path).await;
        let _ = fs::remove_file(&partial).await;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(already_written(key));
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to store blob: {key}"),
                    e,
                ));
            }
        }

        debug!(key, bytes = data.len(), "Stored blob");
        Ok(data.len() as u64)
    }
}

fn already_written(key: &str) -> AppError {
    AppError::conflict(format!("Blob already written: {key}"))
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn issue_write_url(
        &self,
        key: &str,
        ttl: Duration,
        content_type: &str,
    ) -> AppResult<PresignedUrl> {
        Ok(self
            .signed_url(HttpMethod::Put, key, ttl, content_type)?
            .with_header("Content-Type", content_type))
    }

    async fn issue_read_url(
        &self,
        key: &str,
        ttl: Duration,
        _inline_filename: Option<&str>,
    ) -> AppResult<PresignedUrl> {
        self.signed_url(HttpMethod::Get, key, ttl, "")
    }

    async fn fetch(&self, key: &str) -> AppResult<Option<BlobObject>> {
        let path = self.resolve(key)?;
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read blob: {key}"),
                    e,
                ));
            }
        };
        let last_modified = fs::metadata(&path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        Ok(Some(BlobObject {
            key: key.to_string(),
            data: Bytes::from(data),
            content_type: None,
            last_modified,
        }))
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "Deleted blob");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete blob: {key}"),
                e,
            )),
        }
    }
}

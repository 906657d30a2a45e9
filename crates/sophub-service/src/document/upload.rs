//! Two-phase upload protocol: issue a write URL, later verify the object.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use sophub_core::config::UploadConfig;
use sophub_core::result::AppResult;
use sophub_core::traits::blob_store::validate_ttl;
use sophub_core::traits::{BlobStore, PresignedUrl};
use sophub_core::AppError;
use sophub_entity::document::{CommitDetails, DocumentKind};
use sophub_storage::sniff::effective_content_type;

/// Why an uploaded object was refused at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityFailure {
    /// Nothing was written under the key.
    Missing,
    /// The object is below the minimum size.
    TooSmall,
    /// The object's content type does not match its extension.
    ContentTypeMismatch,
}

impl IntegrityFailure {
    /// Reason code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Missing => "blob_missing",
            Self::TooSmall => "blob_too_small",
            Self::ContentTypeMismatch => "content_type_mismatch",
        }
    }

    fn into_error(self, message: impl Into<String>) -> AppError {
        AppError::integrity(self.code(), message)
    }
}

impl fmt::Display for IntegrityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Issues write and read URLs and verifies uploaded objects.
#[derive(Debug, Clone)]
pub struct UploadProtocol {
    blob_store: Arc<dyn BlobStore>,
    config: UploadConfig,
}

impl UploadProtocol {
    /// Create the protocol handler.
    pub fn new(blob_store: Arc<dyn BlobStore>, config: UploadConfig) -> Self {
        Self { blob_store, config }
    }

    /// Upload settings in effect.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Write URL for `key`, bound to the content type of `kind`.
    pub async fn issue_write(&self, key: &str, kind: DocumentKind) -> AppResult<PresignedUrl> {
        let ttl = self.config.write_url_ttl();
        validate_ttl(ttl)?;
        self.blob_store
            .issue_write_url(key, ttl, kind.mime_type())
            .await
    }

    /// Read URL for `key`, served inline under `filename`.
    pub async fn issue_read(&self, key: &str, filename: &str) -> AppResult<PresignedUrl> {
        let ttl = self.config.read_url_ttl();
        validate_ttl(ttl)?;
        self.blob_store
            .issue_read_url(key, ttl, Some(filename))
            .await
    }

    /// Fetch the object under `key` and check it is present, large enough
    /// and of a content type consistent with `kind`.
    pub async fn verify(&self, key: &str, kind: DocumentKind) -> AppResult<CommitDetails> {
        let object = self.blob_store.fetch(key).await?.ok_or_else(|| {
            IntegrityFailure::Missing.into_error(format!("No object was uploaded to '{key}'"))
        })?;

        let size = object.size();
        if size == 0 || size < self.config.min_object_bytes {
            return Err(IntegrityFailure::TooSmall.into_error(format!(
                "Object '{key}' is {size} bytes, minimum is {}",
                self.config.min_object_bytes.max(1)
            )));
        }

        let content_type = effective_content_type(object.content_type.as_deref(), &object.data)
            .filter(|ct| kind.accepts_content_type(ct))
            .ok_or_else(|| {
                IntegrityFailure::ContentTypeMismatch.into_error(format!(
                    "Object '{key}' is not a valid {kind} document (reported {})",
                    object.content_type.as_deref().unwrap_or("no content type")
                ))
            })?;

        let checksum_sha256 = hex::encode(Sha256::digest(&object.data));
        debug!(key, size, %content_type, "Verified uploaded object");

        Ok(CommitDetails {
            size_bytes: i64::try_from(size)
                .map_err(|_| AppError::validation(format!("Object '{key}' is too large")))?,
            content_type,
            checksum_sha256,
        })
    }

    /// Remove the object under `key`. `Ok(false)` when it was already gone.
    pub async fn discard(&self, key: &str) -> AppResult<bool> {
        self.blob_store.delete(key).await
    }
}

//! In-memory blob store for development and tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;

use sophub_core::result::AppResult;
use sophub_core::traits::{BlobObject, BlobStore, HttpMethod, PresignedUrl};

/// Blob store kept in a concurrent map.
///
/// Issued URLs use the `memory://` scheme and are not dereferenceable;
/// callers place bytes with [`MemoryBlobStore::put`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<DashMap<String, BlobObject>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an object as an uploader holding a write URL would.
    pub fn put(&self, key: &str, data: impl Into<Bytes>, content_type: Option<&str>) {
        self.objects.insert(
            key.to_string(),
            BlobObject {
                key: key.to_string(),
                data: data.into(),
                content_type: content_type.map(str::to_string),
                last_modified: Some(Utc::now()),
            },
        );
    }

    /// Whether an object exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn issue_write_url(
        &self,
        key: &str,
        ttl: Duration,
        content_type: &str,
    ) -> AppResult<PresignedUrl> {
        Ok(
            PresignedUrl::new(format!("memory://{key}"), HttpMethod::Put, ttl)
                .with_header("Content-Type", content_type),
        )
    }

    async fn issue_read_url(
        &self,
        key: &str,
        ttl: Duration,
        _inline_filename: Option<&str>,
    ) -> AppResult<PresignedUrl> {
        Ok(PresignedUrl::new(format!("memory://{key}"), HttpMethod::Get, ttl))
    }

    async fn fetch(&self, key: &str) -> AppResult<Option<BlobObject>> {
        Ok(self.objects.get(key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self.objects.remove(key).is_some())
    }
}

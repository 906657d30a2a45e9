//! Blob store construction from configuration.

use std::sync::Arc;

use tracing::info;

use sophub_core::config::{BlobProvider, StorageConfig};
use sophub_core::result::AppResult;
use sophub_core::traits::BlobStore;

use crate::providers::{LocalBlobStore, MemoryBlobStore};

/// The configured blob store.
///
/// `local` is set when the provider is the local filesystem, whose signed
/// URLs must be served by the API itself.
#[derive(Debug, Clone)]
pub struct ConfiguredBlobStore {
    /// Store used by the version manager.
    pub store: Arc<dyn BlobStore>,
    /// The same store, concretely typed, when it is local.
    pub local: Option<Arc<LocalBlobStore>>,
}

/// Build the blob store selected by `storage.provider`.
pub async fn build_blob_store(config: &StorageConfig) -> AppResult<ConfiguredBlobStore> {
    let configured = match config.provider {
        BlobProvider::Memory => ConfiguredBlobStore {
            store: Arc::new(MemoryBlobStore::new()),
            local: None,
        },
        BlobProvider::Local => {
            let local = Arc::new(LocalBlobStore::new(&config.local).await?);
            ConfiguredBlobStore {
                store: local.clone(),
                local: Some(local),
            }
        }
        BlobProvider::S3 => ConfiguredBlobStore {
            store: build_s3(config).await?,
            local: None,
        },
    };

    info!(
        provider = configured.store.provider_type(),
        key_prefix = %config.key_prefix,
        "Blob store ready"
    );
    Ok(configured)
}

#[cfg(feature = "s3")]
async fn build_s3(config: &StorageConfig) -> AppResult<Arc<dyn BlobStore>> {
    Ok(Arc::new(crate::providers::S3BlobStore::new(&config.s3).await?))
}

#[cfg(not(feature = "s3"))]
async fn build_s3(_config: &StorageConfig) -> AppResult<Arc<dyn BlobStore>> {
    Err(sophub_core::AppError::configuration(
        "storage.provider = \"s3\" requires the `s3` feature",
    ))
}

//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use sophub_core::config::AppConfig;
use sophub_core::traits::BlobStore;
use sophub_database::VersionStore;
use sophub_service::{UploadProtocol, VersionManager};
use sophub_storage::{ConfiguredBlobStore, LocalBlobStore};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Version manager driving every document operation
    pub version_manager: Arc<VersionManager>,
    /// Blob store used for health reporting
    pub blob_store: Arc<dyn BlobStore>,
    /// Local blob store whose signed URLs this server answers, if configured
    pub local_blobs: Option<Arc<LocalBlobStore>>,
}

impl AppState {
    /// Wire the services over a metadata store and a blob store.
    pub fn new(
        config: AppConfig,
        version_store: Arc<dyn VersionStore>,
        blobs: ConfiguredBlobStore,
    ) -> Self {
        let uploads = UploadProtocol::new(blobs.store.clone(), config.upload.clone());
        let version_manager =
            VersionManager::new(version_store, uploads, config.storage.key_prefix.clone());
        Self {
            config: Arc::new(config),
            version_manager: Arc::new(version_manager),
            blob_store: blobs.store,
            local_blobs: blobs.local,
        }
    }
}

//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod database;
pub mod logging;
pub mod storage;
pub mod upload;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::database::{DatabaseConfig, MetadataBackend, MetadataConfig};
pub use self::logging::LoggingConfig;
pub use self::storage::{BlobProvider, LocalStorageConfig, S3StorageConfig, StorageConfig};
pub use self::upload::UploadConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Postgres connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Metadata store selection.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Blob store settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload protocol settings.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files in `dir`.
    ///
    /// Merges `{dir}/default.toml` with an environment-specific overlay
    /// `{dir}/{env}.toml` and environment variables prefixed with `SOPHUB__`
    /// (for example `SOPHUB__DATABASE__URL`).
    pub fn load(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SOPHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Cross-section checks that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.metadata.backend == MetadataBackend::Postgres && self.database.url.is_empty() {
            return Err(AppError::configuration(
                "database.url is required when metadata.backend = \"postgres\"",
            ));
        }
        if self.storage.provider == BlobProvider::S3 && self.storage.s3.bucket.is_empty() {
            return Err(AppError::configuration(
                "storage.s3.bucket is required when storage.provider = \"s3\"",
            ));
        }
        if self.storage.provider == BlobProvider::Local
            && self.storage.local.signing_secret.is_empty()
        {
            return Err(AppError::configuration(
                "storage.local.signing_secret is required when storage.provider = \"local\"",
            ));
        }
        if self.upload.write_url_ttl_seconds == 0 || self.upload.read_url_ttl_seconds == 0 {
            return Err(AppError::configuration("upload URL TTLs must be non-zero"));
        }
        if self.upload.min_object_bytes == 0 {
            return Err(AppError::configuration(
                "upload.min_object_bytes must be at least 1",
            ));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(AppError::configuration(
                "upload.allowed_extensions must list at least one extension",
            ));
        }
        Ok(())
    }
}

//! Blob store configuration.

use serde::{Deserialize, Serialize};

/// Which blob store provider backs document bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobProvider {
    /// S3-compatible object store (AWS, MinIO, Supabase storage S3 gateway).
    S3,
    /// Local filesystem, with signed URLs served by this server.
    Local,
    /// Process-local map, for development and tests.
    #[default]
    Memory,
}

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Active provider.
    #[serde(default)]
    pub provider: BlobProvider,
    /// Prefix prepended to every storage key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Local filesystem storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// S3-compatible storage configuration.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: BlobProvider::default(),
            key_prefix: default_key_prefix(),
            local: LocalStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root path for local blob storage.
    #[serde(default = "default_local_root")]
    pub root_path: String,
    /// Externally reachable base URL of this server, used to build signed
    /// URLs (for example `http://localhost:3000`).
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// HMAC secret for signing blob URLs.
    #[serde(default)]
    pub signing_secret: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
            public_base_url: default_public_base_url(),
            signing_secret: String::new(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StorageConfig {
    /// S3 endpoint URL (for non-AWS services like MinIO). Empty uses AWS.
    #[serde(default)]
    pub endpoint: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// S3 bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key ID. Empty falls back to the default credential chain.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Use path-style addressing (required by most S3-compatible servers).
    #[serde(default)]
    pub force_path_style: bool,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            force_path_style: false,
        }
    }
}

fn default_key_prefix() -> String {
    "sops".to_string()
}

fn default_local_root() -> String {
    "./data/blobs".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

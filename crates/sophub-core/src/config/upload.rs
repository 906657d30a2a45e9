//! Upload protocol configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the two-phase upload handoff and signed reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Lifetime of a pre-signed write URL in seconds.
    #[serde(default = "default_write_ttl")]
    pub write_url_ttl_seconds: u64,
    /// Lifetime of a pre-signed read URL in seconds.
    #[serde(default = "default_read_ttl")]
    pub read_url_ttl_seconds: u64,
    /// Objects smaller than this are rejected at commit.
    #[serde(default = "default_min_bytes")]
    pub min_object_bytes: u64,
    /// Extensions accepted at initiate and replace (lowercase, no dot).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            write_url_ttl_seconds: default_write_ttl(),
            read_url_ttl_seconds: default_read_ttl(),
            min_object_bytes: default_min_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl UploadConfig {
    /// Write URL lifetime.
    pub fn write_url_ttl(&self) -> Duration {
        Duration::from_secs(self.write_url_ttl_seconds)
    }

    /// Read URL lifetime.
    pub fn read_url_ttl(&self) -> Duration {
        Duration::from_secs(self.read_url_ttl_seconds)
    }

    /// Whether an already-normalized extension may be uploaded.
    pub fn is_extension_allowed(&self, ext: &str) -> bool {
        self.allowed_extensions.iter().any(|allowed| allowed == ext)
    }
}

fn default_write_ttl() -> u64 {
    900
}

fn default_read_ttl() -> u64 {
    600
}

fn default_min_bytes() -> u64 {
    200
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["pdf".to_string(), "docx".to_string()]
}

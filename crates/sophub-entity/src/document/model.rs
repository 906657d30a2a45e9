//! Document version entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::state::VersionState;

/// One physical upload attempt of an SOP document.
///
/// Versions are stored flat and keyed by `id`. History is the weak
/// `prev_version_id` back-reference; `lineage_id` tags every version of the
/// same document so "the active version of this lineage" is a single
/// indexed lookup instead of a chain walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DocumentVersion {
    /// Unique version identifier.
    pub id: Uuid,
    /// Identifier shared by all versions of one document.
    pub lineage_id: Uuid,
    /// Machine the document is attached to.
    pub machine_name: String,
    /// Owning department.
    pub department: String,
    /// File name as uploaded (including extension).
    pub filename: String,
    /// Normalized extension without the dot.
    pub extension: String,
    /// Location of the bytes in the blob store.
    pub storage_key: String,
    /// Current state.
    pub state: VersionState,
    /// The version this one superseded, if any.
    pub prev_version_id: Option<Uuid>,
    /// Verified object size, set at commit.
    pub size_bytes: Option<i64>,
    /// Verified content type, set at commit.
    pub content_type: Option<String>,
    /// SHA-256 of the verified object (hex), set at commit.
    pub checksum_sha256: Option<String>,
    /// Who initiated the upload.
    pub uploaded_by: String,
    /// Who last changed the record.
    pub updated_by: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
    /// When the upload was verified and activated.
    pub committed_at: Option<DateTime<Utc>>,
}

impl DocumentVersion {
    /// Whether this is the current version of its lineage.
    pub fn is_active(&self) -> bool {
        self.state == VersionState::Active
    }

    /// Whether the upload is still unverified.
    pub fn is_pending(&self) -> bool {
        self.state == VersionState::Pending
    }

    /// Whether a predecessor exists to restore.
    pub fn has_history(&self) -> bool {
        self.prev_version_id.is_some()
    }
}

/// Data required to create a new `PENDING` version record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocumentVersion {
    /// Pre-generated identifier (the storage key embeds it).
    pub id: Uuid,
    /// Lineage the version belongs to.
    pub lineage_id: Uuid,
    /// Machine the document is attached to.
    pub machine_name: String,
    /// Owning department.
    pub department: String,
    /// File name.
    pub filename: String,
    /// Normalized extension.
    pub extension: String,
    /// Blob store key.
    pub storage_key: String,
    /// Superseded version for a replace.
    pub prev_version_id: Option<Uuid>,
    /// Who initiated the upload.
    pub uploaded_by: String,
    /// Who last changed the record.
    pub updated_by: String,
}

impl NewDocumentVersion {
    /// Materialize the record as a freshly inserted `PENDING` row.
    pub fn into_pending(self, now: DateTime<Utc>) -> DocumentVersion {
        DocumentVersion {
            id: self.id,
            lineage_id: self.lineage_id,
            machine_name: self.machine_name,
            department: self.department,
            filename: self.filename,
            extension: self.extension,
            storage_key: self.storage_key,
            state: VersionState::Pending,
            prev_version_id: self.prev_version_id,
            size_bytes: None,
            content_type: None,
            checksum_sha256: None,
            uploaded_by: self.uploaded_by,
            updated_by: self.updated_by,
            created_at: now,
            updated_at: now,
            committed_at: None,
        }
    }
}

/// Facts about the verified object recorded on `PENDING -> ACTIVE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetails {
    /// Object size in bytes.
    pub size_bytes: i64,
    /// Content type the object was accepted as.
    pub content_type: String,
    /// SHA-256 of the object (hex).
    pub checksum_sha256: String,
}

/// Build the blob store key for a version: `{prefix}/{id}/{filename}`.
pub fn storage_key(prefix: &str, id: Uuid, filename: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{id}/{filename}")
    } else {
        format!("{prefix}/{id}/{filename}")
    }
}

//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use sophub_core::AppError;
use sophub_entity::document::{VersionFilter, VersionState};
use sophub_service::{InitiateUpload, ReplaceUpload};

/// Body of `POST /api/sops/sign-upload`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignUploadRequest {
    /// Machine the document belongs to.
    #[validate(length(min = 1, max = 255, message = "machine_name is required"))]
    pub machine_name: String,
    /// Owning department.
    #[validate(length(min = 1, max = 255, message = "department is required"))]
    pub department: String,
    /// File name.
    #[validate(length(min = 1, max = 255, message = "filename is required"))]
    pub filename: String,
    /// Extension (`pdf` or `docx`).
    #[validate(length(min = 1, max = 16, message = "ext is required"))]
    pub ext: String,
    /// Uploader.
    #[validate(length(min = 1, max = 255, message = "uploaded_by is required"))]
    pub uploaded_by: String,
    /// Last editor; defaults to the uploader.
    pub updated_by: Option<String>,
}

impl From<SignUploadRequest> for InitiateUpload {
    fn from(req: SignUploadRequest) -> Self {
        Self {
            machine_name: req.machine_name,
            department: req.department,
            filename: req.filename,
            extension: req.ext,
            uploaded_by: req.uploaded_by,
            updated_by: req.updated_by,
        }
    }
}

/// Body of `POST /api/sops/commit`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CommitRequest {
    /// Version to commit.
    #[serde(alias = "fileId")]
    pub version_id: Uuid,
}

/// Body of `POST /api/sops/replace/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReplaceRequest {
    /// File name of the replacement.
    #[validate(length(min = 1, max = 255, message = "filename is required"))]
    pub filename: String,
    /// Extension (`pdf` or `docx`).
    #[validate(length(min = 1, max = 16, message = "ext is required"))]
    pub ext: String,
    /// Uploader.
    #[validate(length(min = 1, max = 255, message = "uploaded_by is required"))]
    pub uploaded_by: String,
    /// Last editor; defaults to the uploader.
    pub updated_by: Option<String>,
}

impl From<ReplaceRequest> for ReplaceUpload {
    fn from(req: ReplaceRequest) -> Self {
        Self {
            filename: req.filename,
            extension: req.ext,
            uploaded_by: req.uploaded_by,
            updated_by: req.updated_by,
        }
    }
}

/// Query of `GET /api/sops/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// State to list; `active` when absent.
    pub state: Option<String>,
    /// Machine name filter.
    pub machine_name: Option<String>,
    /// Department filter.
    pub department: Option<String>,
}

impl ListQuery {
    /// Convert into a store filter, defaulting to active versions.
    pub fn into_filter(self) -> Result<VersionFilter, AppError> {
        let state = match self.state.as_deref().map(str::trim) {
            None | Some("") => VersionState::Active,
            Some(raw) => raw.parse()?,
        };
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(VersionFilter {
            state: Some(state),
            machine_name: non_empty(self.machine_name),
            department: non_empty(self.department),
            lineage_id: None,
        })
    }
}

/// Query string of a signed local blob URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobQuery {
    /// Expiry as unix seconds.
    pub expires: i64,
    /// Base64url HMAC signature.
    pub signature: String,
}

//! Version manager: the only place document version states change.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use sophub_core::result::AppResult;
use sophub_core::traits::PresignedUrl;
use sophub_core::{AppError, ErrorKind};
use sophub_database::VersionStore;
use sophub_entity::document::kind::normalize_extension;
use sophub_entity::document::model::storage_key;
use sophub_entity::document::{
    DocumentKind, DocumentVersion, NewDocumentVersion, VersionFilter, VersionState,
};

use super::upload::UploadProtocol;

/// Metadata for the first upload of a new document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateUpload {
    /// Machine the document belongs to.
    pub machine_name: String,
    /// Owning department.
    pub department: String,
    /// Plain file name.
    pub filename: String,
    /// Extension, with or without a leading dot.
    pub extension: String,
    /// Uploader.
    pub uploaded_by: String,
    /// Last editor; defaults to the uploader.
    pub updated_by: Option<String>,
}

/// Metadata for a replacement upload. Machine and department come from
/// the version being replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceUpload {
    /// Plain file name.
    pub filename: String,
    /// Extension, with or without a leading dot.
    pub extension: String,
    /// Uploader.
    pub uploaded_by: String,
    /// Last editor; defaults to the uploader.
    pub updated_by: Option<String>,
}

/// A new `Pending` version together with the URL to upload its bytes to.
#[derive(Debug, Clone)]
pub struct UploadTicket {
    /// The pending record.
    pub version: DocumentVersion,
    /// Pre-signed write URL for `version.storage_key`.
    pub upload: PresignedUrl,
}

/// A pre-signed read URL for a version.
#[derive(Debug, Clone)]
pub struct SignedRead {
    /// The version being read.
    pub version: DocumentVersion,
    /// Pre-signed read URL.
    pub download: PresignedUrl,
}

/// Orchestrates the metadata store and the blob store.
#[derive(Debug, Clone)]
pub struct VersionManager {
    store: Arc<dyn VersionStore>,
    uploads: UploadProtocol,
    key_prefix: String,
}

fn require(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn plain_filename(filename: &str) -> AppResult<String> {
    let filename = require("filename", filename)?;
    if filename == "." || filename == ".." || filename.contains(['/', '\\']) {
        return Err(AppError::validation(format!(
            "filename '{filename}' must be a plain file name"
        )));
    }
    Ok(filename)
}

fn not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("Document version {id} not found"))
}

impl VersionManager {
    /// Create a manager. `key_prefix` is the first segment of every
    /// storage key.
    pub fn new(
        store: Arc<dyn VersionStore>,
        uploads: UploadProtocol,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            uploads,
            key_prefix: key_prefix.into(),
        }
    }

    /// Normalize and check an extension against the allowed list.
    fn document_kind(&self, extension: &str) -> AppResult<(String, DocumentKind)> {
        let extension = normalize_extension(&require("extension", extension)?);
        if !self.uploads.config().is_extension_allowed(&extension) {
            return Err(AppError::validation(format!(
                "Extension '{extension}' is not allowed"
            )));
        }
        let kind = DocumentKind::from_extension(&extension)?;
        Ok((extension, kind))
    }

    async fn load(&self, id: Uuid) -> AppResult<DocumentVersion> {
        self.store.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    /// Start the first version of a new document.
    ///
    /// The write URL is issued before the record is created, so a signing
    /// failure leaves nothing behind.
    pub async fn initiate(&self, request: InitiateUpload) -> AppResult<UploadTicket> {
        let machine_name = require("machine_name", &request.machine_name)?;
        let department = require("department", &request.department)?;
        let filename = plain_filename(&request.filename)?;
        let (extension, kind) = self.document_kind(&request.extension)?;
        let uploaded_by = require("uploaded_by", &request.uploaded_by)?;
        let updated_by = request
            .updated_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| uploaded_by.clone(), str::to_string);

        let id = Uuid::new_v4();
        let key = storage_key(&self.key_prefix, id, &filename);
        let upload = self.uploads.issue_write(&key, kind).await?;

        let version = self
            .store
            .insert(NewDocumentVersion {
                id,
                lineage_id: Uuid::new_v4(),
                machine_name,
                department,
                filename,
                extension,
                storage_key: key,
                prev_version_id: None,
                uploaded_by,
                updated_by,
            })
            .await?;

        info!(
            version_id = %version.id,
            lineage_id = %version.lineage_id,
            storage_key = %version.storage_key,
            machine_name = %version.machine_name,
            "Upload initiated"
        );
        Ok(UploadTicket { version, upload })
    }

    /// Verify the uploaded object and make the version current.
    ///
    /// Committing an already active version is a no-op. A failed check
    /// leaves the record pending so the commit can be retried.
    pub async fn commit(&self, id: Uuid) -> AppResult<DocumentVersion> {
        let version = self.load(id).await?;
        match version.state {
            VersionState::Active => {
                debug!(version_id = %id, "Commit of active version is a no-op");
                return Ok(version);
            }
            VersionState::Pending => {}
            state => {
                return Err(AppError::conflict(format!(
                    "Document version {id} is {state} and cannot be committed"
                )));
            }
        }

        let kind = DocumentKind::from_extension(&version.extension)?;
        let details = match self.uploads.verify(&version.storage_key, kind).await {
            Ok(details) => details,
            Err(e) => {
                warn!(
                    version_id = %id,
                    storage_key = %version.storage_key,
                    reason = e.code.unwrap_or("unknown"),
                    "Upload verification failed"
                );
                return Err(e);
            }
        };

        match self.store.activate(id, &details).await {
            Ok(active) => {
                info!(
                    version_id = %id,
                    lineage_id = %active.lineage_id,
                    size_bytes = details.size_bytes,
                    "Version committed"
                );
                Ok(active)
            }
            Err(e) if e.is(ErrorKind::Conflict) => {
                // Another commit may have won; that outcome is still a success.
                match self.store.find_by_id(id).await? {
                    Some(current) if current.is_active() => Ok(current),
                    _ => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Archive the active version `active_id` and start its successor.
    pub async fn replace(
        &self,
        active_id: Uuid,
        request: ReplaceUpload,
    ) -> AppResult<UploadTicket> {
        let filename = plain_filename(&request.filename)?;
        let (extension, kind) = self.document_kind(&request.extension)?;
        let uploaded_by = require("uploaded_by", &request.uploaded_by)?;
        let updated_by = request
            .updated_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| uploaded_by.clone(), str::to_string);

        let current = self.load(active_id).await?;
        if !current.is_active() {
            return Err(AppError::conflict(format!(
                "Document version {active_id} is {} and cannot be replaced",
                current.state
            )));
        }

        let id = Uuid::new_v4();
        let key = storage_key(&self.key_prefix, id, &filename);
        let upload = self.uploads.issue_write(&key, kind).await?;

        let (archived, version) = self
            .store
            .replace(
                active_id,
                NewDocumentVersion {
                    id,
                    lineage_id: current.lineage_id,
                    machine_name: current.machine_name,
                    department: current.department,
                    filename,
                    extension,
                    storage_key: key,
                    prev_version_id: Some(active_id),
                    uploaded_by,
                    updated_by,
                },
            )
            .await?;

        info!(
            version_id = %version.id,
            archived_id = %archived.id,
            lineage_id = %version.lineage_id,
            storage_key = %version.storage_key,
            "Version replaced"
        );
        Ok(UploadTicket { version, upload })
    }

    /// Drop the active version `active_id` and bring back its predecessor.
    ///
    /// The metadata change commits first; the dropped version's object is
    /// deleted afterwards. A failed delete leaves an orphaned object and is
    /// only logged.
    pub async fn restore(&self, active_id: Uuid) -> AppResult<DocumentVersion> {
        let outcome = self.store.restore(active_id).await?;
        info!(
            deleted_id = %outcome.deleted.id,
            version_id = %outcome.promoted.id,
            lineage_id = %outcome.promoted.lineage_id,
            "Version restored"
        );

        let key = &outcome.deleted.storage_key;
        match self.uploads.discard(key).await {
            Ok(true) => debug!(storage_key = %key, "Deleted object of removed version"),
            Ok(false) => debug!(storage_key = %key, "Object of removed version was already gone"),
            Err(e) => warn!(
                storage_key = %key,
                version_id = %outcome.deleted.id,
                error = %e,
                "Failed to delete object of removed version; leaving orphan"
            ),
        }
        Ok(outcome.promoted)
    }

    /// Versions matching `filter`, most recently updated first.
    pub async fn list(&self, filter: &VersionFilter) -> AppResult<Vec<DocumentVersion>> {
        self.store.list(filter).await
    }

    /// One version by id.
    pub async fn get(&self, id: Uuid) -> AppResult<DocumentVersion> {
        self.load(id).await
    }

    /// Every version in the lineage of `id`, most recently updated first.
    pub async fn history(&self, id: Uuid) -> AppResult<Vec<DocumentVersion>> {
        let version = self.load(id).await?;
        self.store
            .list(&VersionFilter::lineage(version.lineage_id))
            .await
    }

    /// A read URL for a committed version. Pending versions may not have
    /// any bytes yet and are refused.
    pub async fn signed_read(&self, id: Uuid) -> AppResult<SignedRead> {
        let version = self.load(id).await?;
        if version.is_pending() {
            return Err(AppError::conflict(format!(
                "Document version {id} has not been committed"
            )));
        }
        let download = self
            .uploads
            .issue_read(&version.storage_key, &version.filename)
            .await?;
        Ok(SignedRead { version, download })
    }

    /// Check the metadata store. Used by the health endpoint.
    pub async fn store_healthy(&self) -> bool {
        self.store.health_check().await.unwrap_or(false)
    }

    /// Metadata store backend name.
    pub fn store_backend(&self) -> &str {
        self.store.backend()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sophub_core::config::UploadConfig;
    use sophub_core::traits::{BlobObject, BlobStore};
    use sophub_database::MemoryVersionStore;
    use sophub_storage::MemoryBlobStore;

    use super::*;

    struct Fixture {
        blobs: MemoryBlobStore,
        store: Arc<MemoryVersionStore>,
        manager: VersionManager,
    }

    fn fixture() -> Fixture {
        let blobs = MemoryBlobStore::new();
        let store = Arc::new(MemoryVersionStore::new());
        let uploads = UploadProtocol::new(Arc::new(blobs.clone()), UploadConfig::default());
        let manager = VersionManager::new(store.clone(), uploads, "sops");
        Fixture {
            blobs,
            store,
            manager,
        }
    }

    fn pdf(len: usize) -> Vec<u8> {
        let mut data = b"%PDF-1.4\n".to_vec();
        data.resize(len, b'0');
        data
    }

    fn initiate_request(filename: &str) -> InitiateUpload {
        InitiateUpload {
            machine_name: "M1".into(),
            department: "A".into(),
            filename: filename.into(),
            extension: "pdf".into(),
            uploaded_by: "op@example.com".into(),
            updated_by: None,
        }
    }

    fn replace_request(filename: &str) -> ReplaceUpload {
        ReplaceUpload {
            filename: filename.into(),
            extension: "pdf".into(),
            uploaded_by: "op@example.com".into(),
            updated_by: Some("lead@example.com".into()),
        }
    }

    impl Fixture {
        async fn committed(&self, filename: &str) -> DocumentVersion {
            let ticket = self.manager.initiate(initiate_request(filename)).await.unwrap();
            self.blobs.put(&ticket.version.storage_key, pdf(500), None);
            self.manager.commit(ticket.version.id).await.unwrap()
        }

        async fn active_in_lineage(&self, lineage_id: Uuid) -> Vec<DocumentVersion> {
            let mut filter = VersionFilter::lineage(lineage_id);
            filter.state = Some(VersionState::Active);
            self.store.list(&filter).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_full_lifecycle_scenario() {
        let fx = fixture();

        let t1 = fx.manager.initiate(initiate_request("f.pdf")).await.unwrap();
        let v1 = t1.version.id;
        assert_eq!(t1.version.state, VersionState::Pending);
        assert_eq!(t1.version.storage_key, format!("sops/{v1}/f.pdf"));

        fx.blobs.put(&t1.version.storage_key, pdf(500), None);
        let committed = fx.manager.commit(v1).await.unwrap();
        assert_eq!(committed.state, VersionState::Active);
        assert_eq!(committed.size_bytes, Some(500));

        let t2 = fx.manager.replace(v1, replace_request("f2.pdf")).await.unwrap();
        let v2 = t2.version.id;
        assert_eq!(t2.version.prev_version_id, Some(v1));
        assert_eq!(t2.version.updated_by, "lead@example.com");
        assert_eq!(fx.manager.get(v1).await.unwrap().state, VersionState::Archived);

        fx.blobs.put(&t2.version.storage_key, pdf(600), None);
        assert!(fx.manager.commit(v2).await.unwrap().is_active());

        let promoted = fx.manager.restore(v2).await.unwrap();
        assert_eq!(promoted.id, v1);
        assert!(promoted.is_active());
        assert!(promoted.prev_version_id.is_none());
        assert!(fx.manager.get(v2).await.unwrap_err().is(ErrorKind::NotFound));
        assert!(!fx.blobs.contains(&t2.version.storage_key));
        assert!(fx.blobs.contains(&t1.version.storage_key));

        let active = fx.active_in_lineage(t1.version.lineage_id).await;
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_restore_without_history() {
        let fx = fixture();
        let v1 = fx.committed("f.pdf").await;

        let err = fx.manager.restore(v1.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoHistory);
        assert_eq!(fx.manager.get(v1.id).await.unwrap(), v1);
        assert!(fx.blobs.contains(&v1.storage_key));
    }

    /// Blob store whose deletes always fail.
    #[derive(Debug)]
    struct UndeletableBlobs(MemoryBlobStore);

    #[async_trait::async_trait]
    impl BlobStore for UndeletableBlobs {
        fn provider_type(&self) -> &str {
            "undeletable"
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
            self.0.issue_write_url(key, ttl, content_type).await
        }

        async fn issue_read_url(
            &self,
            key: &str,
            ttl: Duration,
            inline_filename: Option<&str>,
        ) -> AppResult<PresignedUrl> {
            self.0.issue_read_url(key, ttl, inline_filename).await
        }

        async fn fetch(&self, key: &str) -> AppResult<Option<BlobObject>> {
            self.0.fetch(key).await
        }

        async fn delete(&self, key: &str) -> AppResult<bool> {
            Err(AppError::storage(format!("delete refused: {key}")))
        }
    }

    #[tokio::test]
    async fn test_restore_survives_failed_blob_delete() {
        let blobs = MemoryBlobStore::new();
        let store = Arc::new(MemoryVersionStore::new());
        let uploads = UploadProtocol::new(
            Arc::new(UndeletableBlobs(blobs.clone())),
            UploadConfig::default(),
        );
        let manager = VersionManager::new(store.clone(), uploads, "sops");

        let t1 = manager.initiate(initiate_request("f.pdf")).await.unwrap();
        blobs.put(&t1.version.storage_key, pdf(500), None);
        manager.commit(t1.version.id).await.unwrap();
        let t2 = manager
            .replace(t1.version.id, replace_request("f2.pdf"))
            .await
            .unwrap();
        blobs.put(&t2.version.storage_key, pdf(500), None);
        manager.commit(t2.version.id).await.unwrap();

        let promoted = manager.restore(t2.version.id).await.unwrap();
        assert_eq!(promoted.id, t1.version.id);
        assert!(promoted.is_active());
        assert!(promoted.prev_version_id.is_none());

        let err = manager.get(t2.version.id).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
        assert!(manager.get(t1.version.id).await.unwrap().is_active());
        // The object of the removed version is left behind
        assert!(blobs.contains(&t2.version.storage_key));
    }

    #[tokio::test]
    async fn test_restore_of_archived_or_missing() {
        let fx = fixture();
        let v1 = fx.committed("f.pdf").await;
        fx.manager.replace(v1.id, replace_request("g.pdf")).await.unwrap();

        let err = fx.manager.restore(v1.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        let err = fx.manager.restore(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_commit_retry_after_missing_blob() {
        let fx = fixture();
        let ticket = fx.manager.initiate(initiate_request("f.pdf")).await.unwrap();
        let id = ticket.version.id;

        let err = fx.manager.commit(id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Integrity);
        assert_eq!(err.code, Some("blob_missing"));
        assert!(fx.manager.get(id).await.unwrap().is_pending());

        fx.blobs.put(&ticket.version.storage_key, pdf(250), None);
        let committed = fx.manager.commit(id).await.unwrap();
        assert!(committed.is_active());
        assert!(committed.checksum_sha256.is_some());
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_active_untouched() {
        let fx = fixture();
        let v1 = fx.committed("f.pdf").await;
        let t2 = fx.manager.replace(v1.id, replace_request("f2.pdf")).await.unwrap();
        fx.blobs.put(&t2.version.storage_key, pdf(100), None);

        let err = fx.manager.commit(t2.version.id).await.unwrap_err();
        assert_eq!(err.code, Some("blob_too_small"));
        assert!(fx.manager.get(t2.version.id).await.unwrap().is_pending());
        assert_eq!(
            fx.manager.get(v1.id).await.unwrap().state,
            VersionState::Archived
        );
    }

    #[tokio::test]
    async fn test_commit_is_idempotent_and_archived_conflicts() {
        let fx = fixture();
        let v1 = fx.committed("f.pdf").await;

        let again = fx.manager.commit(v1.id).await.unwrap();
        assert_eq!(again, v1);

        fx.manager.replace(v1.id, replace_request("f2.pdf")).await.unwrap();
        let err = fx.manager.commit(v1.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err = fx.manager.commit(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_replace_requires_active() {
        let fx = fixture();
        let ticket = fx.manager.initiate(initiate_request("f.pdf")).await.unwrap();

        let err = fx
            .manager
            .replace(ticket.version.id, replace_request("g.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err = fx
            .manager
            .replace(Uuid::new_v4(), replace_request("g.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_concurrent_replace_has_one_winner() {
        let fx = fixture();
        let v1 = fx.committed("f.pdf").await;

        let (a, b) = tokio::join!(
            fx.manager.replace(v1.id, replace_request("a.pdf")),
            fx.manager.replace(v1.id, replace_request("b.pdf")),
        );
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(loser.kind, ErrorKind::Conflict);

        let winner = outcomes.iter().find_map(|r| r.as_ref().ok()).unwrap();
        fx.blobs.put(&winner.version.storage_key, pdf(300), None);
        fx.manager.commit(winner.version.id).await.unwrap();
        assert_eq!(fx.active_in_lineage(v1.lineage_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_initiate_validation() {
        let fx = fixture();

        let mut missing = initiate_request("f.pdf");
        missing.machine_name = "  ".into();
        let mut nested = initiate_request("../f.pdf");
        nested.filename = "../f.pdf".into();
        let mut exe = initiate_request("f.exe");
        exe.extension = "exe".into();

        for request in [missing, nested, exe] {
            let err = fx.manager.initiate(request).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }
        assert!(fx.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_initiate_normalizes_extension_and_defaults_editor() {
        let fx = fixture();
        let mut request = initiate_request("f.docx");
        request.extension = ".DOCX".into();

        let ticket = fx.manager.initiate(request).await.unwrap();
        assert_eq!(ticket.version.extension, "docx");
        assert_eq!(ticket.version.updated_by, "op@example.com");
        assert_eq!(
            ticket.upload.headers[0].1,
            DocumentKind::Docx.mime_type()
        );
    }

    #[tokio::test]
    async fn test_signed_read_refuses_pending() {
        let fx = fixture();
        let ticket = fx.manager.initiate(initiate_request("f.pdf")).await.unwrap();

        let err = fx.manager.signed_read(ticket.version.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        fx.blobs.put(&ticket.version.storage_key, pdf(500), None);
        fx.manager.commit(ticket.version.id).await.unwrap();
        let read = fx.manager.signed_read(ticket.version.id).await.unwrap();
        assert_eq!(read.version.filename, "f.pdf");
        assert!(read.download.url.ends_with(&ticket.version.storage_key));
    }

    #[tokio::test]
    async fn test_history_lists_lineage() {
        let fx = fixture();
        let v1 = fx.committed("f.pdf").await;
        let other = fx.committed("other.pdf").await;
        let t2 = fx.manager.replace(v1.id, replace_request("f2.pdf")).await.unwrap();

        let history = fx.manager.history(t2.version.id).await.unwrap();
        let ids: Vec<Uuid> = history.iter().map(|v| v.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&v1.id) && ids.contains(&t2.version.id));
        assert!(!ids.contains(&other.id));

        let listed = fx.manager.list(&VersionFilter::active()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, other.id);
    }
}

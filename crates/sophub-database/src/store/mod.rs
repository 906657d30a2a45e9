//! Metadata store contract for document versions.
//!
//! Every state change is a compare-and-swap on `state`: the write only
//! lands when the record is still in the expected state, so a caller that
//! lost a race sees a `Conflict` instead of overwriting someone else's
//! transition. `replace` and `restore` apply two such writes atomically.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use sophub_core::result::AppResult;
use sophub_core::AppError;
use sophub_entity::document::{
    CommitDetails, DocumentVersion, NewDocumentVersion, VersionFilter, VersionState,
};

pub use memory::MemoryVersionStore;
pub use postgres::PgVersionStore;

/// Result of a successful restore.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    /// The record that was removed, reported with state `Deleted`.
    pub deleted: DocumentVersion,
    /// The predecessor, now `Active` with no back-reference.
    pub promoted: DocumentVersion,
}

/// Durable storage of document version records.
#[async_trait]
pub trait VersionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Backend name for logs and health output.
    fn backend(&self) -> &str;

    /// Check that the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Insert a new `Pending` record. A duplicate id or storage key is a
    /// `Conflict`.
    async fn insert(&self, version: NewDocumentVersion) -> AppResult<DocumentVersion>;

    /// Look up one record.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DocumentVersion>>;

    /// Records matching `filter`, most recently updated first.
    async fn list(&self, filter: &VersionFilter) -> AppResult<Vec<DocumentVersion>>;

    /// `Pending -> Active`, recording the verified object details.
    ///
    /// Fails with `NotFound` when the record is gone and `Conflict` when it
    /// is no longer pending or its lineage already has an active record.
    async fn activate(&self, id: Uuid, details: &CommitDetails) -> AppResult<DocumentVersion>;

    /// Atomically archive the active record `active_id` and insert `next`
    /// as its `Pending` successor.
    ///
    /// The store links `next` to the archived record: lineage, machine and
    /// department are inherited and `prev_version_id` is set to
    /// `active_id`, whatever the caller supplied. Returns
    /// `(archived, inserted)`.
    async fn replace(
        &self,
        active_id: Uuid,
        next: NewDocumentVersion,
    ) -> AppResult<(DocumentVersion, DocumentVersion)>;

    /// Atomically delete the active record `active_id` and promote its
    /// predecessor from `Archived` to `Active`, clearing the predecessor's
    /// back-reference.
    ///
    /// `NotFound` when either record is missing, `Conflict` when either is in
    /// the wrong state, `NoHistory` when `active_id` has no predecessor.
    /// Nothing changes on failure.
    async fn restore(&self, active_id: Uuid) -> AppResult<RestoreOutcome>;
}

/// Error for a compare-and-swap that matched no row: either the record is
/// gone or it sits in a state other than `expected`.
pub(crate) fn cas_miss(
    id: Uuid,
    expected: VersionState,
    current: Option<&DocumentVersion>,
) -> AppError {
    match current {
        None => AppError::not_found(format!("Document version {id} not found")),
        Some(version) => AppError::conflict(format!(
            "Document version {id} is {}, expected {expected}",
            version.state
        )),
    }
}

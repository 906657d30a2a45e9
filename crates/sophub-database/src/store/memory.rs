//! In-memory version store.
//!
//! All mutations take one async mutex, which serves as the transaction for
//! `replace` and `restore`: checks and writes happen under the same guard,
//! so no other caller observes the intermediate state.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use sophub_core::result::AppResult;
use sophub_core::AppError;
use sophub_entity::document::{
    CommitDetails, DocumentVersion, NewDocumentVersion, VersionFilter, VersionState,
};

use super::{cas_miss, RestoreOutcome, VersionStore};

/// Version store kept in process memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    records: Mutex<HashMap<Uuid, DocumentVersion>>,
}

impl MemoryVersionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

fn check_insert(
    records: &HashMap<Uuid, DocumentVersion>,
    version: &NewDocumentVersion,
) -> AppResult<()> {
    if records.contains_key(&version.id) {
        return Err(AppError::conflict(format!(
            "Document version {} already exists",
            version.id
        )));
    }
    if records.values().any(|v| v.storage_key == version.storage_key) {
        return Err(AppError::conflict(format!(
            "Storage key '{}' is already in use",
            version.storage_key
        )));
    }
    Ok(())
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn insert(&self, version: NewDocumentVersion) -> AppResult<DocumentVersion> {
        let mut records = self.records.lock().await;
        check_insert(&records, &version)?;
        let record = version.into_pending(Utc::now());
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DocumentVersion>> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn list(&self, filter: &VersionFilter) -> AppResult<Vec<DocumentVersion>> {
        let records = self.records.lock().await;
        let mut matched: Vec<DocumentVersion> = records
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(matched)
    }

    async fn activate(&self, id: Uuid, details: &CommitDetails) -> AppResult<DocumentVersion> {
        let mut records = self.records.lock().await;

        let lineage_id = match records.get(&id) {
            Some(v) if v.is_pending() => v.lineage_id,
            other => return Err(cas_miss(id, VersionState::Pending, other)),
        };
        if records
            .values()
            .any(|v| v.lineage_id == lineage_id && v.is_active())
        {
            return Err(AppError::conflict(format!(
                "Lineage {lineage_id} already has an active version"
            )));
        }

        let now = Utc::now();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Document version {id} not found")))?;
        record.state = VersionState::Active;
        record.size_bytes = Some(details.size_bytes);
        record.content_type = Some(details.content_type.clone());
        record.checksum_sha256 = Some(details.checksum_sha256.clone());
        record.committed_at = Some(now);
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn replace(
        &self,
        active_id: Uuid,
        mut next: NewDocumentVersion,
    ) -> AppResult<(DocumentVersion, DocumentVersion)> {
        let mut records = self.records.lock().await;

        let active = match records.get(&active_id) {
            Some(v) if v.is_active() => v.clone(),
            other => return Err(cas_miss(active_id, VersionState::Active, other)),
        };
        next.lineage_id = active.lineage_id;
        next.machine_name = active.machine_name.clone();
        next.department = active.department.clone();
        next.prev_version_id = Some(active.id);
        check_insert(&records, &next)?;

        let now = Utc::now();
        let archived = DocumentVersion {
            state: VersionState::Archived,
            updated_by: next.updated_by.clone(),
            updated_at: now,
            ..active
        };
        let inserted = next.into_pending(now);
        records.insert(archived.id, archived.clone());
        records.insert(inserted.id, inserted.clone());
        Ok((archived, inserted))
    }

    async fn restore(&self, active_id: Uuid) -> AppResult<RestoreOutcome> {
        let mut records = self.records.lock().await;

        let current = match records.get(&active_id) {
            Some(v) if v.is_active() => v.clone(),
            other => return Err(cas_miss(active_id, VersionState::Active, other)),
        };
        let Some(prev_id) = current.prev_version_id else {
            return Err(AppError::no_history(format!(
                "Document version {active_id} has no previous version to restore"
            )));
        };
        match records.get(&prev_id) {
            Some(prev) if prev.state == VersionState::Archived => {}
            other => return Err(cas_miss(prev_id, VersionState::Archived, other)),
        }

        records.remove(&active_id);
        let promoted = records
            .get_mut(&prev_id)
            .ok_or_else(|| AppError::not_found(format!("Document version {prev_id} not found")))?;
        promoted.state = VersionState::Active;
        promoted.prev_version_id = None;
        promoted.updated_at = Utc::now();
        let promoted = promoted.clone();

        let deleted = DocumentVersion {
            state: VersionState::Deleted,
            ..current
        };
        Ok(RestoreOutcome { deleted, promoted })
    }
}

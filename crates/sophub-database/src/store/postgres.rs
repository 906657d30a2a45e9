//! PostgreSQL version store.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use sophub_core::error::{AppError, ErrorKind};
use sophub_core::result::AppResult;
use sophub_entity::document::{
    CommitDetails, DocumentVersion, NewDocumentVersion, VersionFilter, VersionState,
};

use super::{cas_miss, RestoreOutcome, VersionStore};
use crate::connection::DatabasePool;

const INSERT_VERSION: &str = "INSERT INTO document_versions \
     (id, lineage_id, machine_name, department, filename, extension, storage_key, \
      state, prev_version_id, uploaded_by, updated_by) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *";

/// Version store backed by the `document_versions` table.
#[derive(Debug, Clone)]
pub struct PgVersionStore {
    pool: PgPool,
}

impl PgVersionStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a store from a connected [`DatabasePool`].
    pub fn from_database(db: &DatabasePool) -> Self {
        Self::new(db.pool().clone())
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })
    }
}

/// Map a write error, turning unique violations into conflicts.
fn write_error(context: &'static str, e: sqlx::Error) -> AppError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        AppError::with_source(ErrorKind::Conflict, format!("{context}: duplicate record"), e)
    } else {
        AppError::with_source(ErrorKind::Database, context, e)
    }
}

async fn insert_in(
    tx: &mut Transaction<'static, Postgres>,
    version: &NewDocumentVersion,
) -> AppResult<DocumentVersion> {
    sqlx::query_as::<_, DocumentVersion>(INSERT_VERSION)
        .bind(version.id)
        .bind(version.lineage_id)
        .bind(&version.machine_name)
        .bind(&version.department)
        .bind(&version.filename)
        .bind(&version.extension)
        .bind(&version.storage_key)
        .bind(VersionState::Pending)
        .bind(version.prev_version_id)
        .bind(&version.uploaded_by)
        .bind(&version.updated_by)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| write_error("Failed to insert document version", e))
}

async fn find_in(
    tx: &mut Transaction<'static, Postgres>,
    id: Uuid,
    lock: bool,
) -> AppResult<Option<DocumentVersion>> {
    let sql = if lock {
        "SELECT * FROM document_versions WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT * FROM document_versions WHERE id = $1"
    };
    sqlx::query_as::<_, DocumentVersion>(sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find document version", e))
}

#[async_trait]
impl VersionStore for PgVersionStore {
    fn backend(&self) -> &str {
        "postgres"
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }

    async fn insert(&self, version: NewDocumentVersion) -> AppResult<DocumentVersion> {
        let mut tx = self.begin().await?;
        let created = insert_in(&mut tx, &version).await?;
        tx.commit()
            .await
            .map_err(|e| write_error("Failed to commit document version insert", e))?;
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DocumentVersion>> {
        sqlx::query_as::<_, DocumentVersion>("SELECT * FROM document_versions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find document version", e)
            })
    }

    async fn list(&self, filter: &VersionFilter) -> AppResult<Vec<DocumentVersion>> {
        debug!(?filter, "Listing document versions");
        sqlx::query_as::<_, DocumentVersion>(
            "SELECT * FROM document_versions \
             WHERE ($1::version_state IS NULL OR state = $1) \
               AND ($2::text IS NULL OR machine_name = $2) \
               AND ($3::text IS NULL OR department = $3) \
               AND ($4::uuid IS NULL OR lineage_id = $4) \
             ORDER BY updated_at DESC, created_at DESC",
        )
        .bind(filter.state)
        .bind(filter.machine_name.as_deref())
        .bind(filter.department.as_deref())
        .bind(filter.lineage_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list document versions", e))
    }

    async fn activate(&self, id: Uuid, details: &CommitDetails) -> AppResult<DocumentVersion> {
        let updated = sqlx::query_as::<_, DocumentVersion>(
            "UPDATE document_versions SET state = $2, size_bytes = $3, content_type = $4, \
             checksum_sha256 = $5, committed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND state = $6 RETURNING *",
        )
        .bind(id)
        .bind(VersionState::Active)
        .bind(details.size_bytes)
        .bind(&details.content_type)
        .bind(&details.checksum_sha256)
        .bind(VersionState::Pending)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error("Failed to activate document version", e))?;

        match updated {
            Some(version) => Ok(version),
            None => {
                let current = self.find_by_id(id).await?;
                Err(cas_miss(id, VersionState::Pending, current.as_ref()))
            }
        }
    }

    async fn replace(
        &self,
        active_id: Uuid,
        mut next: NewDocumentVersion,
    ) -> AppResult<(DocumentVersion, DocumentVersion)> {
        let mut tx = self.begin().await?;

        let archived = sqlx::query_as::<_, DocumentVersion>(
            "UPDATE document_versions SET state = $2, updated_by = $3, updated_at = NOW() \
             WHERE id = $1 AND state = $4 RETURNING *",
        )
        .bind(active_id)
        .bind(VersionState::Archived)
        .bind(&next.updated_by)
        .bind(VersionState::Active)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| write_error("Failed to archive document version", e))?;

        let Some(archived) = archived else {
            let current = find_in(&mut tx, active_id, false).await?;
            return Err(cas_miss(active_id, VersionState::Active, current.as_ref()));
        };

        next.lineage_id = archived.lineage_id;
        next.machine_name = archived.machine_name.clone();
        next.department = archived.department.clone();
        next.prev_version_id = Some(archived.id);
        let inserted = insert_in(&mut tx, &next).await?;

        tx.commit()
            .await
            .map_err(|e| write_error("Failed to commit replace", e))?;
        Ok((archived, inserted))
    }

    async fn restore(&self, active_id: Uuid) -> AppResult<RestoreOutcome> {
        let mut tx = self.begin().await?;

        let current = match find_in(&mut tx, active_id, true).await? {
            Some(version) if version.is_active() => version,
            other => return Err(cas_miss(active_id, VersionState::Active, other.as_ref())),
        };
        let Some(prev_id) = current.prev_version_id else {
            return Err(AppError::no_history(format!(
                "Document version {active_id} has no previous version to restore"
            )));
        };

        let removed = sqlx::query("DELETE FROM document_versions WHERE id = $1 AND state = $2")
            .bind(active_id)
            .bind(VersionState::Active)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete document version", e)
            })?;
        if removed.rows_affected() != 1 {
            return Err(AppError::conflict(format!(
                "Document version {active_id} changed during restore"
            )));
        }

        let promoted = sqlx::query_as::<_, DocumentVersion>(
            "UPDATE document_versions SET state = $2, prev_version_id = NULL, updated_at = NOW() \
             WHERE id = $1 AND state = $3 RETURNING *",
        )
        .bind(prev_id)
        .bind(VersionState::Active)
        .bind(VersionState::Archived)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| write_error("Failed to promote previous version", e))?;

        let Some(promoted) = promoted else {
            let prev = find_in(&mut tx, prev_id, false).await?;
            return Err(cas_miss(prev_id, VersionState::Archived, prev.as_ref()));
        };

        tx.commit()
            .await
            .map_err(|e| write_error("Failed to commit restore", e))?;

        let deleted = DocumentVersion {
            state: VersionState::Deleted,
            ..current
        };
        Ok(RestoreOutcome { deleted, promoted })
    }
}

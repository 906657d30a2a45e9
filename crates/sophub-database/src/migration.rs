//! Database migration runner.

use sqlx::PgPool;
use tracing::info;

use sophub_core::error::{AppError, ErrorKind};

/// Apply the embedded migrations that have not run yet.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Applying document version migrations");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;

    info!("Migrations up to date");
    Ok(())
}

//! Database migration runners.

use sqlx::{PgPool, SqlitePool};
use tracing::info;

use catalog_core::error::{AppError, ErrorKind};

fn migration_error(e: sqlx::migrate::MigrateError) -> AppError {
    AppError::with_source(
        ErrorKind::Database,
        format!("Failed to run migrations: {e}"),
        e,
    )
}

/// Run all pending catalog migrations against PostgreSQL.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Running catalog migrations...");

    sqlx::migrate!("../../migrations/postgres")
        .run(pool)
        .await
        .map_err(migration_error)?;

    info!("Catalog migrations completed successfully");
    Ok(())
}

/// Run all pending catalog migrations against SQLite.
pub async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    info!("Running catalog migrations (SQLite)...");

    sqlx::migrate!("../../migrations/sqlite")
        .run(pool)
        .await
        .map_err(migration_error)?;

    info!("Catalog migrations completed successfully");
    Ok(())
}

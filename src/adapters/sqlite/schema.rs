//! Idempotent schema setup.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Debug, Error)]
#[error("Failed to apply schema: {0}")]
pub struct SchemaError(#[source] pub sqlx::Error);

/// Create the tables if they do not exist yet.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), SchemaError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await.map_err(SchemaError)?;
    debug!("Database schema ensured");
    Ok(())
}

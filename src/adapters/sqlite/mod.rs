//! SQLite database adapters for conversations, tasks and the catalog.

pub mod catalog_repository;
pub mod connection;
pub mod conversation_repository;
pub mod schema;
pub mod task_repository;

pub use connection::{create_pool, create_test_pool, database_url, verify_connection, ConnectionError, PoolConfig};
pub use catalog_repository::SqliteCatalogRepository;
pub use conversation_repository::SqliteConversationRepository;
pub use schema::{ensure_schema, SchemaError};
pub use task_repository::SqliteTaskRepository;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::DatabaseConfig;

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::SerializationError(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an optional JSON string from a SQLite row field.
pub fn parse_optional_json<T: serde::de::DeserializeOwned>(s: Option<String>) -> DomainResult<Option<T>> {
    s.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| DomainError::SerializationError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Open the configured database and make sure its tables exist.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(&database_url(&config.path), Some(PoolConfig::from(config))).await?;
    verify_connection(&pool).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Create an in-memory test pool with the schema applied.
pub async fn create_initialized_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

//! SQLite pool setup for conversation storage.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::domain::models::DatabaseConfig;

const IN_MEMORY: &str = "sqlite::memory:";

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
    #[error("Could not create the database directory: {0}")]
    DirectoryCreationFailed(#[source] std::io::Error),
    #[error("Could not open the database pool: {0}")]
    PoolCreationFailed(#[source] sqlx::Error),
    #[error("Database did not answer a check query: {0}")]
    ConnectionFailed(#[source] sqlx::Error),
}

/// Pool sizing and lock waiting.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            acquire_timeout: Duration::from_secs(3),
            busy_timeout: Duration::from_secs(30),
        }
    }
}

/// Turn a configured path into a sqlx URL; full `sqlite:` URLs pass through.
pub fn database_url(path: &str) -> String {
    if path.starts_with("sqlite:") {
        path.to_string()
    } else {
        format!("sqlite:{path}")
    }
}

/// Open a file-backed pool in WAL mode, creating the file and its directory.
pub async fn create_pool(url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, ConnectionError> {
    let config = config.unwrap_or_default();
    create_parent_directory(url)?;

    let options = SqliteConnectOptions::from_str(url)
        .map_err(|_| ConnectionError::InvalidDatabaseUrl(url.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(config.busy_timeout);

    debug!(url, max_connections = config.max_connections, "Opening SQLite pool");
    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)
}

/// Private in-memory database that lives as long as the pool.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::from_str(IN_MEMORY)
        .map_err(|_| ConnectionError::InvalidDatabaseUrl(IN_MEMORY.to_string()))?
        .foreign_keys(true)
        .shared_cache(true);

    // one connection, so every query sees the same memory database
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)
}

pub async fn verify_connection(pool: &SqlitePool) -> Result<(), ConnectionError> {
    let (_answer,): (i64,) = sqlx::query_as("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(ConnectionError::ConnectionFailed)?;
    Ok(())
}

fn create_parent_directory(url: &str) -> Result<(), ConnectionError> {
    let file = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if file.is_empty() || file.starts_with(":memory:") {
        return Ok(());
    }

    match Path::new(file).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(ConnectionError::DirectoryCreationFailed)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url() {
        assert_eq!(database_url(".prometheia/prometheia.db"), "sqlite:.prometheia/prometheia.db");
        assert_eq!(database_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[test]
    fn test_pool_config_never_zero_sized() {
        let config = DatabaseConfig {
            max_connections: 0,
            ..DatabaseConfig::default()
        };
        assert_eq!(PoolConfig::from(&config).max_connections, 1);
    }

    #[tokio::test]
    async fn test_file_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.db");

        let pool = create_pool(&database_url(&path.to_string_lossy()), None).await.unwrap();
        verify_connection(&pool).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_memory_pools_are_isolated() {
        let first = create_test_pool().await.unwrap();
        let second = create_test_pool().await.unwrap();

        sqlx::query("CREATE TABLE marker (id INTEGER)").execute(&first).await.unwrap();
        let found: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'marker'")
                .fetch_optional(&second)
                .await
                .unwrap();
        assert!(found.is_none());
    }
}

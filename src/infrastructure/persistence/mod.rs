//! Link repository implementations.
//!
//! # Repositories
//!
//! - [`MemoryLinkRepository`] - Volatile map, lost on restart
//! - [`FileLinkRepository`] - Append-only JSON log replayed on open
//! - [`PgLinkRepository`] - PostgreSQL with embedded migrations
//!
//! [`open_store`] picks one of them from the configuration.

pub mod file_link_repository;
pub mod memory_link_repository;
pub mod pg_link_repository;

pub use file_link_repository::FileLinkRepository;
pub use memory_link_repository::MemoryLinkRepository;
pub use pg_link_repository::PgLinkRepository;

use std::sync::Arc;
use tracing::info;

use crate::config::{Config, StorageConfig};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Builds the store selected by `config.storage`.
///
/// # Errors
///
/// Returns [`AppError::BackendUnavailable`] if the log file cannot be opened
/// or the database cannot be reached.
pub async fn open_store(config: &Config) -> Result<Arc<dyn LinkRepository>, AppError> {
    let store: Arc<dyn LinkRepository> = match &config.storage {
        StorageConfig::Postgres { dsn } => Arc::new(
            PgLinkRepository::connect(
                dsn,
                config.db_max_connections,
                config.db_connect_timeout(),
            )
            .await?,
        ),
        StorageConfig::File { path } => Arc::new(FileLinkRepository::open(path).await?),
        StorageConfig::Memory => Arc::new(MemoryLinkRepository::new()),
    };

    info!(backend = store.backend_name(), "Link store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_memory_store_by_default() {
        let store = open_store(&Config::default()).await.unwrap();

        assert_eq!(store.backend_name(), "memory");
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_file_store() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            storage: StorageConfig::File {
                path: dir.path().join("links.json"),
            },
            ..Config::default()
        };

        let store = open_store(&config).await.unwrap();

        assert_eq!(store.backend_name(), "file");
    }

    #[tokio::test]
    async fn test_open_file_store_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            storage: StorageConfig::File {
                path: dir.path().join("missing").join("links.json"),
            },
            ..Config::default()
        };

        let err = open_store(&config).await.err().unwrap();

        assert!(matches!(err, AppError::BackendUnavailable { .. }));
    }
}

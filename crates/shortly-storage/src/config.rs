use crate::{FileStorage, MemoryStorage, PostgresStorage};
use shortly_core::{Result, Storage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Which backend to construct, plus its location.
///
/// Parsing and precedence of the selector (flags, env, files) belong
/// to the caller; the storage layer only consumes the decided value.
/// The chosen backend is handed around as an explicit dependency,
/// never a process-wide singleton.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Volatile map backend; lifetime equals the process lifetime.
    InMemory,
    /// Append-only file log with an in-memory index.
    FileLog { path: PathBuf },
    /// Postgres-backed store.
    Postgres { dsn: String },
}

impl StorageConfig {
    /// Constructs the selected backend. Startup failures (log replay,
    /// file open, migrations) surface here; no backend is returned
    /// partially initialized.
    pub async fn connect(self) -> Result<Arc<dyn Storage>> {
        match self {
            StorageConfig::InMemory => {
                info!("using in-memory storage");
                Ok(Arc::new(MemoryStorage::new()))
            }
            StorageConfig::FileLog { path } => {
                info!(path = %path.display(), "using file-log storage");
                Ok(Arc::new(FileStorage::open(path).await?))
            }
            StorageConfig::Postgres { dsn } => {
                info!("using postgres storage");
                Ok(Arc::new(PostgresStorage::connect(&dsn).await?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortly_core::StorageError;
    use tempfile::tempdir;

    #[tokio::test]
    async fn in_memory_config_builds_a_working_backend() {
        let storage = StorageConfig::InMemory.connect().await.unwrap();

        let outcome = storage.save_url("u1", "https://example.com").await.unwrap();
        let url = storage.find_url(outcome.short_id()).await.unwrap();
        assert_eq!(url, "https://example.com");
        assert!(matches!(
            storage.ping().await.unwrap_err(),
            StorageError::PingUnsupported
        ));
    }

    #[tokio::test]
    async fn file_log_config_builds_a_durable_backend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");

        let storage = StorageConfig::FileLog { path: path.clone() }
            .connect()
            .await
            .unwrap();
        let id = storage
            .save_url("u1", "https://example.com")
            .await
            .unwrap()
            .into_short_id();
        storage.close().await.unwrap();
        drop(storage);

        let reopened = StorageConfig::FileLog { path }.connect().await.unwrap();
        assert_eq!(
            reopened.find_url(&id).await.unwrap(),
            "https://example.com"
        );
    }
}

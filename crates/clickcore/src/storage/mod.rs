//! Score persistence
//!
//! The click service only sees the [`ScoreStore`] trait. Three backends:
//! - `memory`: process-local `DashMap`, for tests and throwaway deployments
//! - `json_file`: one JSON object rewritten atomically on every change
//! - `db`: SQLite through an r2d2 pool

pub mod db;
pub mod json_file;
pub mod memory;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config;
use crate::core::error::ClickerResult;
use crate::game::ScoreRecord;

pub use db::SqliteStore;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// State transition run under the store's per-user lock.
///
/// Receives the current record (a zero record for unknown users) and returns
/// the replacement. Returning an error aborts the change: nothing is written
/// and no record is created.
pub type Mutation = Box<dyn FnOnce(&ScoreRecord) -> ClickerResult<ScoreRecord> + Send + 'static>;

/// Durable, concurrency-safe score storage keyed by Telegram user id.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Current record, `None` if the user never mutated anything. No side effects.
    async fn load(&self, user_id: i64) -> ClickerResult<Option<ScoreRecord>>;

    /// Atomically applies `mutation` to the user's record.
    ///
    /// Concurrent calls for the same user are serialized; the stored
    /// `user_id` and `seq` are set by the store, not the mutation.
    async fn modify(&self, user_id: i64, mutation: Mutation) -> ClickerResult<ScoreRecord>;

    /// Every stored record, in no particular order.
    async fn list(&self) -> ClickerResult<Vec<ScoreRecord>>;
}

/// Which backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    JsonFile(PathBuf),
    Sqlite(String),
}

impl StorageBackend {
    /// `DATABASE_URL` wins over `DATA_FILE`; neither means in-memory.
    pub fn from_env() -> Self {
        Self::select(config::DATABASE_URL.as_deref(), config::DATA_FILE.as_deref())
    }

    pub fn select(database_url: Option<&str>, data_file: Option<&str>) -> Self {
        match (database_url, data_file) {
            (Some(url), _) => StorageBackend::Sqlite(sqlite_path(url)),
            (None, Some(path)) => StorageBackend::JsonFile(PathBuf::from(path)),
            (None, None) => StorageBackend::Memory,
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "in-memory (not durable)"),
            StorageBackend::JsonFile(path) => write!(f, "JSON file {}", path.display()),
            StorageBackend::Sqlite(path) => write!(f, "SQLite {}", path),
        }
    }
}

/// Accepts `sqlite://path`, `sqlite:path` or a bare path.
fn sqlite_path(url: &str) -> String {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
        .to_string()
}

/// Opens the configured backend.
pub async fn open_store(backend: &StorageBackend) -> ClickerResult<Arc<dyn ScoreStore>> {
    let store: Arc<dyn ScoreStore> = match backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::JsonFile(path) => Arc::new(JsonFileStore::open(path.clone()).await?),
        StorageBackend::Sqlite(path) => Arc::new(SqliteStore::open(path)?),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        assert_eq!(StorageBackend::select(None, None), StorageBackend::Memory);
        assert_eq!(
            StorageBackend::select(None, Some("users_data.json")),
            StorageBackend::JsonFile(PathBuf::from("users_data.json"))
        );
        assert_eq!(
            StorageBackend::select(Some("sqlite://clicker.db"), Some("users_data.json")),
            StorageBackend::Sqlite("clicker.db".to_string())
        );
    }

    #[test]
    fn test_sqlite_path_prefixes() {
        assert_eq!(sqlite_path("sqlite:///var/lib/clicker.db"), "/var/lib/clicker.db");
        assert_eq!(sqlite_path("sqlite:clicker.db"), "clicker.db");
        assert_eq!(sqlite_path("clicker.db"), "clicker.db");
        assert_eq!(sqlite_path("sqlite::memory:"), ":memory:");
    }
}

use std::time::Duration;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{Mutation, ScoreStore};
use crate::core::error::{ClickerResult, StorageError};
use crate::game::ScoreRecord;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "user_id, clicks, level, auto_clickers, total_clicks, seq";

/// Create a new database connection pool
///
/// Up to 10 connections for a file database. `:memory:` gets a single
/// connection, because every SQLite in-memory connection is its own database.
/// Runs schema migrations before returning.
///
/// # Example
///
/// ```no_run
/// use clickcore::storage::db;
///
/// let pool = db::create_pool("clicker.db")?;
/// # Ok::<(), clickcore::StorageError>(())
/// ```
pub fn create_pool(database_path: &str) -> Result<DbPool, StorageError> {
    let in_memory = database_path == ":memory:";
    let manager = if in_memory {
        SqliteConnectionManager::memory()
    } else {
        SqliteConnectionManager::file(database_path)
    };
    let manager = manager.with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));

    let pool = Pool::builder()
        .max_size(if in_memory { 1 } else { 10 })
        .build(manager)?;

    let conn = pool.get()?;
    migrate_schema(&conn)?;

    Ok(pool)
}

/// Creates the `scores` table and adds columns missing from older layouts.
fn migrate_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS scores (
            user_id INTEGER PRIMARY KEY,
            clicks INTEGER NOT NULL DEFAULT 0,
            level INTEGER NOT NULL DEFAULT 1
        );",
    )?;

    let mut stmt = conn.prepare("PRAGMA table_info(scores)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for column in ["auto_clickers", "total_clicks", "seq"] {
        if !columns.iter().any(|c| c == column) {
            log::info!("Adding missing column: {} to scores table", column);
            conn.execute(
                &format!("ALTER TABLE scores ADD COLUMN {} INTEGER NOT NULL DEFAULT 0", column),
                [],
            )?;
        }
    }

    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScoreRecord> {
    Ok(ScoreRecord {
        user_id: row.get(0)?,
        clicks: row.get(1)?,
        level: row.get(2)?,
        auto_clickers: row.get(3)?,
        total_clicks: row.get(4)?,
        seq: u64::try_from(row.get::<_, i64>(5)?).unwrap_or(0),
    })
}

fn select_record(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<ScoreRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM scores WHERE user_id = ?1", SELECT_COLUMNS),
        params![user_id],
        row_to_record,
    )
    .optional()
}

/// SQLite backend.
///
/// Every mutation runs inside an `IMMEDIATE` transaction, so concurrent
/// writers (other tasks or other processes on the same file) queue on the
/// database write lock instead of losing updates.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn open(database_path: &str) -> Result<Self, StorageError> {
        Ok(Self::from_pool(create_pool(database_path)?))
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl ScoreStore for SqliteStore {
    async fn load(&self, user_id: i64) -> ClickerResult<Option<ScoreRecord>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> ClickerResult<Option<ScoreRecord>> {
            let conn = pool.get()?;
            Ok(select_record(&conn, user_id)?)
        })
        .await
        .map_err(StorageError::from)?
    }

    async fn modify(&self, user_id: i64, mutation: Mutation) -> ClickerResult<ScoreRecord> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> ClickerResult<ScoreRecord> {
            let mut conn = pool.get()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let current = select_record(&tx, user_id)?.unwrap_or_else(|| ScoreRecord::new(user_id));
            // Dropping `tx` on error rolls back
            let mut next = mutation(&current)?;

            let seq: i64 = tx.query_row("SELECT COALESCE(MAX(seq), 0) + 1 FROM scores", [], |row| row.get(0))?;
            next.user_id = user_id;
            next.seq = u64::try_from(seq).unwrap_or(0);

            tx.execute(
                "INSERT INTO scores (user_id, clicks, level, auto_clickers, total_clicks, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_id) DO UPDATE SET
                    clicks = excluded.clicks,
                    level = excluded.level,
                    auto_clickers = excluded.auto_clickers,
                    total_clicks = excluded.total_clicks,
                    seq = excluded.seq",
                params![next.user_id, next.clicks, next.level, next.auto_clickers, next.total_clicks, seq],
            )?;
            tx.commit()?;

            Ok(next)
        })
        .await
        .map_err(StorageError::from)?
    }

    async fn list(&self) -> ClickerResult<Vec<ScoreRecord>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> ClickerResult<Vec<ScoreRecord>> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(&format!("SELECT {} FROM scores", SELECT_COLUMNS))?;
            let records = stmt
                .query_map([], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
        .map_err(StorageError::from)?
    }
}

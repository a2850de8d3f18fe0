use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{Mutation, ScoreStore};
use crate::core::error::{ClickerResult, StorageError};
use crate::game::ScoreRecord;

/// On-disk shape of one user, keyed by the stringified user id.
///
/// Older files carry only `clicks` and `level` (and maybe `click_power`,
/// which is ignored); missing fields default.
#[derive(Debug, Serialize, Deserialize)]
struct StoredScore {
    #[serde(default)]
    clicks: i64,
    #[serde(default = "default_level")]
    level: i64,
    #[serde(default)]
    auto_clickers: i64,
    #[serde(default)]
    total_clicks: i64,
    #[serde(default)]
    seq: u64,
}

fn default_level() -> i64 {
    1
}

impl From<&ScoreRecord> for StoredScore {
    fn from(record: &ScoreRecord) -> Self {
        Self {
            clicks: record.clicks,
            level: record.level,
            auto_clickers: record.auto_clickers,
            total_clicks: record.total_clicks,
            seq: record.seq,
        }
    }
}

struct FileState {
    records: BTreeMap<i64, ScoreRecord>,
    seq: u64,
}

/// Whole-file JSON backend.
///
/// One async mutex guards the in-memory copy and the file. Each change is
/// written to `<file>.tmp` and renamed over the original, so a crash leaves
/// either the old or the new file. A failed write rolls the in-memory copy back.
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl JsonFileStore {
    /// Loads `path`; a missing or blank file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let records = read_records(&path).await?;
        let seq = records.values().map(|r| r.seq).max().unwrap_or(0);
        log::info!("Loaded {} score records from {}", records.len(), path.display());

        Ok(Self {
            path,
            state: Mutex::new(FileState { records, seq }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("scores.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn persist(&self, records: &BTreeMap<i64, ScoreRecord>) -> Result<(), StorageError> {
        let stored: BTreeMap<String, StoredScore> = records
            .iter()
            .map(|(user_id, record)| (user_id.to_string(), StoredScore::from(record)))
            .collect();
        let bytes = serde_json::to_vec_pretty(&stored)?;

        let temp_path = self.temp_path();
        let mut file = fs_err::tokio::File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs_err::tokio::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

async fn read_records(path: &Path) -> Result<BTreeMap<i64, ScoreRecord>, StorageError> {
    let bytes = match fs_err::tokio::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }

    let stored: BTreeMap<String, StoredScore> = serde_json::from_slice(&bytes)?;
    stored
        .into_iter()
        .map(|(key, score)| {
            let user_id: i64 = key
                .parse()
                .map_err(|_| StorageError::Corrupt(format!("user id key {:?} is not an integer", key)))?;
            let record = ScoreRecord {
                user_id,
                clicks: score.clicks,
                level: score.level,
                auto_clickers: score.auto_clickers,
                total_clicks: score.total_clicks,
                seq: score.seq,
            };
            Ok((user_id, record))
        })
        .collect()
}

#[async_trait]
impl ScoreStore for JsonFileStore {
    async fn load(&self, user_id: i64) -> ClickerResult<Option<ScoreRecord>> {
        Ok(self.state.lock().await.records.get(&user_id).cloned())
    }

    async fn modify(&self, user_id: i64, mutation: Mutation) -> ClickerResult<ScoreRecord> {
        let mut state = self.state.lock().await;

        let current = state
            .records
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| ScoreRecord::new(user_id));
        let mut next = mutation(&current)?;
        next.user_id = user_id;
        next.seq = state.seq + 1;

        let previous = state.records.insert(user_id, next.clone());
        if let Err(e) = self.persist(&state.records).await {
            log::error!("Failed to write {}: {}", self.path.display(), e);
            match previous {
                Some(previous) => state.records.insert(user_id, previous),
                None => state.records.remove(&user_id),
            };
            return Err(e.into());
        }

        state.seq = next.seq;
        Ok(next)
    }

    async fn list(&self) -> ClickerResult<Vec<ScoreRecord>> {
        Ok(self.state.lock().await.records.values().cloned().collect())
    }
}

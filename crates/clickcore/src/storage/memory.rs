use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{Mutation, ScoreStore};
use crate::core::error::ClickerResult;
use crate::game::ScoreRecord;

/// Process-local store. Lost on restart.
///
/// The DashMap entry guard is the per-user lock: the mutation runs while the
/// shard is held, and nothing is awaited under it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<i64, ScoreRecord>,
    seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn stamp(&self, mut record: ScoreRecord, user_id: i64) -> ScoreRecord {
        record.user_id = user_id;
        record.seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        record
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn load(&self, user_id: i64) -> ClickerResult<Option<ScoreRecord>> {
        Ok(self.records.get(&user_id).map(|r| r.value().clone()))
    }

    async fn modify(&self, user_id: i64, mutation: Mutation) -> ClickerResult<ScoreRecord> {
        match self.records.entry(user_id) {
            Entry::Occupied(mut occupied) => {
                let next = self.stamp(mutation(occupied.get())?, user_id);
                occupied.insert(next.clone());
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                let next = self.stamp(mutation(&ScoreRecord::new(user_id))?, user_id);
                vacant.insert(next.clone());
                Ok(next)
            }
        }
    }

    async fn list(&self) -> ClickerResult<Vec<ScoreRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ClickerError;

    #[tokio::test]
    async fn test_seq_increases_across_users() {
        let store = MemoryStore::new();
        let a = store.modify(1, Box::new(|r| Ok(r.clone()))).await.unwrap();
        let b = store.modify(2, Box::new(|r| Ok(r.clone()))).await.unwrap();
        let c = store.modify(1, Box::new(|r| Ok(r.clone()))).await.unwrap();
        assert!(a.seq < b.seq && b.seq < c.seq);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mutation_cannot_change_user_id() {
        let store = MemoryStore::new();
        let record = store
            .modify(3, Box::new(|r| Ok(ScoreRecord { user_id: 99, ..r.clone() })))
            .await
            .unwrap();
        assert_eq!(record.user_id, 3);
        assert!(store.load(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_mutation_creates_nothing() {
        let store = MemoryStore::new();
        let result = store
            .modify(4, Box::new(|_| Err(ClickerError::InsufficientClicks { need: 200, have: 0 })))
            .await;
        assert!(result.is_err());
        assert!(store.load(4).await.unwrap().is_none());
    }
}

use std::sync::Arc;

use serde::Serialize;

use super::leaderboard::{build_leaderboard, rank_of, sort_standings, LeaderboardEntry, Viewer};
use super::level::{apply_click, credit, spend, LevelRule, ScoreRecord, ScoreView};
use crate::core::config;
use crate::core::error::ClickerResult;
use crate::storage::ScoreStore;

/// Everything the page and the `/stats` command show about one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserState {
    pub user_id: i64,
    pub clicks: i64,
    pub level: i64,
    pub auto_clickers: i64,
    pub total_clicks: i64,
    pub rank: Option<usize>,
}

/// Click session service.
///
/// Holds no state of its own: every read goes to the store and every write is
/// a [`ScoreStore::modify`] call, so it can be cloned freely into handlers.
#[derive(Clone)]
pub struct ClickService {
    store: Arc<dyn ScoreStore>,
    rule: LevelRule,
    auto_clicker_cost: i64,
}

impl ClickService {
    pub fn new(store: Arc<dyn ScoreStore>, rule: LevelRule) -> Self {
        Self {
            store,
            rule,
            auto_clicker_cost: config::game::AUTO_CLICKER_COST,
        }
    }

    pub fn with_auto_clicker_cost(mut self, cost: i64) -> Self {
        self.auto_clicker_cost = cost;
        self
    }

    pub fn rule(&self) -> LevelRule {
        self.rule
    }

    pub fn auto_clicker_cost(&self) -> i64 {
        self.auto_clicker_cost
    }

    /// One tap. Creates the zero record on first use.
    pub async fn click(&self, user_id: i64) -> ClickerResult<ScoreView> {
        let rule = self.rule;
        let record = self
            .store
            .modify(user_id, Box::new(move |current| Ok(apply_click(current, &rule))))
            .await?;
        log::debug!("User {} clicked: {} clicks, level {}", user_id, record.clicks, record.level);
        Ok(record.view())
    }

    /// Current score; unknown users read as zero and no record is created.
    pub async fn state(&self, user_id: i64) -> ClickerResult<ScoreView> {
        Ok(self
            .store
            .load(user_id)
            .await?
            .map(|record| self.normalized(record).view())
            .unwrap_or(ScoreView::ZERO))
    }

    /// Stored record with its current rank, `None` for unknown users.
    pub async fn user_state(&self, user_id: i64) -> ClickerResult<UserState> {
        let mut records = self.store.list().await?;
        sort_standings(&mut records);
        let rank = rank_of(&records, user_id);
        let record = records
            .into_iter()
            .find(|r| r.user_id == user_id)
            .map(|r| self.normalized(r))
            .unwrap_or_else(|| ScoreRecord::new(user_id));

        Ok(UserState {
            user_id,
            clicks: record.clicks,
            level: record.level,
            auto_clickers: record.auto_clickers,
            total_clicks: record.total_clicks,
            rank,
        })
    }

    /// Top `limit` players; only `viewer`'s own row carries a name.
    pub async fn leaderboard(&self, limit: usize, viewer: Option<&Viewer>) -> ClickerResult<Vec<LeaderboardEntry>> {
        let mut records = self.store.list().await?;
        sort_standings(&mut records);
        Ok(build_leaderboard(&records, limit, viewer, &self.rule))
    }

    /// 1-based leaderboard position.
    pub async fn rank(&self, user_id: i64) -> ClickerResult<Option<usize>> {
        let mut records = self.store.list().await?;
        sort_standings(&mut records);
        Ok(rank_of(&records, user_id))
    }

    /// Spends `auto_clicker_cost` clicks on one more auto-clicker.
    ///
    /// A short balance fails with `InsufficientClicks` and nothing is written,
    /// not even a zero record.
    pub async fn buy_auto_clicker(&self, user_id: i64) -> ClickerResult<ScoreRecord> {
        let rule = self.rule;
        let cost = self.auto_clicker_cost;
        let record = self
            .store
            .modify(
                user_id,
                Box::new(move |current| {
                    let mut next = spend(current, &rule, cost)?;
                    next.auto_clickers += 1;
                    Ok(next)
                }),
            )
            .await?;
        log::info!("User {} bought auto-clicker #{}", user_id, record.auto_clickers);
        Ok(record)
    }

    /// Credits every auto-clicker owner; returns how many users were credited.
    ///
    /// A user whose write fails is logged and skipped; the others are still
    /// credited.
    ///
    /// The amount is read inside the mutation, so a purchase racing with the
    /// tick is never lost or double counted.
    pub async fn auto_click_tick(&self) -> ClickerResult<usize> {
        let owners: Vec<i64> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|r| r.auto_clickers > 0)
            .map(|r| r.user_id)
            .collect();

        let rule = self.rule;
        let mut credited = 0;
        for user_id in owners {
            let result = self
                .store
                .modify(
                    user_id,
                    Box::new(move |current| Ok(credit(current, &rule, current.auto_clickers))),
                )
                .await;
            match result {
                Ok(_) => credited += 1,
                Err(e) => log::error!("Auto-click credit for user {} failed: {}", user_id, e),
            }
        }

        if credited > 0 {
            log::debug!("Auto-click tick credited {} users", credited);
        }
        Ok(credited)
    }

    /// Level recomputed from clicks, for records written under another K.
    fn normalized(&self, mut record: ScoreRecord) -> ScoreRecord {
        record.level = self.rule.level_for(record.clicks);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ClickerError, StorageError};
    use crate::storage::{MemoryStore, Mutation};
    use pretty_assertions::assert_eq;

    fn service() -> (Arc<MemoryStore>, ClickService) {
        let store = Arc::new(MemoryStore::new());
        let service = ClickService::new(store.clone(), LevelRule::new(10).unwrap());
        (store, service)
    }

    #[tokio::test]
    async fn test_first_click_and_level_up() {
        let (_, service) = service();
        assert_eq!(service.click(42).await.unwrap(), ScoreView { clicks: 1, level: 1 });
        for _ in 1..10 {
            service.click(42).await.unwrap();
        }
        assert_eq!(service.state(42).await.unwrap(), ScoreView { clicks: 10, level: 2 });
    }

    #[tokio::test]
    async fn test_state_is_lazy_and_idempotent() {
        let (store, service) = service();
        assert_eq!(service.state(5).await.unwrap(), ScoreView::ZERO);
        assert_eq!(service.state(5).await.unwrap(), ScoreView::ZERO);
        assert!(store.load(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_buy_auto_clicker_needs_balance() {
        let (store, service) = service();
        assert!(matches!(
            service.buy_auto_clicker(1).await,
            Err(ClickerError::InsufficientClicks { need: 200, have: 0 })
        ));
        assert!(store.load(1).await.unwrap().is_none());

        for _ in 0..205 {
            service.click(1).await.unwrap();
        }
        let record = service.buy_auto_clicker(1).await.unwrap();
        assert_eq!(record.clicks, 5);
        assert_eq!(record.level, 1);
        assert_eq!(record.auto_clickers, 1);
        assert_eq!(record.total_clicks, 205);
    }

    #[tokio::test]
    async fn test_auto_click_tick_credits_owners_only() {
        let (_, service) = service();
        let service = service.with_auto_clicker_cost(3);
        for _ in 0..6 {
            service.click(1).await.unwrap();
        }
        service.buy_auto_clicker(1).await.unwrap();
        service.buy_auto_clicker(1).await.unwrap();
        service.click(2).await.unwrap();

        assert_eq!(service.auto_click_tick().await.unwrap(), 1);
        assert_eq!(service.state(1).await.unwrap().clicks, 2);
        assert_eq!(service.state(2).await.unwrap().clicks, 1);
    }

    /// Memory store whose writes for one user always fail.
    struct FailingUserStore {
        inner: MemoryStore,
        broken_user: i64,
    }

    #[async_trait::async_trait]
    impl ScoreStore for FailingUserStore {
        async fn load(&self, user_id: i64) -> ClickerResult<Option<ScoreRecord>> {
            self.inner.load(user_id).await
        }

        async fn modify(&self, user_id: i64, mutation: Mutation) -> ClickerResult<ScoreRecord> {
            if user_id == self.broken_user {
                return Err(StorageError::Corrupt("write refused".to_string()).into());
            }
            self.inner.modify(user_id, mutation).await
        }

        async fn list(&self) -> ClickerResult<Vec<ScoreRecord>> {
            self.inner.list().await
        }
    }

    #[tokio::test]
    async fn test_auto_click_tick_skips_failing_user() {
        let inner = MemoryStore::new();
        for user_id in [1, 2, 3] {
            inner
                .modify(
                    user_id,
                    Box::new(|r| {
                        Ok(ScoreRecord {
                            auto_clickers: 2,
                            ..r.clone()
                        })
                    }),
                )
                .await
                .unwrap();
        }
        let store = Arc::new(FailingUserStore { inner, broken_user: 2 });
        let service = ClickService::new(store, LevelRule::new(10).unwrap());

        assert_eq!(service.auto_click_tick().await.unwrap(), 2);
        assert_eq!(service.state(1).await.unwrap().clicks, 2);
        assert_eq!(service.state(2).await.unwrap().clicks, 0);
        assert_eq!(service.state(3).await.unwrap().clicks, 2);
    }

    #[tokio::test]
    async fn test_leaderboard_and_rank() {
        let (_, service) = service();
        service.click(1).await.unwrap();
        for _ in 0..3 {
            service.click(2).await.unwrap();
        }
        service.click(3).await.unwrap();

        let viewer = Viewer {
            user_id: 3,
            name: Some("Ann".to_string()),
        };
        let board = service.leaderboard(10, Some(&viewer)).await.unwrap();
        let order: Vec<i64> = board.iter().map(|e| e.user_id).collect();
        // user 1 reached one click before user 3
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(board[2].name.as_deref(), Some("Ann"));
        assert_eq!(board[0].name, None);

        assert_eq!(service.rank(3).await.unwrap(), Some(3));
        assert_eq!(service.rank(9).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_user_state_for_unknown_user() {
        let (_, service) = service();
        let state = service.user_state(8).await.unwrap();
        assert_eq!(state.clicks, 0);
        assert_eq!(state.level, 1);
        assert_eq!(state.rank, None);
    }

    #[tokio::test]
    async fn test_concurrent_clicks_are_not_lost() {
        let (_, service) = service();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.click(7).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(service.state(7).await.unwrap(), ScoreView { clicks: 50, level: 6 });
    }
}

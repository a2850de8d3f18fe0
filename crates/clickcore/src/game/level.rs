use serde::{Deserialize, Serialize};

use crate::core::error::{ClickerError, ClickerResult};

/// Clicks-per-level rule: `level = clicks / K + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRule {
    threshold: i64,
}

impl LevelRule {
    /// `threshold` is K; it must be at least 1.
    pub fn new(threshold: i64) -> ClickerResult<Self> {
        if threshold < 1 {
            return Err(ClickerError::Config(format!(
                "LEVEL_THRESHOLD must be >= 1, got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Largest L >= 1 with `clicks >= (L - 1) * K`.
    pub fn level_for(&self, clicks: i64) -> i64 {
        (clicks.max(0) / self.threshold).saturating_add(1)
    }
}

/// Persisted per-user score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: i64,
    pub clicks: i64,
    pub level: i64,
    pub auto_clickers: i64,
    pub total_clicks: i64,
    /// Store-wide stamp of the last mutation, breaks leaderboard ties
    pub seq: u64,
}

impl ScoreRecord {
    /// Zero state of a user that never clicked.
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            clicks: 0,
            level: 1,
            auto_clickers: 0,
            total_clicks: 0,
            seq: 0,
        }
    }

    pub fn view(&self) -> ScoreView {
        ScoreView {
            clicks: self.clicks,
            level: self.level,
        }
    }
}

/// What clients see after a click or a state read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreView {
    pub clicks: i64,
    pub level: i64,
}

impl ScoreView {
    pub const ZERO: ScoreView = ScoreView { clicks: 0, level: 1 };
}

/// One tap: `clicks + 1`, level recomputed.
pub fn apply_click(record: &ScoreRecord, rule: &LevelRule) -> ScoreRecord {
    credit(record, rule, 1)
}

/// Adds `amount` clicks (auto-clickers credit several at once).
pub fn credit(record: &ScoreRecord, rule: &LevelRule, amount: i64) -> ScoreRecord {
    let amount = amount.max(0);
    let clicks = record.clicks.saturating_add(amount);
    ScoreRecord {
        clicks,
        level: rule.level_for(clicks),
        total_clicks: record.total_clicks.saturating_add(amount),
        ..record.clone()
    }
}

/// Removes `cost` clicks, failing without changes when the balance is short.
pub fn spend(record: &ScoreRecord, rule: &LevelRule, cost: i64) -> ClickerResult<ScoreRecord> {
    if record.clicks < cost {
        return Err(ClickerError::InsufficientClicks {
            need: cost,
            have: record.clicks,
        });
    }
    let clicks = record.clicks - cost;
    Ok(ScoreRecord {
        clicks,
        level: rule.level_for(clicks),
        ..record.clone()
    })
}

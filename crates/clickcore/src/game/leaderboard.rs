use std::cmp::Ordering;

use serde::Serialize;

use super::level::{LevelRule, ScoreRecord};

/// One leaderboard row.
///
/// `name` is only filled for the viewer's own row; everybody else stays
/// anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: i64,
    pub clicks: i64,
    pub level: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Who is looking at the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub name: Option<String>,
}

/// Most clicks first; equal scores keep the order they were reached in.
fn standing(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    b.clicks
        .cmp(&a.clicks)
        .then(a.seq.cmp(&b.seq))
        .then(a.user_id.cmp(&b.user_id))
}

pub fn sort_standings(records: &mut [ScoreRecord]) {
    records.sort_by(standing);
}

/// 1-based position of `user_id`, `None` if it has no record.
pub fn rank_of(records: &[ScoreRecord], user_id: i64) -> Option<usize> {
    let me = records.iter().find(|r| r.user_id == user_id)?;
    Some(
        records
            .iter()
            .filter(|other| standing(other, me) == Ordering::Less)
            .count()
            + 1,
    )
}

/// Top `limit` rows of already sorted `records`.
pub fn build_leaderboard(
    records: &[ScoreRecord],
    limit: usize,
    viewer: Option<&Viewer>,
    rule: &LevelRule,
) -> Vec<LeaderboardEntry> {
    records
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, record)| LeaderboardEntry {
            rank: index + 1,
            user_id: record.user_id,
            clicks: record.clicks,
            level: rule.level_for(record.clicks),
            name: viewer
                .filter(|v| v.user_id == record.user_id)
                .and_then(|v| v.name.clone()),
        })
        .collect()
}

//! Click game rules and the service built on top of a [`crate::ScoreStore`].

pub mod leaderboard;
pub mod level;
pub mod service;

pub use leaderboard::{LeaderboardEntry, Viewer};
pub use level::{apply_click, credit, spend, LevelRule, ScoreRecord, ScoreView};
pub use service::{ClickService, UserState};

//! clickcore - engine of the tap clicker Mini App
//!
//! This library holds everything that does not talk to Telegram directly:
//! verification of the signed Mini App `initData`, the scoring rules, and the
//! pluggable score storage.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors and logging
//! - `auth`: Telegram WebApp init data verification (and signing for tests)
//! - `game`: level rule, score records, click service, leaderboard
//! - `storage`: `ScoreStore` trait with memory, JSON file and SQLite backends

pub mod auth;
pub mod core;
pub mod game;
pub mod storage;

// Re-export commonly used types for convenience
pub use auth::{AuthError, InitDataVerifier, VerifiedInitData, WebAppUser};
pub use crate::core::error::{ClickerError, ClickerResult, StorageError};
pub use game::{ClickService, LeaderboardEntry, LevelRule, ScoreRecord, ScoreView, UserState, Viewer};
pub use storage::{open_store, Mutation, ScoreStore, StorageBackend};

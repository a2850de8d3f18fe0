//! Configuration read once from the environment.
//!
//! Library constructors take explicit values; these statics are only read by
//! the binary when wiring things together.

use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
/// Also the HMAC secret for init data verification, never log it
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    non_empty("BOT_TOKEN")
        .or_else(|| non_empty("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Public base URL of the Mini App page
/// Read from WEBAPP_URL environment variable, trailing slash removed
pub static WEBAPP_URL: Lazy<Option<String>> =
    Lazy::new(|| non_empty("WEBAPP_URL").map(|url| url.trim_end_matches('/').to_string()));

/// Base URL for webhook registration
/// Read from WEBHOOK_URL environment variable, falls back to WEBAPP_URL
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| {
    non_empty("WEBHOOK_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .or_else(|| WEBAPP_URL.clone())
});

/// Shared secret for webhook ingress (path component + header)
/// Read from WEBHOOK_SECRET environment variable
pub static WEBHOOK_SECRET: Lazy<Option<String>> = Lazy::new(|| non_empty("WEBHOOK_SECRET"));

/// HTTP listen port
/// Read from PORT environment variable
/// Default: 5000
pub static PORT: Lazy<u16> = Lazy::new(|| {
    env::var("PORT")
        .ok()
        .and_then(|port| port.trim().parse().ok())
        .unwrap_or(5000)
});

/// SQLite connection string, enables the relational backend
/// Read from DATABASE_URL environment variable (`sqlite://` prefix optional)
pub static DATABASE_URL: Lazy<Option<String>> = Lazy::new(|| non_empty("DATABASE_URL"));

/// JSON file path, enables the file backend when DATABASE_URL is unset
/// Read from DATA_FILE environment variable
pub static DATA_FILE: Lazy<Option<String>> = Lazy::new(|| non_empty("DATA_FILE"));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: clicker.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| non_empty("LOG_FILE_PATH").unwrap_or_else(|| "clicker.log".to_string()));

/// Game rules configuration
pub mod game {
    use super::{env, Duration, Lazy};

    /// Clicks per level (K). Default 10
    pub const DEFAULT_LEVEL_THRESHOLD: i64 = 10;

    /// Price of one auto-clicker, in clicks
    pub const AUTO_CLICKER_COST: i64 = 200;

    /// Default interval between auto-clicker ticks (in seconds)
    pub const DEFAULT_AUTO_CLICK_INTERVAL_SECS: u64 = 5;

    /// Default number of leaderboard rows
    pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

    /// Raw LEVEL_THRESHOLD value; validated by `LevelRule::new`
    pub static LEVEL_THRESHOLD: Lazy<i64> = Lazy::new(|| {
        env::var("LEVEL_THRESHOLD")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_LEVEL_THRESHOLD)
    });

    /// AUTO_CLICK_INTERVAL_SECS, 0 disables the auto-clicker task
    pub static AUTO_CLICK_INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("AUTO_CLICK_INTERVAL_SECS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_AUTO_CLICK_INTERVAL_SECS)
    });

    /// LEADERBOARD_SIZE
    pub static LEADERBOARD_SIZE: Lazy<usize> = Lazy::new(|| {
        env::var("LEADERBOARD_SIZE")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
    });

    /// Auto-clicker interval, `None` when disabled
    pub fn auto_click_interval() -> Option<Duration> {
        match *AUTO_CLICK_INTERVAL_SECS {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Init data verification configuration
pub mod auth {
    use super::{env, Duration, Lazy};

    /// INIT_DATA_MAX_AGE_SECS, unset means no expiry check
    pub static INIT_DATA_MAX_AGE_SECS: Lazy<Option<u64>> = Lazy::new(|| {
        env::var("INIT_DATA_MAX_AGE_SECS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
    });

    /// Maximum accepted age of init data
    pub fn max_age() -> Option<Duration> {
        INIT_DATA_MAX_AGE_SECS.map(Duration::from_secs)
    }
}

/// Web server configuration
pub mod web {
    use super::{env, parse_flag, Lazy};

    /// ALLOW_LEGACY_USER_ID enables the endpoints that trust a caller-supplied user id
    /// Default: false
    pub static ALLOW_LEGACY_USER_ID: Lazy<bool> = Lazy::new(|| {
        env::var("ALLOW_LEGACY_USER_ID")
            .map(|raw| parse_flag(&raw))
            .unwrap_or(false)
    });

    /// Header carrying init data
    pub const INIT_DATA_HEADER: &str = "x-init-data";

    /// Header name used by older Mini App builds
    pub const INIT_DATA_HEADER_ALIAS: &str = "x-telegram-init-data";

    /// Header Telegram sends with every webhook call
    pub const WEBHOOK_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

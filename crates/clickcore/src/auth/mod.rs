//! Telegram Mini App authentication
//!
//! Telegram attaches a signed `initData` query string to every Mini App
//! session. The signature key is derived from the bot token:
//! `HMAC_SHA256(key = "WebAppData", msg = bot_token)`.

mod init_data;
mod query;
mod secret;

use thiserror::Error;

pub use init_data::{
    extract_user_id, sign_init_data, verify, InitDataValue, InitDataVerifier, VerifiedInitData, WebAppChat,
    WebAppUser,
};
pub use secret::SharedSecret;

/// Why a session credential was rejected.
///
/// Messages are safe to log: they never contain the bot token or the raw
/// init data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing init data")]
    Missing,

    #[error("malformed init data")]
    Malformed,

    #[error("missing hash")]
    MissingHash,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("expired")]
    Expired,

    #[error("no user in init data")]
    NoUser,
}

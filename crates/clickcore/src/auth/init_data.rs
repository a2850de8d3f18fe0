use std::collections::BTreeMap;
use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::query::{data_check_string, parse_init_data};
use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Key of the first HMAC round, fixed by Telegram.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Length of a hex-encoded SHA-256 digest.
const HASH_HEX_LEN: usize = 64;

/// Telegram user as embedded in the `user` / `receiver` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub is_premium: Option<bool>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl WebAppUser {
    /// "First Last", falling back to the username.
    pub fn display_name(&self) -> Option<String> {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone().filter(|name| !name.is_empty())
        } else {
            Some(full)
        }
    }
}

/// Chat the Mini App was launched from (attachment menu launches only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// A decoded init data field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitDataValue {
    User(WebAppUser),
    Chat(WebAppChat),
    /// Plain field, or a structured field whose JSON did not decode
    Raw(String),
}

impl InitDataValue {
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            InitDataValue::Raw(value) => Some(value),
            _ => None,
        }
    }
}

/// Init data whose signature has been checked.
///
/// Only [`InitDataVerifier`] builds this type, so holding one proves the
/// fields came from Telegram for this bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedInitData {
    fields: BTreeMap<String, InitDataValue>,
}

impl VerifiedInitData {
    fn from_checked(params: BTreeMap<String, String>) -> Self {
        let fields = params
            .into_iter()
            .map(|(key, raw)| {
                let value = match key.as_str() {
                    "user" | "receiver" => serde_json::from_str(&raw)
                        .map(InitDataValue::User)
                        .unwrap_or(InitDataValue::Raw(raw)),
                    "chat" => serde_json::from_str(&raw)
                        .map(InitDataValue::Chat)
                        .unwrap_or(InitDataValue::Raw(raw)),
                    _ => InitDataValue::Raw(raw),
                };
                (key, value)
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&InitDataValue> {
        self.fields.get(key)
    }

    /// All fields except `hash`, in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &InitDataValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn user(&self) -> Option<&WebAppUser> {
        match self.fields.get("user") {
            Some(InitDataValue::User(user)) => Some(user),
            _ => None,
        }
    }

    pub fn receiver(&self) -> Option<&WebAppUser> {
        match self.fields.get("receiver") {
            Some(InitDataValue::User(user)) => Some(user),
            _ => None,
        }
    }

    pub fn chat(&self) -> Option<&WebAppChat> {
        match self.fields.get("chat") {
            Some(InitDataValue::Chat(chat)) => Some(chat),
            _ => None,
        }
    }

    pub fn auth_date(&self) -> Option<i64> {
        self.raw("auth_date").and_then(|value| value.parse().ok())
    }

    pub fn query_id(&self) -> Option<&str> {
        self.raw("query_id")
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(InitDataValue::as_raw)
    }

    /// Id of the signed-in user, `NoUser` when `user` is absent or undecodable.
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.user().map(|user| user.id).ok_or(AuthError::NoUser)
    }
}

/// Verifies Mini App init data for one bot.
///
/// Holds the bot token as a secret so it cannot leak through `Debug`.
#[derive(Debug)]
pub struct InitDataVerifier {
    bot_token: SecretString,
    max_age: Option<Duration>,
}

impl InitDataVerifier {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: SecretString::from(bot_token.into()),
            max_age: None,
        }
    }

    /// Rejects init data signed more than `max_age` ago. `None` disables the check.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Validates `init_data` against the current wall clock.
    pub fn verify(&self, init_data: &str) -> Result<VerifiedInitData, AuthError> {
        self.verify_at(init_data, chrono::Utc::now().timestamp())
    }

    /// Validates `init_data` as if the current unix time were `now`.
    pub fn verify_at(&self, init_data: &str, now: i64) -> Result<VerifiedInitData, AuthError> {
        let mut params = parse_init_data(init_data)?;
        let received_hash = params.remove("hash").ok_or(AuthError::MissingHash)?;
        let expected = decode_hash(&received_hash)?;

        let mut mac = keyed_mac(&derive_secret_key(self.bot_token.expose_secret())?)?;
        mac.update(data_check_string(&params).as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&expected).map_err(|_| AuthError::InvalidSignature)?;

        if let Some(max_age) = self.max_age {
            check_freshness(&params, max_age, now)?;
        }

        Ok(VerifiedInitData::from_checked(params))
    }

    /// Verifies and returns the id of the `user` field.
    pub fn extract_user_id(&self, init_data: &str) -> Result<i64, AuthError> {
        self.verify(init_data)?.user_id()
    }
}

/// One-shot verification without expiry check.
pub fn verify(init_data: &str, bot_token: &str) -> Result<VerifiedInitData, AuthError> {
    InitDataVerifier::new(bot_token).verify(init_data)
}

/// One-shot verification returning the signed-in user's id.
pub fn extract_user_id(init_data: &str, bot_token: &str) -> Result<i64, AuthError> {
    verify(init_data, bot_token)?.user_id()
}

/// Builds a signed init data string, the way Telegram does.
///
/// Fields keep the given order in the output; a `hash` field is appended.
/// Used by tests and the `sign-init-data` CLI command.
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> Result<String, AuthError> {
    let sorted: BTreeMap<String, String> = fields
        .iter()
        .filter(|(key, _)| *key != "hash")
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    let mut mac = keyed_mac(&derive_secret_key(bot_token)?)?;
    mac.update(data_check_string(&sorted).as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut pairs: Vec<String> = fields
        .iter()
        .filter(|(key, _)| *key != "hash")
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect();
    pairs.push(format!("hash={}", hash));

    Ok(pairs.join("&"))
}

fn keyed_mac(key: &[u8]) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(key).map_err(|_| AuthError::InvalidSignature)
}

fn derive_secret_key(bot_token: &str) -> Result<Vec<u8>, AuthError> {
    let mut mac = keyed_mac(WEB_APP_DATA_KEY)?;
    mac.update(bot_token.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Telegram sends lowercase hex; anything else cannot match.
fn decode_hash(received: &str) -> Result<Vec<u8>, AuthError> {
    let well_formed = received.len() == HASH_HEX_LEN && received.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !well_formed {
        return Err(AuthError::InvalidSignature);
    }
    hex::decode(received).map_err(|_| AuthError::InvalidSignature)
}

fn check_freshness(params: &BTreeMap<String, String>, max_age: Duration, now: i64) -> Result<(), AuthError> {
    let auth_date: i64 = params
        .get("auth_date")
        .and_then(|value| value.parse().ok())
        .ok_or(AuthError::Expired)?;
    let max_age_secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);

    if now.saturating_sub(auth_date) > max_age_secs {
        return Err(AuthError::Expired);
    }
    Ok(())
}

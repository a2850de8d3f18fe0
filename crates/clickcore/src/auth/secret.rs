use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const COMPARE_DOMAIN: &[u8] = b"clicker-shared-secret";

/// A shared secret such as the webhook secret token.
///
/// Comparison goes through HMAC tags checked with `verify_slice`, so timing
/// does not depend on how many leading bytes of a guess are right.
pub struct SharedSecret {
    secret: SecretString,
}

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
        }
    }

    /// Raw value, for registering the webhook with Telegram.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let Some(expected) = tag(self.secret.expose_secret().as_bytes()) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(candidate.as_bytes()) else {
            return false;
        };
        mac.update(COMPARE_DOMAIN);
        mac.verify_slice(&expected).is_ok()
    }
}

fn tag(key: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(COMPARE_DOMAIN);
    Some(mac.finalize().into_bytes().to_vec())
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

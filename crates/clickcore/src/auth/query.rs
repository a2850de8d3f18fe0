use std::borrow::Cow;
use std::collections::BTreeMap;

use super::AuthError;

/// Parses init data into a key-sorted map.
///
/// Strict: every segment must be `key=value`, keys are unique, and every `%`
/// must start a valid two-digit escape. `+` decodes to a space.
pub(crate) fn parse_init_data(raw: &str) -> Result<BTreeMap<String, String>, AuthError> {
    if raw.is_empty() {
        return Err(AuthError::Missing);
    }

    let mut params = BTreeMap::new();
    for pair in raw.split('&') {
        let (key, value) = pair.split_once('=').ok_or(AuthError::Malformed)?;
        let key = decode_component(key)?;
        let value = decode_component(value)?;
        if params.insert(key, value).is_some() {
            return Err(AuthError::Malformed);
        }
    }

    Ok(params)
}

fn decode_component(raw: &str) -> Result<String, AuthError> {
    // urlencoding passes broken escapes through untouched, so reject them first
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape_ok = bytes
                .get(i + 1..i + 3)
                .is_some_and(|digits| digits.iter().all(u8::is_ascii_hexdigit));
            if !escape_ok {
                return Err(AuthError::Malformed);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(Cow::into_owned)
        .map_err(|_| AuthError::Malformed)
}

/// `key=value` lines in byte order of the keys, joined with `\n`.
pub(crate) fn data_check_string<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    params
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

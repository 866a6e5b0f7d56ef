//! Telegram login-widget verification.
//!
//! The widget redirects back with the user's details plus a `hash` field:
//! HMAC-SHA256 over the remaining fields as sorted `key=value` lines joined
//! by newlines, keyed with SHA256 of the bot token. Logins older than five
//! minutes are rejected regardless of signature.

use std::collections::BTreeMap;
use std::fmt;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const MAX_LOGIN_AGE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    MissingField(&'static str),
    MalformedField(&'static str),
    SignatureMismatch,
    Stale { age_secs: i64 },
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::MissingField(name) => write!(f, "login data is missing field {name}"),
            LoginError::MalformedField(name) => write!(f, "login field {name} is malformed"),
            LoginError::SignatureMismatch => write!(f, "login signature does not verify"),
            LoginError::Stale { age_secs } => {
                write!(f, "login data is stale ({age_secs}s old)")
            }
        }
    }
}

impl std::error::Error for LoginError {}

/// A login whose signature and freshness checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedLogin {
    /// Telegram user ID; doubles as the private-chat ID for the bot.
    pub telegram_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(k, _)| k.as_str() != "hash")
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Verify the widget's redirect fields against the bot token.
pub fn verify_login(
    fields: &BTreeMap<String, String>,
    bot_token: &str,
    now_unix: i64,
) -> Result<VerifiedLogin, LoginError> {
    let hash = fields
        .get("hash")
        .ok_or(LoginError::MissingField("hash"))?;
    let hash_bytes = hex::decode(hash).map_err(|_| LoginError::MalformedField("hash"))?;

    let key = Sha256::digest(bot_token.as_bytes());
    let mut mac =
        HmacSha256::new_from_slice(&key).map_err(|_| LoginError::SignatureMismatch)?;
    mac.update(data_check_string(fields).as_bytes());
    // verify_slice compares in constant time.
    mac.verify_slice(&hash_bytes)
        .map_err(|_| LoginError::SignatureMismatch)?;

    let auth_date: i64 = fields
        .get("auth_date")
        .ok_or(LoginError::MissingField("auth_date"))?
        .parse()
        .map_err(|_| LoginError::MalformedField("auth_date"))?;
    let age_secs = now_unix - auth_date;
    if age_secs > MAX_LOGIN_AGE_SECS {
        return Err(LoginError::Stale { age_secs });
    }

    let telegram_id: i64 = fields
        .get("id")
        .ok_or(LoginError::MissingField("id"))?
        .parse()
        .map_err(|_| LoginError::MalformedField("id"))?;

    Ok(VerifiedLogin {
        telegram_id,
        first_name: fields.get("first_name").cloned(),
        username: fields.get("username").cloned(),
    })
}

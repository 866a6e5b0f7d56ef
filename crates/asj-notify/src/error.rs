//! Error type shared by the outbound messaging clients.

use std::fmt;

/// Errors from the Telegram and mail-relay clients.
#[derive(Debug)]
pub enum NotifyError {
    /// Network or transport failure.
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { code: Option<i64>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Transport(msg) => write!(f, "transport error: {msg}"),
            NotifyError::Api {
                code: Some(c),
                message,
            } => write!(f, "api error code={c}: {message}"),
            NotifyError::Api {
                code: None,
                message,
            } => write!(f, "api error: {message}"),
            NotifyError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Transport(e.to_string())
    }
}

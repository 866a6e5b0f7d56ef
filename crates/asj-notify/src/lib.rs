//! asj-notify: outbound messaging for the show.
//!
//! Telegram Bot API client, mail submission via an HTTP relay, login-widget
//! verification, and the rate-limited bulk worker that drives results
//! distribution. Persistence of task progress lives in asj-db; this crate
//! only reports snapshots through [`bulk::ProgressSink`].

pub mod bulk;
pub mod error;
pub mod login;
pub mod mailer;
pub mod messages;
pub mod telegram;

pub use bulk::{BulkProgress, BulkSender, Outbound, ProgressSink, DEFAULT_PACE};
pub use error::NotifyError;
pub use login::{verify_login, LoginError, VerifiedLogin, MAX_LOGIN_AGE_SECS};
pub use mailer::{Mailer, OutboundMail, RelayMailer};
pub use messages::{results_body, results_subject, ResultsSummary, WonLine};
pub use telegram::{TelegramClient, TELEGRAM_API_BASE};

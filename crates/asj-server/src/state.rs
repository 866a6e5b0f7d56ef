//! Shared runtime state for asj-server.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself. Credentials live in [`Secrets`], loaded from the
//! environment, never from the config document.

use std::sync::Arc;
use std::time::Duration;

use asj_config::ShowConfig;
use asj_notify::{Mailer, RelayMailer, TelegramClient};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::broadcast;
use uuid::Uuid;

pub const ENV_SQUARE_SIGNATURE_KEY: &str = "ASJ_SQUARE_SIGNATURE_KEY";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "ASJ_TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_WEBHOOK_SECRET: &str = "ASJ_TELEGRAM_WEBHOOK_SECRET";

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    TaskProgress {
        task_id: Uuid,
        sent: i32,
        failed: i32,
        total: i32,
    },
    TaskFinished {
        task_id: Uuid,
        status: String,
    },
    LogLine {
        level: String,
        msg: String,
    },
}

/// Credentials read from the environment at startup. Empty strings mean the
/// corresponding integration is disabled; its webhook receiver then refuses
/// every delivery.
#[derive(Clone, Default)]
pub struct Secrets {
    pub square_signature_key: String,
    pub telegram_bot_token: String,
    pub telegram_webhook_secret: String,
}

impl Secrets {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            square_signature_key: var(ENV_SQUARE_SIGNATURE_KEY),
            telegram_bot_token: var(ENV_TELEGRAM_BOT_TOKEN),
            telegram_webhook_secret: var(ENV_TELEGRAM_WEBHOOK_SECRET),
        }
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

/// Cloneable (Arc) handle shared across all Axum handlers.
pub struct AppState {
    pub pool: PgPool,
    pub show: ShowConfig,
    pub secrets: Secrets,
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub mailer: Arc<dyn Mailer>,
    pub telegram: Option<TelegramClient>,
    /// Delay between bulk messages; tests shrink this.
    pub bulk_pace: Duration,
}

impl AppState {
    pub fn new(pool: PgPool, show: ShowConfig, secrets: Secrets) -> Arc<Self> {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        let telegram = (show.telegram.enabled && !secrets.telegram_bot_token.is_empty())
            .then(|| TelegramClient::new(&secrets.telegram_bot_token));
        let mailer: Arc<dyn Mailer> = Arc::new(RelayMailer::new(&show.mail_relay_url));
        Arc::new(Self {
            pool,
            show,
            secrets,
            bus,
            mailer,
            telegram,
            bulk_pace: asj_notify::DEFAULT_PACE,
        })
    }
}

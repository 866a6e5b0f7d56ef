//! Telegram webhook processing.
//!
//! Deliveries carry the shared secret registered with `setWebhook` in the
//! `X-Telegram-Bot-Api-Secret-Token` header; a mismatch is refused with 403.
//! Incoming text messages get a short auto-reply so bidders can confirm the
//! bot is connected.

use anyhow::{anyhow, Result};
use asj_notify::TelegramClient;
use serde::Deserialize;
use tracing::warn;

pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Debug, Deserialize)]
struct Update {
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// Handle one verified update. Returns a short outcome description for the
/// webhook log.
pub async fn process_update(
    client: Option<&TelegramClient>,
    show_name: &str,
    body: &str,
) -> Result<String> {
    let update: Update =
        serde_json::from_str(body).map_err(|e| anyhow!("unparseable Telegram update: {e}"))?;

    let Some(message) = update.message else {
        return Ok("no message in update".to_string());
    };
    if message.text.is_none() {
        return Ok(format!("non-text message from chat {}", message.chat.id));
    }

    let reply = format!(
        "This is the {show_name} art show bot. You will receive your bid \
         results here after the show closes."
    );
    match client {
        Some(client) => {
            if let Err(e) = client.send_message(message.chat.id, &reply).await {
                warn!(chat_id = message.chat.id, error = %e, "auto-reply failed");
                return Ok(format!("auto-reply to chat {} failed", message.chat.id));
            }
            Ok(format!("auto-replied to chat {}", message.chat.id))
        }
        None => Ok("telegram client not configured; update logged only".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_without_message_is_ignored() {
        let outcome = process_update(None, "Concordia 2026", r#"{"update_id":1}"#)
            .await
            .unwrap();
        assert_eq!(outcome, "no message in update");
    }

    #[tokio::test]
    async fn text_message_without_client_logs_only() {
        let body = r#"{"update_id":1,"message":{"chat":{"id":42},"text":"hello"}}"#;
        let outcome = process_update(None, "Concordia 2026", body).await.unwrap();
        assert!(outcome.contains("not configured"));
    }

    #[tokio::test]
    async fn garbage_body_is_an_error() {
        assert!(process_update(None, "X", "not json").await.is_err());
    }
}

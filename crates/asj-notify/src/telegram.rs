//! Minimal Telegram Bot API client.
//!
//! Only the calls the show needs: sending a text message to a chat and
//! registering the webhook. The bot token never appears in logs; errors
//! carry the API description only.

use serde::Deserialize;

use crate::error::NotifyError;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Token deliberately omitted.
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Envelope every Bot API method responds with.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    error_code: Option<i64>,
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(token, TELEGRAM_API_BASE)
    }

    /// Point the client at a different API host (tests use a mock server).
    pub fn with_base_url(token: &str, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await?;

        let parsed: ApiResponse = resp
            .json()
            .await
            .map_err(|e| NotifyError::Decode(e.to_string()))?;
        if !parsed.ok {
            return Err(NotifyError::Api {
                code: parsed.error_code,
                message: parsed
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }
        Ok(())
    }

    /// Send a plain-text message to a chat.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        self.call(
            "sendMessage",
            serde_json::json!({ "chat_id": chat_id, "text": text }),
        )
        .await
    }

    /// Register the webhook URL, with the shared secret Telegram will echo
    /// back in the `X-Telegram-Bot-Api-Secret-Token` header.
    pub async fn set_webhook(&self, url: &str, secret_token: &str) -> Result<(), NotifyError> {
        self.call(
            "setWebhook",
            serde_json::json!({ "url": url, "secret_token": secret_token }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn send_message_posts_to_token_path() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/botTEST-TOKEN/sendMessage")
                .json_body(serde_json::json!({ "chat_id": 42, "text": "hello" }));
            then.status(200).json_body(serde_json::json!({ "ok": true }));
        });

        let client = TelegramClient::with_base_url("TEST-TOKEN", &server.base_url());
        client.send_message(42, "hello").await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn api_failure_surfaces_description() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/botTEST-TOKEN/sendMessage");
            then.status(200).json_body(serde_json::json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            }));
        });

        let client = TelegramClient::with_base_url("TEST-TOKEN", &server.base_url());
        let err = client.send_message(42, "hello").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "api error code=403: Forbidden: bot was blocked by the user"
        );
    }

    #[test]
    fn debug_never_prints_token() {
        let client = TelegramClient::new("SECRET-TOKEN");
        assert!(!format!("{client:?}").contains("SECRET-TOKEN"));
    }
}

//! Mail submission boundary.
//!
//! The show does not speak SMTP itself; messages go to an HTTP relay that
//! queues and delivers them. The trait keeps the bulk worker testable with
//! an in-process recorder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// One outbound email, fully rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMail {
    pub sender: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError>;
}

/// Mailer that POSTs each message as JSON to an HTTP relay.
#[derive(Debug, Clone)]
pub struct RelayMailer {
    http: reqwest::Client,
    relay_url: String,
}

impl RelayMailer {
    pub fn new(relay_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            relay_url: relay_url.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError> {
        let resp = self.http.post(&self.relay_url).json(mail).send().await?;
        if !resp.status().is_success() {
            return Err(NotifyError::Api {
                code: Some(i64::from(resp.status().as_u16())),
                message: "mail relay refused message".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn sample_mail() -> OutboundMail {
        OutboundMail {
            sender: "artshow@example.org".to_string(),
            to: "bidder@example.com".to_string(),
            subject: "Art show results".to_string(),
            body: "You won 2 pieces.".to_string(),
        }
    }

    #[tokio::test]
    async fn relay_mailer_posts_json() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/mail")
                .json_body_obj(&sample_mail());
            then.status(202);
        });

        let mailer = RelayMailer::new(&server.url("/mail"));
        mailer.send(&sample_mail()).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn relay_refusal_is_an_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/mail");
            then.status(503);
        });

        let mailer = RelayMailer::new(&server.url("/mail"));
        let err = mailer.send(&sample_mail()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Api { code: Some(503), .. }));
    }
}

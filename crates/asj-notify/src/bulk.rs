//! Rate-limited bulk sending.
//!
//! Results distribution can queue hundreds of messages; Telegram and the
//! mail relay both throttle, so the worker drains its batch at a fixed pace
//! (one message per second in production). Failures are counted and logged,
//! never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::NotifyError;
use crate::mailer::{Mailer, OutboundMail};
use crate::telegram::TelegramClient;

/// Production pace: one message per second.
pub const DEFAULT_PACE: Duration = Duration::from_secs(1);

/// One queued message, already rendered for its channel.
#[derive(Debug, Clone)]
pub enum Outbound {
    Email(OutboundMail),
    Telegram { chat_id: i64, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkProgress {
    pub sent: i32,
    pub failed: i32,
}

/// Receives a progress snapshot after every delivery attempt; the server
/// persists it on the task row and pushes it to watching clients.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn progress(&self, progress: BulkProgress);
}

/// Sink for callers that do not track progress.
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn progress(&self, _progress: BulkProgress) {}
}

pub struct BulkSender {
    pub mailer: Arc<dyn Mailer>,
    pub telegram: Option<TelegramClient>,
    pub pace: Duration,
}

impl BulkSender {
    /// Drain the batch in order, one message per tick.
    pub async fn send_all(&self, batch: &[Outbound], sink: &dyn ProgressSink) -> BulkProgress {
        let mut ticker = tokio::time::interval(self.pace);
        let mut progress = BulkProgress::default();

        for (index, message) in batch.iter().enumerate() {
            ticker.tick().await;
            let result = match message {
                Outbound::Email(mail) => self.mailer.send(mail).await,
                Outbound::Telegram { chat_id, text } => match &self.telegram {
                    Some(client) => client.send_message(*chat_id, text).await,
                    None => Err(NotifyError::Api {
                        code: None,
                        message: "telegram is not configured".to_string(),
                    }),
                },
            };
            match result {
                Ok(()) => progress.sent += 1,
                Err(e) => {
                    warn!(index, error = %e, "bulk message failed");
                    progress.failed += 1;
                }
            }
            sink.progress(progress).await;
        }
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<OutboundMail>>,
        fail_to: Option<String>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError> {
            if self.fail_to.as_deref() == Some(mail.to.as_str()) {
                return Err(NotifyError::Transport("connection refused".to_string()));
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    struct RecordingSink {
        snapshots: Mutex<Vec<BulkProgress>>,
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn progress(&self, progress: BulkProgress) {
            self.snapshots.lock().unwrap().push(progress);
        }
    }

    fn mail_to(to: &str) -> Outbound {
        Outbound::Email(OutboundMail {
            sender: "artshow@example.org".to_string(),
            to: to.to_string(),
            subject: "Results".to_string(),
            body: "...".to_string(),
        })
    }

    #[tokio::test]
    async fn failures_counted_and_batch_continues() {
        let mailer = Arc::new(RecordingMailer {
            sent: Mutex::new(Vec::new()),
            fail_to: Some("down@example.com".to_string()),
        });
        let sender = BulkSender {
            mailer: mailer.clone(),
            telegram: None,
            pace: Duration::from_millis(1),
        };
        let sink = RecordingSink {
            snapshots: Mutex::new(Vec::new()),
        };

        let batch = vec![
            mail_to("a@example.com"),
            mail_to("down@example.com"),
            mail_to("b@example.com"),
        ];
        let outcome = sender.send_all(&batch, &sink).await;

        assert_eq!(outcome, BulkProgress { sent: 2, failed: 1 });
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);

        // One snapshot per attempt, cumulative.
        let snapshots = sink.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0], BulkProgress { sent: 1, failed: 0 });
        assert_eq!(snapshots[2], BulkProgress { sent: 2, failed: 1 });
    }

    #[tokio::test]
    async fn telegram_without_client_counts_as_failure() {
        let sender = BulkSender {
            mailer: Arc::new(RecordingMailer {
                sent: Mutex::new(Vec::new()),
                fail_to: None,
            }),
            telegram: None,
            pace: Duration::from_millis(1),
        };
        let batch = vec![Outbound::Telegram {
            chat_id: 1,
            text: "hi".to_string(),
        }];
        let outcome = sender.send_all(&batch, &NullSink).await;
        assert_eq!(outcome, BulkProgress { sent: 0, failed: 1 });
    }
}

//! Results distribution: the bulk task that tells every bidder how they did.

use std::sync::Arc;

use asj_db::tasks::{BidderResult, TaskStatus};
use asj_notify::{
    results_body, results_subject, BulkProgress, BulkSender, Outbound, OutboundMail,
    ProgressSink, ResultsSummary, WonLine,
};
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::{error, info};
use uuid::Uuid;

use crate::state::{AppState, BusMsg};

pub const TASK_KIND_RESULTS: &str = "results";

fn summarize(result: &BidderResult) -> ResultsSummary {
    ResultsSummary {
        bidder_name: result.name.clone(),
        won: result
            .won
            .iter()
            .map(|w| WonLine {
                piece_code: w.piece_code.clone(),
                piece_name: w.piece_name.clone(),
                amount: w.amount,
            })
            .collect(),
        outbid_count: result.outbid_count,
        voice_auction_count: result.voice_auction_count,
    }
}

/// Render one bidder's message for whichever channel they have. Telegram
/// wins when the bidder has linked a chat; bidders with neither channel are
/// skipped.
fn render(result: &BidderResult, show_name: &str, sender: &str) -> Option<Outbound> {
    let body = results_body(show_name, &summarize(result));
    if let Some(chat_id) = result.telegram_chat_id {
        return Some(Outbound::Telegram {
            chat_id,
            text: body,
        });
    }
    if !result.email.is_empty() {
        return Some(Outbound::Email(OutboundMail {
            sender: sender.to_string(),
            to: result.email.clone(),
            subject: results_subject(show_name),
            body,
        }));
    }
    None
}

struct DbSink {
    pool: PgPool,
    bus: broadcast::Sender<BusMsg>,
    task_id: Uuid,
    total: i32,
}

#[async_trait]
impl ProgressSink for DbSink {
    async fn progress(&self, progress: BulkProgress) {
        if let Err(e) = asj_db::tasks::update_bulk_progress(
            &self.pool,
            self.task_id,
            progress.sent,
            progress.failed,
        )
        .await
        {
            error!(task_id = %self.task_id, error = %e, "bulk progress write failed");
        }
        let _ = self.bus.send(BusMsg::TaskProgress {
            task_id: self.task_id,
            sent: progress.sent,
            failed: progress.failed,
            total: self.total,
        });
    }
}

/// Create the task row and spawn the sending worker. Returns the task ID
/// the caller polls (or watches on the SSE stream).
pub async fn start_results_task(state: Arc<AppState>) -> anyhow::Result<Uuid> {
    let results = asj_db::tasks::bidder_results(&state.pool).await?;
    let batch: Vec<Outbound> = results
        .iter()
        .filter_map(|r| render(r, &state.show.name, &state.show.email_sender))
        .collect();

    let task_id = Uuid::new_v4();
    asj_db::tasks::create_bulk_task(&state.pool, task_id, TASK_KIND_RESULTS, batch.len() as i32)
        .await?;
    info!(%task_id, recipients = batch.len(), "results distribution started");

    tokio::spawn(run_task(state, task_id, batch));
    Ok(task_id)
}

async fn run_task(state: Arc<AppState>, task_id: Uuid, batch: Vec<Outbound>) {
    let sender = BulkSender {
        mailer: state.mailer.clone(),
        telegram: state.telegram.clone(),
        pace: state.bulk_pace,
    };
    let sink = DbSink {
        pool: state.pool.clone(),
        bus: state.bus.clone(),
        task_id,
        total: batch.len() as i32,
    };

    let outcome = sender.send_all(&batch, &sink).await;
    // Every delivery failing means the channel itself is down.
    let status = if outcome.sent == 0 && outcome.failed > 0 {
        TaskStatus::Failed
    } else {
        TaskStatus::Done
    };
    if let Err(e) = asj_db::tasks::finish_bulk_task(&state.pool, task_id, status).await {
        error!(%task_id, error = %e, "bulk task finish write failed");
    }
    let _ = state.bus.send(BusMsg::TaskFinished {
        task_id,
        status: status.as_str().to_string(),
    });
    info!(%task_id, sent = outcome.sent, failed = outcome.failed, "results distribution finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use asj_db::tasks::WonPieceSummary;
    use asj_money::Cents;

    fn result(email: &str, chat: Option<i64>) -> BidderResult {
        BidderResult {
            bidder_id: 1,
            name: "Pat".to_string(),
            email: email.to_string(),
            telegram_chat_id: chat,
            won: vec![WonPieceSummary {
                piece_code: "12-3".to_string(),
                piece_name: "Sunrise".to_string(),
                amount: Cents::from_dollars(40),
            }],
            outbid_count: 0,
            voice_auction_count: 0,
        }
    }

    #[test]
    fn telegram_preferred_over_email() {
        let out = render(&result("pat@example.com", Some(42)), "Show", "s@example.org");
        assert!(matches!(out, Some(Outbound::Telegram { chat_id: 42, .. })));
    }

    #[test]
    fn email_used_without_chat() {
        let out = render(&result("pat@example.com", None), "Show", "s@example.org");
        match out {
            Some(Outbound::Email(mail)) => {
                assert_eq!(mail.to, "pat@example.com");
                assert_eq!(mail.subject, "Show results");
            }
            other => panic!("expected email, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_bidder_skipped() {
        assert!(render(&result("", None), "Show", "s@example.org").is_none());
    }
}

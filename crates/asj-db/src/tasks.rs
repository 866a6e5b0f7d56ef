//! Webhook log and bulk-messaging task rows.

use anyhow::{anyhow, Context, Result};
use asj_catalog::PieceStatus;
use asj_money::Cents;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Record an inbound webhook body before any processing happens, so a
/// processing crash never loses the delivery.
pub async fn log_webhook_event(pool: &PgPool, source: &str, payload: &str) -> Result<i32> {
    let row = sqlx::query(
        r#"
        insert into webhook_events (source, payload)
        values ($1, $2)
        returning event_id
        "#,
    )
    .bind(source)
    .bind(payload)
    .fetch_one(pool)
    .await
    .context("log_webhook_event failed")?;
    Ok(row.try_get("event_id")?)
}

pub async fn mark_webhook_processed(
    pool: &PgPool,
    event_id: i32,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        update webhook_events
        set processed = true, error = $2
        where event_id = $1
        "#,
    )
    .bind(event_id)
    .bind(error)
    .execute(pool)
    .await
    .context("mark_webhook_processed failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Bulk tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Done => "DONE",
            TaskStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "RUNNING" => Ok(TaskStatus::Running),
            "DONE" => Ok(TaskStatus::Done),
            "FAILED" => Ok(TaskStatus::Failed),
            other => Err(anyhow!("invalid task status: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BulkTaskRow {
    pub task_id: Uuid,
    pub kind: String,
    pub status: TaskStatus,
    pub total: i32,
    pub sent: i32,
    pub failed: i32,
}

pub async fn create_bulk_task(pool: &PgPool, task_id: Uuid, kind: &str, total: i32) -> Result<()> {
    sqlx::query(
        r#"
        insert into bulk_tasks (task_id, kind, total)
        values ($1, $2, $3)
        "#,
    )
    .bind(task_id)
    .bind(kind)
    .bind(total)
    .execute(pool)
    .await
    .context("create_bulk_task failed")?;
    Ok(())
}

/// Progress update from the sending worker; also moves PENDING to RUNNING.
pub async fn update_bulk_progress(
    pool: &PgPool,
    task_id: Uuid,
    sent: i32,
    failed: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        update bulk_tasks
        set sent = $2, failed = $3, status = 'RUNNING', updated_at = now()
        where task_id = $1 and status in ('PENDING', 'RUNNING')
        "#,
    )
    .bind(task_id)
    .bind(sent)
    .bind(failed)
    .execute(pool)
    .await
    .context("update_bulk_progress failed")?;
    Ok(())
}

pub async fn finish_bulk_task(pool: &PgPool, task_id: Uuid, status: TaskStatus) -> Result<()> {
    sqlx::query(
        r#"
        update bulk_tasks
        set status = $2, updated_at = now()
        where task_id = $1
        "#,
    )
    .bind(task_id)
    .bind(status.as_str())
    .execute(pool)
    .await
    .context("finish_bulk_task failed")?;
    Ok(())
}

pub async fn fetch_bulk_task(pool: &PgPool, task_id: Uuid) -> Result<BulkTaskRow> {
    let row = sqlx::query(
        r#"
        select task_id, kind, status, total, sent, failed
        from bulk_tasks
        where task_id = $1
        "#,
    )
    .bind(task_id)
    .fetch_one(pool)
    .await
    .context("fetch_bulk_task failed")?;

    Ok(BulkTaskRow {
        task_id: row.try_get("task_id")?,
        kind: row.try_get("kind")?,
        status: TaskStatus::parse(&row.try_get::<String, _>("status")?)?,
        total: row.try_get("total")?,
        sent: row.try_get("sent")?,
        failed: row.try_get("failed")?,
    })
}

// ---------------------------------------------------------------------------
// Results distribution
// ---------------------------------------------------------------------------

/// One piece a bidder won, for the results message.
#[derive(Debug, Clone)]
pub struct WonPieceSummary {
    pub piece_code: String,
    pub piece_name: String,
    pub amount: Cents,
}

/// Everything the results message for one bidder needs.
#[derive(Debug, Clone)]
pub struct BidderResult {
    pub bidder_id: i32,
    pub name: String,
    pub email: String,
    pub telegram_chat_id: Option<i64>,
    pub won: Vec<WonPieceSummary>,
    /// Pieces the bidder bid on but does not hold the top bid for.
    pub outbid_count: i64,
    /// Pieces the bidder currently tops that went to the voice auction.
    pub voice_auction_count: i64,
}

/// Assemble per-bidder results for every bidder who placed a valid bid.
pub async fn bidder_results(pool: &PgPool) -> Result<Vec<BidderResult>> {
    let bidder_rows = sqlx::query(
        r#"
        select distinct b.bidder_id, p.name, p.email, p.telegram_chat_id
        from bids bd
        join bidders b on b.bidder_id = bd.bidder_id
        join people p on p.person_id = b.person_id
        where not bd.invalid
        order by b.bidder_id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("bidder_results bidders failed")?;

    let mut results = Vec::with_capacity(bidder_rows.len());
    for row in &bidder_rows {
        let bidder_id: i32 = row.try_get("bidder_id")?;

        let won_rows = sqlx::query(
            r#"
            select p.artist_id, p.piece_id, p.name, tb.amount_cents
            from pieces p
            join lateral (
                select b.bidder_id, b.amount_cents
                from bids b
                where b.artist_id = p.artist_id and b.piece_id = p.piece_id
                  and not b.invalid
                order by b.amount_cents desc, b.bid_id desc
                limit 1
            ) tb on true
            where tb.bidder_id = $1 and p.status in ($2, $3)
            order by p.artist_id, p.piece_id
            "#,
        )
        .bind(bidder_id)
        .bind(PieceStatus::Won.as_str())
        .bind(PieceStatus::Sold.as_str())
        .fetch_all(pool)
        .await
        .context("bidder_results won failed")?;

        let won = won_rows
            .iter()
            .map(|r| {
                let artist_id: i32 = r.try_get("artist_id")?;
                let piece_id: i32 = r.try_get("piece_id")?;
                Ok(WonPieceSummary {
                    piece_code: asj_catalog::piece::piece_code(artist_id, piece_id),
                    piece_name: r.try_get("name")?,
                    amount: Cents::new(r.try_get("amount_cents")?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let counts = sqlx::query(
            r#"
            select
              count(*) filter (where tb.bidder_id <> $1)::bigint as outbid,
              count(*) filter (where tb.bidder_id = $1 and p.voice_auction)::bigint as voice
            from pieces p
            join lateral (
                select b.bidder_id
                from bids b
                where b.artist_id = p.artist_id and b.piece_id = p.piece_id
                  and not b.invalid
                order by b.amount_cents desc, b.bid_id desc
                limit 1
            ) tb on true
            where exists (
                select 1 from bids b2
                where b2.artist_id = p.artist_id and b2.piece_id = p.piece_id
                  and b2.bidder_id = $1 and not b2.invalid
            )
            "#,
        )
        .bind(bidder_id)
        .fetch_one(pool)
        .await
        .context("bidder_results counts failed")?;

        results.push(BidderResult {
            bidder_id,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            telegram_chat_id: row.try_get("telegram_chat_id")?,
            won,
            outbid_count: counts.try_get("outbid")?,
            voice_auction_count: counts.try_get("voice")?,
        });
    }

    Ok(results)
}

//! Artist account payments: the ledger table plus the batch money runs
//! (space fees, winnings and commission, cheques).
//!
//! Each run deletes its own previous entries before writing new ones, so
//! re-running after a correction is safe.

use anyhow::{anyhow, Context, Result};
use asj_ledger::{
    balance, cheque_for_balance, deduction_details, space_fee_description, space_fee_entry,
    winnings_and_commission, ChequeDraft, DeductionDetails, PaymentEntry, PaymentKind,
    PieceSummary,
};
use asj_money::{Cents, RateBps};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::artists::{fetch_artist, list_allocations_for_artist};
use asj_catalog::PieceStatus;

#[derive(Debug, Clone)]
pub struct PaymentRow {
    pub payment_id: i32,
    pub artist_id: i32,
    pub kind: PaymentKind,
    pub amount: Cents,
    pub description: String,
    pub paid_at: DateTime<Utc>,
    pub cheque_number: Option<String>,
    pub payee: Option<String>,
}

pub async fn insert_payment(
    pool: &PgPool,
    artist_id: i32,
    kind: PaymentKind,
    amount: Cents,
    description: &str,
) -> Result<i32> {
    let row = sqlx::query(
        r#"
        insert into payments (artist_id, kind, amount_cents, description)
        values ($1, $2, $3, $4)
        returning payment_id
        "#,
    )
    .bind(artist_id)
    .bind(kind.as_str())
    .bind(amount.raw())
    .bind(description)
    .fetch_one(pool)
    .await
    .context("insert_payment failed")?;
    Ok(row.try_get("payment_id")?)
}

pub async fn artist_payments(pool: &PgPool, artist_id: i32) -> Result<Vec<PaymentRow>> {
    let rows = sqlx::query(
        r#"
        select payment_id, artist_id, kind, amount_cents, description, paid_at,
               cheque_number, payee
        from payments
        where artist_id = $1
        order by payment_id
        "#,
    )
    .bind(artist_id)
    .fetch_all(pool)
    .await
    .context("artist_payments failed")?;

    rows.iter()
        .map(|row| {
            let kind_str: String = row.try_get("kind")?;
            Ok(PaymentRow {
                payment_id: row.try_get("payment_id")?,
                artist_id: row.try_get("artist_id")?,
                kind: PaymentKind::parse(&kind_str)
                    .ok_or_else(|| anyhow!("unknown payment kind in db: {kind_str}"))?,
                amount: Cents::new(row.try_get("amount_cents")?),
                description: row.try_get("description")?,
                paid_at: row.try_get("paid_at")?,
                cheque_number: row.try_get("cheque_number")?,
                payee: row.try_get("payee")?,
            })
        })
        .collect()
}

fn entries(rows: &[PaymentRow]) -> Vec<PaymentEntry> {
    rows.iter()
        .map(|r| PaymentEntry {
            kind: r.kind,
            amount: r.amount,
        })
        .collect()
}

pub async fn artist_balance(pool: &PgPool, artist_id: i32) -> Result<Cents> {
    let row = sqlx::query(
        "select coalesce(sum(amount_cents), 0)::bigint as balance from payments where artist_id = $1",
    )
    .bind(artist_id)
    .fetch_one(pool)
    .await
    .context("artist_balance failed")?;
    Ok(Cents::new(row.try_get("balance")?))
}

/// Full deduction picture for one artist's account page.
pub async fn artist_deduction_details(pool: &PgPool, artist_id: i32) -> Result<DeductionDetails> {
    let allocations: Vec<_> = list_allocations_for_artist(pool, artist_id)
        .await?
        .iter()
        .map(|a| a.priced())
        .collect();
    let payments = artist_payments(pool, artist_id).await?;
    Ok(deduction_details(&allocations, &entries(&payments)))
}

async fn delete_payments_of_kinds(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    artist_id: i32,
    kinds: &[PaymentKind],
) -> Result<()> {
    let kind_strs: Vec<&str> = kinds.iter().map(PaymentKind::as_str).collect();
    sqlx::query("delete from payments where artist_id = $1 and kind = any($2)")
        .bind(artist_id)
        .bind(&kind_strs)
        .execute(&mut **tx)
        .await
        .context("delete_payments_of_kinds failed")?;
    Ok(())
}

/// Re-derive the space-fee charge for each artist from allocated space.
pub async fn apply_space_fees(pool: &PgPool, artist_ids: &[i32]) -> Result<usize> {
    let mut applied = 0;
    for &artist_id in artist_ids {
        let allocations: Vec<_> = list_allocations_for_artist(pool, artist_id)
            .await?
            .iter()
            .map(|a| a.priced())
            .collect();

        let mut tx = pool.begin().await.context("apply_space_fees begin failed")?;
        delete_payments_of_kinds(&mut tx, artist_id, &[PaymentKind::SpaceFee]).await?;

        if let Some(fee) = space_fee_entry(&allocations) {
            sqlx::query(
                r#"
                insert into payments (artist_id, kind, amount_cents, description)
                values ($1, $2, $3, $4)
                "#,
            )
            .bind(artist_id)
            .bind(fee.kind.as_str())
            .bind(fee.amount.raw())
            .bind(space_fee_description(&allocations))
            .execute(&mut *tx)
            .await
            .context("apply_space_fees insert failed")?;
            applied += 1;
        }
        tx.commit().await.context("apply_space_fees commit failed")?;
    }
    Ok(applied)
}

async fn piece_summaries(pool: &PgPool, artist_id: i32) -> Result<Vec<PieceSummary>> {
    let rows = sqlx::query(
        r#"
        select
          p.status,
          (select max(b.amount_cents)
           from bids b
           where b.artist_id = p.artist_id and b.piece_id = p.piece_id
             and not b.invalid) as top_cents
        from pieces p
        where p.artist_id = $1
        "#,
    )
    .bind(artist_id)
    .fetch_all(pool)
    .await
    .context("piece_summaries failed")?;

    rows.iter()
        .map(|row| {
            let status = PieceStatus::parse(&row.try_get::<String, _>("status")?)
                .map_err(|e| anyhow!("{e}"))?;
            Ok(PieceSummary {
                was_in_show: !matches!(
                    status,
                    PieceStatus::NotInShow | PieceStatus::NotInShowLocked
                ),
                top_bid: row.try_get::<Option<i64>, _>("top_cents")?.map(Cents::new),
            })
        })
        .collect()
}

/// Re-derive winnings and commission entries for each artist.
pub async fn apply_winnings_and_commission(
    pool: &PgPool,
    artist_ids: &[i32],
    commission_rate: RateBps,
) -> Result<usize> {
    let mut applied = 0;
    for &artist_id in artist_ids {
        let pieces = piece_summaries(pool, artist_id).await?;
        let outcome = winnings_and_commission(&pieces, commission_rate);

        let mut tx = pool
            .begin()
            .await
            .context("apply_winnings_and_commission begin failed")?;
        delete_payments_of_kinds(
            &mut tx,
            artist_id,
            &[PaymentKind::Winnings, PaymentKind::Commission],
        )
        .await?;

        for (entry, description) in [
            (&outcome.winnings, &outcome.winnings_description),
            (&outcome.commission, &outcome.commission_description),
        ] {
            if let Some(entry) = entry {
                sqlx::query(
                    r#"
                    insert into payments (artist_id, kind, amount_cents, description)
                    values ($1, $2, $3, $4)
                    "#,
                )
                .bind(artist_id)
                .bind(entry.kind.as_str())
                .bind(entry.amount.raw())
                .bind(description)
                .execute(&mut *tx)
                .await
                .context("apply_winnings_and_commission insert failed")?;
            }
        }
        tx.commit()
            .await
            .context("apply_winnings_and_commission commit failed")?;
        if outcome.winnings.is_some() {
            applied += 1;
        }
    }
    Ok(applied)
}

/// Draft and record a cheque for each artist whose account shows a positive
/// balance. Returns the drafts for printing.
pub async fn create_cheques(pool: &PgPool, artist_ids: &[i32]) -> Result<Vec<(i32, ChequeDraft)>> {
    let mut drafts = Vec::new();
    for &artist_id in artist_ids {
        let payments = artist_payments(pool, artist_id).await?;
        let bal = balance(&entries(&payments));
        let artist = fetch_artist(pool, artist_id).await?;

        let Some(draft) = cheque_for_balance(bal, artist.cheque_name(), None) else {
            continue;
        };

        sqlx::query(
            r#"
            insert into payments (artist_id, kind, amount_cents, description, payee)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(artist_id)
        .bind(PaymentKind::PaymentSent.as_str())
        .bind(draft.amount.raw())
        .bind(&draft.description)
        .bind(&draft.payee)
        .execute(pool)
        .await
        .context("create_cheques insert failed")?;

        drafts.push((artist_id, draft));
    }
    Ok(drafts)
}

// ---------------------------------------------------------------------------
// Square payments on artist accounts
// ---------------------------------------------------------------------------

/// Record an artist's pending Square payment-link payment.
pub async fn insert_square_payment(
    pool: &PgPool,
    artist_id: i32,
    amount: Cents,
    payment_link_id: &str,
    payment_link_url: &str,
    order_id: &str,
) -> Result<i32> {
    let mut tx = pool.begin().await.context("insert_square_payment begin failed")?;
    let row = sqlx::query(
        r#"
        insert into payments (artist_id, kind, amount_cents, description)
        values ($1, $2, $3, 'Square payment link')
        returning payment_id
        "#,
    )
    .bind(artist_id)
    .bind(PaymentKind::General.as_str())
    .bind(amount.raw())
    .fetch_one(&mut *tx)
    .await
    .context("insert_square_payment failed")?;
    let payment_id: i32 = row.try_get("payment_id")?;

    sqlx::query(
        r#"
        insert into square_payment_details (payment_id, payment_link_id, payment_link_url, order_id)
        values ($1, $2, $3, $4)
        "#,
    )
    .bind(payment_id)
    .bind(payment_link_id)
    .bind(payment_link_url)
    .bind(order_id)
    .execute(&mut *tx)
    .await
    .context("insert_square_payment details failed")?;

    tx.commit().await.context("insert_square_payment commit failed")?;
    Ok(payment_id)
}

/// Webhook follow-up: a Square order completed; stamp the payment ID and,
/// when the event carries one, overwrite the ledger amount with the amount
/// Square actually captured. Returns whether a matching pending payment was
/// found.
pub async fn mark_square_payment_completed(
    pool: &PgPool,
    order_id: &str,
    square_payment_id: &str,
    captured: Option<Cents>,
) -> Result<bool> {
    let mut tx = pool
        .begin()
        .await
        .context("mark_square_payment_completed begin failed")?;
    let row = sqlx::query(
        r#"
        update square_payment_details
        set square_payment_id = $2
        where order_id = $1
        returning payment_id
        "#,
    )
    .bind(order_id)
    .bind(square_payment_id)
    .fetch_optional(&mut *tx)
    .await
    .context("mark_square_payment_completed failed")?;
    let Some(row) = row else {
        return Ok(false);
    };
    let payment_id: i32 = row.try_get("payment_id")?;

    if let Some(amount) = captured {
        sqlx::query("update payments set amount_cents = $2 where payment_id = $1")
            .bind(payment_id)
            .bind(amount.raw())
            .execute(&mut *tx)
            .await
            .context("mark_square_payment_completed amount update failed")?;
    }

    tx.commit()
        .await
        .context("mark_square_payment_completed commit failed")?;
    Ok(true)
}

//! Cashier station: invoices over a bidder's won pieces.

use anyhow::{anyhow, Context, Result};
use asj_catalog::PieceStatus;
use asj_ledger::{invoice_totals, tax_on, InvoicePayment, InvoiceTotals, PaymentMethod};
use asj_money::{Cents, RateBps};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// A won piece awaiting invoicing, with its winning bid.
#[derive(Debug, Clone)]
pub struct WonPieceRow {
    pub artist_id: i32,
    pub piece_id: i32,
    pub name: String,
    pub amount: Cents,
}

/// Won pieces whose top valid bid belongs to this bidder and which are not
/// yet on any invoice.
pub async fn winning_pieces_for_bidder(pool: &PgPool, bidder_id: i32) -> Result<Vec<WonPieceRow>> {
    let rows = sqlx::query(
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
        where p.status = $1
          and tb.bidder_id = $2
          and not exists (
            select 1 from invoice_items ii
            where ii.artist_id = p.artist_id and ii.piece_id = p.piece_id
          )
        order by p.artist_id, p.piece_id
        "#,
    )
    .bind(PieceStatus::Won.as_str())
    .bind(bidder_id)
    .fetch_all(pool)
    .await
    .context("winning_pieces_for_bidder failed")?;

    rows.iter()
        .map(|row| {
            Ok(WonPieceRow {
                artist_id: row.try_get("artist_id")?,
                piece_id: row.try_get("piece_id")?,
                name: row.try_get("name")?,
                amount: Cents::new(row.try_get("amount_cents")?),
            })
        })
        .collect()
}

/// Create an invoice for all of a bidder's uninvoiced won pieces.
///
/// One transaction covers the invoice row, its items, and the Won → Sold
/// transition of every invoiced piece; a piece that slipped out of Won in
/// the meantime aborts the whole invoice.
pub async fn create_invoice(
    pool: &PgPool,
    bidder_id: i32,
    tax_rate: RateBps,
    created_by: &str,
    notes: &str,
) -> Result<i32> {
    let pieces = winning_pieces_for_bidder(pool, bidder_id).await?;
    if pieces.is_empty() {
        return Err(anyhow!("bidder {bidder_id} has no uninvoiced won pieces"));
    }

    let subtotal: Cents = pieces.iter().map(|p| p.amount).sum();
    let tax = tax_on(subtotal, tax_rate);

    let mut tx = pool.begin().await.context("create_invoice begin failed")?;

    let row = sqlx::query(
        r#"
        insert into invoices (bidder_id, tax_paid_cents, created_by, notes)
        values ($1, $2, $3, $4)
        returning invoice_id
        "#,
    )
    .bind(bidder_id)
    .bind(tax.raw())
    .bind(created_by)
    .bind(notes)
    .fetch_one(&mut *tx)
    .await
    .context("create_invoice insert failed")?;
    let invoice_id: i32 = row.try_get("invoice_id")?;

    for piece in &pieces {
        sqlx::query(
            r#"
            insert into invoice_items (invoice_id, artist_id, piece_id, price_cents)
            values ($1, $2, $3, $4)
            "#,
        )
        .bind(invoice_id)
        .bind(piece.artist_id)
        .bind(piece.piece_id)
        .bind(piece.amount.raw())
        .execute(&mut *tx)
        .await
        .context("create_invoice item insert failed")?;

        let res = sqlx::query(
            r#"
            update pieces set status = $3
            where artist_id = $1 and piece_id = $2 and status = $4
            "#,
        )
        .bind(piece.artist_id)
        .bind(piece.piece_id)
        .bind(PieceStatus::Sold.as_str())
        .bind(PieceStatus::Won.as_str())
        .execute(&mut *tx)
        .await
        .context("create_invoice sold update failed")?;

        if res.rows_affected() != 1 {
            return Err(anyhow!(
                "piece {}-{} is no longer Won; invoice aborted",
                piece.artist_id,
                piece.piece_id
            ));
        }
    }

    tx.commit().await.context("create_invoice commit failed")?;
    Ok(invoice_id)
}

#[derive(Debug, Clone)]
pub struct InvoiceItemRow {
    pub artist_id: i32,
    pub piece_id: i32,
    pub piece_name: String,
    pub price: Cents,
}

#[derive(Debug, Clone)]
pub struct InvoicePaymentRow {
    pub invoice_payment_id: i32,
    pub amount: Cents,
    pub method: PaymentMethod,
    pub complete: bool,
    pub notes: String,
    pub square_checkout_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InvoiceRow {
    pub invoice_id: i32,
    pub bidder_id: i32,
    pub tax_paid: Cents,
    pub paid_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub notes: String,
    pub items: Vec<InvoiceItemRow>,
    pub payments: Vec<InvoicePaymentRow>,
}

impl InvoiceRow {
    pub fn totals(&self) -> InvoiceTotals {
        let prices: Vec<Cents> = self.items.iter().map(|i| i.price).collect();
        let payments: Vec<InvoicePayment> = self
            .payments
            .iter()
            .map(|p| InvoicePayment {
                amount: p.amount,
                method: p.method,
                complete: p.complete,
            })
            .collect();
        invoice_totals(&prices, self.tax_paid, &payments)
    }
}

pub async fn fetch_invoice(pool: &PgPool, invoice_id: i32) -> Result<InvoiceRow> {
    let row = sqlx::query(
        r#"
        select invoice_id, bidder_id, tax_paid_cents, paid_date, created_by, notes
        from invoices
        where invoice_id = $1
        "#,
    )
    .bind(invoice_id)
    .fetch_one(pool)
    .await
    .context("fetch_invoice failed")?;

    let item_rows = sqlx::query(
        r#"
        select ii.artist_id, ii.piece_id, p.name as piece_name, ii.price_cents
        from invoice_items ii
        join pieces p on p.artist_id = ii.artist_id and p.piece_id = ii.piece_id
        where ii.invoice_id = $1
        order by p.location, ii.artist_id, ii.piece_id
        "#,
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await
    .context("fetch_invoice items failed")?;

    let payment_rows = sqlx::query(
        r#"
        select invoice_payment_id, amount_cents, method, complete, notes, square_checkout_id
        from invoice_payments
        where invoice_id = $1
        order by invoice_payment_id
        "#,
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await
    .context("fetch_invoice payments failed")?;

    let items = item_rows
        .iter()
        .map(|r| {
            Ok(InvoiceItemRow {
                artist_id: r.try_get("artist_id")?,
                piece_id: r.try_get("piece_id")?,
                piece_name: r.try_get("piece_name")?,
                price: Cents::new(r.try_get("price_cents")?),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let payments = payment_rows
        .iter()
        .map(|r| {
            let code: i16 = r.try_get("method")?;
            Ok(InvoicePaymentRow {
                invoice_payment_id: r.try_get("invoice_payment_id")?,
                amount: Cents::new(r.try_get("amount_cents")?),
                method: PaymentMethod::from_code(code)
                    .ok_or_else(|| anyhow!("unknown payment method code in db: {code}"))?,
                complete: r.try_get("complete")?,
                notes: r.try_get("notes")?,
                square_checkout_id: r.try_get("square_checkout_id")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(InvoiceRow {
        invoice_id: row.try_get("invoice_id")?,
        bidder_id: row.try_get("bidder_id")?,
        tax_paid: Cents::new(row.try_get("tax_paid_cents")?),
        paid_date: row.try_get("paid_date")?,
        created_by: row.try_get("created_by")?,
        notes: row.try_get("notes")?,
        items,
        payments,
    })
}

/// Record a payment against an invoice. Cash, cheque, manually keyed card
/// and "other" complete immediately; Square Terminal payments stay pending
/// until their webhook arrives.
pub async fn record_invoice_payment(
    pool: &PgPool,
    invoice_id: i32,
    amount: Cents,
    method: PaymentMethod,
    notes: &str,
) -> Result<i32> {
    let complete = method.completes_immediately();
    let row = sqlx::query(
        r#"
        insert into invoice_payments (invoice_id, amount_cents, method, complete, notes)
        values ($1, $2, $3, $4, $5)
        returning invoice_payment_id
        "#,
    )
    .bind(invoice_id)
    .bind(amount.raw())
    .bind(method.code())
    .bind(complete)
    .bind(notes)
    .fetch_one(pool)
    .await
    .context("record_invoice_payment failed")?;
    let id: i32 = row.try_get("invoice_payment_id")?;

    if complete {
        settle_if_paid(pool, invoice_id).await?;
    }
    Ok(id)
}

/// Tie a pending Square Terminal checkout to its invoice payment.
pub async fn attach_square_checkout(
    pool: &PgPool,
    invoice_payment_id: i32,
    checkout_id: &str,
) -> Result<()> {
    sqlx::query(
        "update invoice_payments set square_checkout_id = $2 where invoice_payment_id = $1",
    )
    .bind(invoice_payment_id)
    .bind(checkout_id)
    .execute(pool)
    .await
    .context("attach_square_checkout failed")?;
    Ok(())
}

/// Webhook follow-up: a terminal checkout completed. Marks the payment
/// complete and settles the invoice when fully paid. Returns the invoice ID
/// when a matching pending payment was found.
pub async fn complete_square_checkout(pool: &PgPool, checkout_id: &str) -> Result<Option<i32>> {
    let row = sqlx::query(
        r#"
        update invoice_payments
        set complete = true
        where square_checkout_id = $1 and not complete
        returning invoice_id
        "#,
    )
    .bind(checkout_id)
    .fetch_optional(pool)
    .await
    .context("complete_square_checkout failed")?;

    let Some(row) = row else { return Ok(None) };
    let invoice_id: i32 = row.try_get("invoice_id")?;
    settle_if_paid(pool, invoice_id).await?;
    Ok(Some(invoice_id))
}

/// Webhook follow-up: a terminal checkout was cancelled; the pending
/// payment row is removed. Returns the invoice ID when one matched.
pub async fn cancel_square_checkout(pool: &PgPool, checkout_id: &str) -> Result<Option<i32>> {
    let row = sqlx::query(
        r#"
        delete from invoice_payments
        where square_checkout_id = $1 and not complete
        returning invoice_id
        "#,
    )
    .bind(checkout_id)
    .fetch_optional(pool)
    .await
    .context("cancel_square_checkout failed")?;
    match row {
        Some(r) => Ok(Some(r.try_get("invoice_id")?)),
        None => Ok(None),
    }
}

/// Headline show totals for the reports page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShowSummary {
    pub artists: i64,
    pub bidders: i64,
    pub pieces_in_show: i64,
    pub pieces_won: i64,
    pub pieces_sold: i64,
    pub pieces_voice_auction: i64,
    pub valid_bids: i64,
    pub invoices: i64,
    pub invoice_item_total: Cents,
    pub invoice_tax_total: Cents,
}

pub async fn show_summary(pool: &PgPool) -> Result<ShowSummary> {
    let row = sqlx::query(
        r#"
        select
          (select count(*) from artists)::bigint as artists,
          (select count(*) from bidders)::bigint as bidders,
          (select count(*) from pieces where status = $1)::bigint as in_show,
          (select count(*) from pieces where status = $2)::bigint as won,
          (select count(*) from pieces where status = $3)::bigint as sold,
          (select count(*) from pieces where voice_auction)::bigint as voice,
          (select count(*) from bids where not invalid)::bigint as valid_bids,
          (select count(*) from invoices)::bigint as invoices,
          (select coalesce(sum(price_cents), 0) from invoice_items)::bigint as item_total,
          (select coalesce(sum(tax_paid_cents), 0) from invoices)::bigint as tax_total
        "#,
    )
    .bind(PieceStatus::InShow.as_str())
    .bind(PieceStatus::Won.as_str())
    .bind(PieceStatus::Sold.as_str())
    .fetch_one(pool)
    .await
    .context("show_summary failed")?;

    Ok(ShowSummary {
        artists: row.try_get("artists")?,
        bidders: row.try_get("bidders")?,
        pieces_in_show: row.try_get("in_show")?,
        pieces_won: row.try_get("won")?,
        pieces_sold: row.try_get("sold")?,
        pieces_voice_auction: row.try_get("voice")?,
        valid_bids: row.try_get("valid_bids")?,
        invoices: row.try_get("invoices")?,
        invoice_item_total: Cents::new(row.try_get("item_total")?),
        invoice_tax_total: Cents::new(row.try_get("tax_total")?),
    })
}

/// Stamp the invoice paid once complete payments cover items + tax.
async fn settle_if_paid(pool: &PgPool, invoice_id: i32) -> Result<()> {
    let invoice = fetch_invoice(pool, invoice_id).await?;
    let totals = invoice.totals();
    if !totals.payment_remaining.is_positive() && invoice.paid_date.is_none() {
        sqlx::query("update invoices set paid_date = now() where invoice_id = $1")
            .bind(invoice_id)
            .execute(pool)
            .await
            .context("settle_if_paid failed")?;
    }
    Ok(())
}

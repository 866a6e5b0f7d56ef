//! Pieces and bids.
//!
//! Status changes go through the asj-catalog state machine; bid writes go
//! through the bid acceptance rule, inside a transaction holding the piece
//! row lock so concurrent kiosk entries cannot both pass validation.

use anyhow::{anyhow, Context, Result};
use asj_catalog::{
    evaluate_won_status, validate_bid, validate_piece_config, BidCandidate, BidError, BidStage,
    PieceBidView, PieceConfig, PieceEvent, PieceState, PieceStatus, TopBid, WonEvaluation,
};
use asj_money::Cents;
use sqlx::{PgPool, Postgres, Row, Transaction};

#[derive(Debug, Clone)]
pub struct NewPiece {
    pub artist_id: i32,
    pub piece_id: i32,
    pub name: String,
    pub media: String,
    pub adult: bool,
    pub not_for_sale: bool,
    pub min_bid: Option<Cents>,
    pub buy_now: Option<Cents>,
}

/// `max_piece_id` is the show's configured cap
/// ([`asj_catalog::DEFAULT_MAX_PIECE_ID`] when none is set).
pub async fn insert_piece(pool: &PgPool, piece: &NewPiece, max_piece_id: i32) -> Result<()> {
    validate_piece_config(
        &PieceConfig {
            piece_id: piece.piece_id,
            not_for_sale: piece.not_for_sale,
            min_bid: piece.min_bid,
            buy_now: piece.buy_now,
        },
        max_piece_id,
    )
    .map_err(|e| anyhow!("piece {}-{}: {e}", piece.artist_id, piece.piece_id))?;

    sqlx::query(
        r#"
        insert into pieces (
          artist_id, piece_id, name, media, adult, not_for_sale,
          min_bid_cents, buy_now_cents
        ) values ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(piece.artist_id)
    .bind(piece.piece_id)
    .bind(&piece.name)
    .bind(&piece.media)
    .bind(piece.adult)
    .bind(piece.not_for_sale)
    .bind(piece.min_bid.map(Cents::raw))
    .bind(piece.buy_now.map(Cents::raw))
    .execute(pool)
    .await
    .context("insert_piece failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PieceRow {
    pub artist_id: i32,
    pub piece_id: i32,
    pub name: String,
    pub media: String,
    pub adult: bool,
    pub not_for_sale: bool,
    pub min_bid: Option<Cents>,
    pub buy_now: Option<Cents>,
    pub location: String,
    pub status: PieceStatus,
    pub voice_auction: bool,
}

impl PieceRow {
    pub fn state(&self) -> PieceState {
        PieceState::with_status(self.status, !self.location.is_empty())
    }

    pub fn code(&self) -> String {
        asj_catalog::piece::piece_code(self.artist_id, self.piece_id)
    }
}

fn piece_from_row(row: &sqlx::postgres::PgRow) -> Result<PieceRow> {
    Ok(PieceRow {
        artist_id: row.try_get("artist_id")?,
        piece_id: row.try_get("piece_id")?,
        name: row.try_get("name")?,
        media: row.try_get("media")?,
        adult: row.try_get("adult")?,
        not_for_sale: row.try_get("not_for_sale")?,
        min_bid: row.try_get::<Option<i64>, _>("min_bid_cents")?.map(Cents::new),
        buy_now: row.try_get::<Option<i64>, _>("buy_now_cents")?.map(Cents::new),
        location: row.try_get("location")?,
        status: PieceStatus::parse(&row.try_get::<String, _>("status")?)
            .map_err(|e| anyhow!("{e}"))?,
        voice_auction: row.try_get("voice_auction")?,
    })
}

const PIECE_COLUMNS: &str = r#"
    artist_id, piece_id, name, media, adult, not_for_sale,
    min_bid_cents, buy_now_cents, location, status, voice_auction
"#;

pub async fn fetch_piece(pool: &PgPool, artist_id: i32, piece_id: i32) -> Result<PieceRow> {
    let row = sqlx::query(&format!(
        "select {PIECE_COLUMNS} from pieces where artist_id = $1 and piece_id = $2"
    ))
    .bind(artist_id)
    .bind(piece_id)
    .fetch_one(pool)
    .await
    .context("fetch_piece failed")?;
    piece_from_row(&row)
}

pub async fn list_pieces_for_artist(pool: &PgPool, artist_id: i32) -> Result<Vec<PieceRow>> {
    let rows = sqlx::query(&format!(
        "select {PIECE_COLUMNS} from pieces where artist_id = $1 order by piece_id"
    ))
    .bind(artist_id)
    .fetch_all(pool)
    .await
    .context("list_pieces_for_artist failed")?;
    rows.iter().map(piece_from_row).collect()
}

/// Hang a piece at a location (or clear it), driving the status machine.
pub async fn set_piece_location(
    pool: &PgPool,
    artist_id: i32,
    piece_id: i32,
    location: Option<&str>,
) -> Result<PieceStatus> {
    let piece = fetch_piece(pool, artist_id, piece_id).await?;
    let event = match location {
        Some(_) => PieceEvent::AssignLocation,
        None => PieceEvent::ClearLocation,
    };
    let next = piece.state().apply(event).map_err(|e| anyhow!("{e}"))?;

    sqlx::query(
        r#"
        update pieces
        set status = $3, location = $4
        where artist_id = $1 and piece_id = $2
        "#,
    )
    .bind(artist_id)
    .bind(piece_id)
    .bind(next.status.as_str())
    .bind(location.unwrap_or(""))
    .execute(pool)
    .await
    .context("set_piece_location failed")?;

    Ok(next.status)
}

/// Freeze artist edits on an artist's pending pieces ahead of bid-sheet
/// printing. Returns the number of pieces locked.
pub async fn lock_pieces_for_printing(pool: &PgPool, artist_id: i32) -> Result<u64> {
    let res = sqlx::query(
        r#"
        update pieces
        set status = $2
        where artist_id = $1 and status = $3
        "#,
    )
    .bind(artist_id)
    .bind(PieceStatus::NotInShowLocked.as_str())
    .bind(PieceStatus::NotInShow.as_str())
    .execute(pool)
    .await
    .context("lock_pieces_for_printing failed")?;
    Ok(res.rows_affected())
}

pub async fn unlock_pieces(pool: &PgPool, artist_id: i32) -> Result<u64> {
    let res = sqlx::query(
        r#"
        update pieces
        set status = $2
        where artist_id = $1 and status = $3
        "#,
    )
    .bind(artist_id)
    .bind(PieceStatus::NotInShow.as_str())
    .bind(PieceStatus::NotInShowLocked.as_str())
    .execute(pool)
    .await
    .context("unlock_pieces failed")?;
    Ok(res.rows_affected())
}

// ---------------------------------------------------------------------------
// Bids
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewBid {
    pub bidder_id: i32,
    pub amount: Cents,
    pub buy_now_bid: bool,
}

/// Why a bid write failed: a rule rejection the caller can surface as a
/// validation message, or an infrastructure failure.
#[derive(Debug)]
pub enum PlaceBidError {
    Rejected(BidError),
    UnknownPiece { artist_id: i32, piece_id: i32 },
    Db(anyhow::Error),
}

impl std::fmt::Display for PlaceBidError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(e) => write!(f, "{e}"),
            Self::UnknownPiece { artist_id, piece_id } => {
                write!(f, "no such piece {artist_id}-{piece_id}")
            }
            Self::Db(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PlaceBidError {}

impl From<sqlx::Error> for PlaceBidError {
    fn from(e: sqlx::Error) -> Self {
        PlaceBidError::Db(e.into())
    }
}

async fn load_bid_view(
    tx: &mut Transaction<'_, Postgres>,
    artist_id: i32,
    piece_id: i32,
) -> Result<PieceBidView, PlaceBidError> {
    // Piece row lock serializes concurrent bid entry on the same piece.
    let row = sqlx::query(
        r#"
        select status, not_for_sale, min_bid_cents, buy_now_cents
        from pieces
        where artist_id = $1 and piece_id = $2
        for update
        "#,
    )
    .bind(artist_id)
    .bind(piece_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(PlaceBidError::UnknownPiece { artist_id, piece_id })?;

    let top = sqlx::query(
        r#"
        select amount_cents, buy_now_bid
        from bids
        where artist_id = $1 and piece_id = $2 and not invalid
        order by amount_cents desc, bid_id desc
        limit 1
        "#,
    )
    .bind(artist_id)
    .bind(piece_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(PieceBidView {
        status: PieceStatus::parse(&row.try_get::<String, _>("status")?)
            .map_err(|e| PlaceBidError::Db(anyhow!("{e}")))?,
        not_for_sale: row.try_get("not_for_sale")?,
        min_bid: row.try_get::<Option<i64>, _>("min_bid_cents")?.map(Cents::new),
        buy_now: row.try_get::<Option<i64>, _>("buy_now_cents")?.map(Cents::new),
        top_bid: match top {
            Some(t) => Some(TopBid {
                amount: Cents::new(t.try_get("amount_cents")?),
                buy_now_bid: t.try_get("buy_now_bid")?,
            }),
            None => None,
        },
    })
}

async fn insert_bid_row(
    tx: &mut Transaction<'_, Postgres>,
    artist_id: i32,
    piece_id: i32,
    bid: &NewBid,
) -> Result<i32, PlaceBidError> {
    let row = sqlx::query(
        r#"
        insert into bids (artist_id, piece_id, bidder_id, amount_cents, buy_now_bid)
        values ($1, $2, $3, $4, $5)
        returning bid_id
        "#,
    )
    .bind(artist_id)
    .bind(piece_id)
    .bind(bid.bidder_id)
    .bind(bid.amount.raw())
    .bind(bid.buy_now_bid)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.try_get("bid_id")?)
}

/// Validate and record a single bid.
pub async fn place_bid(
    pool: &PgPool,
    artist_id: i32,
    piece_id: i32,
    bid: &NewBid,
) -> Result<i32, PlaceBidError> {
    let mut tx = pool.begin().await?;
    let view = load_bid_view(&mut tx, artist_id, piece_id).await?;
    validate_bid(
        &view,
        &BidCandidate {
            amount: bid.amount,
            buy_now_bid: bid.buy_now_bid,
        },
    )
    .map_err(PlaceBidError::Rejected)?;
    let bid_id = insert_bid_row(&mut tx, artist_id, piece_id, bid).await?;
    tx.commit().await?;
    Ok(bid_id)
}

/// Replace a piece's recorded bids with a bid sheet's full ordered list.
///
/// Each bid is validated in sequence against the sheet as entered so far.
/// On any rejection nothing is written and the failing index is reported.
pub async fn replace_bids(
    pool: &PgPool,
    artist_id: i32,
    piece_id: i32,
    bids: &[NewBid],
) -> Result<(), (usize, PlaceBidError)> {
    let mut tx = pool.begin().await.map_err(|e| (0, e.into()))?;

    let mut view = load_bid_view(&mut tx, artist_id, piece_id).await.map_err(|e| (0, e))?;
    view.top_bid = None;

    sqlx::query("delete from bids where artist_id = $1 and piece_id = $2")
        .bind(artist_id)
        .bind(piece_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| (0, e.into()))?;

    for (index, bid) in bids.iter().enumerate() {
        validate_bid(
            &view,
            &BidCandidate {
                amount: bid.amount,
                buy_now_bid: bid.buy_now_bid,
            },
        )
        .map_err(|e| (index, PlaceBidError::Rejected(e)))?;

        insert_bid_row(&mut tx, artist_id, piece_id, bid)
            .await
            .map_err(|e| (index, e))?;

        view.top_bid = Some(TopBid {
            amount: bid.amount,
            buy_now_bid: bid.buy_now_bid,
        });
    }

    tx.commit().await.map_err(|e| (0, e.into()))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TopBidRow {
    pub bidder_id: i32,
    pub amount: Cents,
    pub buy_now_bid: bool,
}

/// Highest valid bid on a piece, with its bidder.
pub async fn top_bid(pool: &PgPool, artist_id: i32, piece_id: i32) -> Result<Option<TopBidRow>> {
    let row = sqlx::query(
        r#"
        select bidder_id, amount_cents, buy_now_bid
        from bids
        where artist_id = $1 and piece_id = $2 and not invalid
        order by amount_cents desc, bid_id desc
        limit 1
        "#,
    )
    .bind(artist_id)
    .bind(piece_id)
    .fetch_optional(pool)
    .await
    .context("top_bid failed")?;

    match row {
        Some(r) => Ok(Some(TopBidRow {
            bidder_id: r.try_get("bidder_id")?,
            amount: Cents::new(r.try_get("amount_cents")?),
            buy_now_bid: r.try_get("buy_now_bid")?,
        })),
        None => Ok(None),
    }
}

/// Every piece with its top valid bid, for reporting.
pub async fn list_pieces_with_top_bids(
    pool: &PgPool,
) -> Result<Vec<(PieceRow, Option<TopBidRow>)>> {
    let rows = sqlx::query(&format!(
        r#"
        select {PIECE_COLUMNS}, tb.bidder_id as top_bidder_id,
               tb.amount_cents as top_amount_cents, tb.buy_now_bid as top_buy_now_bid
        from pieces
        left join lateral (
            select b.bidder_id, b.amount_cents, b.buy_now_bid
            from bids b
            where b.artist_id = pieces.artist_id and b.piece_id = pieces.piece_id
              and not b.invalid
            order by b.amount_cents desc, b.bid_id desc
            limit 1
        ) tb on true
        order by artist_id, piece_id
        "#
    ))
    .fetch_all(pool)
    .await
    .context("list_pieces_with_top_bids failed")?;

    rows.iter()
        .map(|row| {
            let piece = piece_from_row(row)?;
            let top = match row.try_get::<Option<i32>, _>("top_bidder_id")? {
                Some(bidder_id) => Some(TopBidRow {
                    bidder_id,
                    amount: Cents::new(row.try_get("top_amount_cents")?),
                    buy_now_bid: row.try_get("top_buy_now_bid")?,
                }),
                None => None,
            };
            Ok((piece, top))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Close-stage promotion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct CloseSummary {
    pub marked_won: usize,
    pub voice_auction: usize,
    pub unchanged: usize,
}

/// Evaluate every In Show piece at a bidding stage close.
pub async fn close_bidding(pool: &PgPool, stage: BidStage) -> Result<CloseSummary> {
    let rows = sqlx::query(
        r#"
        select
          p.artist_id,
          p.piece_id,
          p.voice_auction,
          count(b.bid_id) filter (where not b.invalid)::int as valid_bids
        from pieces p
        left join bids b on b.artist_id = p.artist_id and b.piece_id = p.piece_id
        where p.status = $1
        group by p.artist_id, p.piece_id
        "#,
    )
    .bind(PieceStatus::InShow.as_str())
    .fetch_all(pool)
    .await
    .context("close_bidding load failed")?;

    let mut summary = CloseSummary::default();
    let mut tx = pool.begin().await.context("close_bidding begin failed")?;

    for row in &rows {
        let artist_id: i32 = row.try_get("artist_id")?;
        let piece_id: i32 = row.try_get("piece_id")?;
        let already_voice: bool = row.try_get("voice_auction")?;
        let valid_bids: i32 = row.try_get("valid_bids")?;

        match evaluate_won_status(
            stage,
            PieceStatus::InShow,
            valid_bids.max(0) as usize,
            already_voice,
        ) {
            WonEvaluation::Unchanged => summary.unchanged += 1,
            WonEvaluation::Won => {
                sqlx::query(
                    r#"
                    update pieces set status = $3
                    where artist_id = $1 and piece_id = $2 and status = $4
                    "#,
                )
                .bind(artist_id)
                .bind(piece_id)
                .bind(PieceStatus::Won.as_str())
                .bind(PieceStatus::InShow.as_str())
                .execute(&mut *tx)
                .await
                .context("close_bidding won update failed")?;
                summary.marked_won += 1;
            }
            WonEvaluation::VoiceAuction => {
                sqlx::query(
                    r#"
                    update pieces set voice_auction = true
                    where artist_id = $1 and piece_id = $2
                    "#,
                )
                .bind(artist_id)
                .bind(piece_id)
                .execute(&mut *tx)
                .await
                .context("close_bidding voice update failed")?;
                summary.voice_auction += 1;
            }
        }
    }

    tx.commit().await.context("close_bidding commit failed")?;
    Ok(summary)
}

/// Staff action: revert premature Won markings back to In Show and clear
/// voice-auction flags.
pub async fn clear_won_status(pool: &PgPool) -> Result<u64> {
    let res = sqlx::query(
        r#"
        update pieces
        set status = $1, voice_auction = false
        where status = $2
        "#,
    )
    .bind(PieceStatus::InShow.as_str())
    .bind(PieceStatus::Won.as_str())
    .execute(pool)
    .await
    .context("clear_won_status failed")?;
    Ok(res.rows_affected())
}

/// Close-out: every piece still In Show goes back to its artist.
pub async fn apply_returned(pool: &PgPool) -> Result<u64> {
    let res = sqlx::query(
        r#"
        update pieces
        set status = $1
        where status = $2
        "#,
    )
    .bind(PieceStatus::Returned.as_str())
    .bind(PieceStatus::InShow.as_str())
    .execute(pool)
    .await
    .context("apply_returned failed")?;
    Ok(res.rows_affected())
}

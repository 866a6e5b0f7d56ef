//! CSV report generation.
//!
//! Reports are rendered to strings and served with a `text/csv` content
//! type.

use anyhow::{Context, Result};
use sqlx::PgPool;

fn into_csv_string(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().context("csv writer flush failed")?;
    String::from_utf8(bytes).context("csv output was not UTF-8")
}

/// One row per artist: identity, contact, balance.
pub async fn artists_csv(pool: &PgPool) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "artist_id",
        "name",
        "artist_name",
        "email",
        "balance",
    ])
    .context("csv header failed")?;

    for artist in asj_db::artists::list_artists(pool).await? {
        let balance = asj_db::ledger::artist_balance(pool, artist.artist_id).await?;
        wtr.write_record([
            artist.artist_id.to_string(),
            artist.person_name.clone(),
            artist.artist_name.clone(),
            artist.email.clone(),
            balance.to_string(),
        ])
        .context("csv row failed")?;
    }
    into_csv_string(wtr)
}

/// One row per piece with its top valid bid.
pub async fn pieces_csv(pool: &PgPool) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "code",
        "name",
        "media",
        "location",
        "status",
        "voice_auction",
        "min_bid",
        "top_bid",
        "top_bidder_id",
    ])
    .context("csv header failed")?;

    for (piece, top) in asj_db::pieces::list_pieces_with_top_bids(pool).await? {
        wtr.write_record([
            piece.code(),
            piece.name.clone(),
            piece.media.clone(),
            piece.location.clone(),
            piece.status.as_str().to_string(),
            piece.voice_auction.to_string(),
            piece.min_bid.map(|c| c.to_string()).unwrap_or_default(),
            top.as_ref().map(|t| t.amount.to_string()).unwrap_or_default(),
            top.as_ref()
                .map(|t| t.bidder_id.to_string())
                .unwrap_or_default(),
        ])
        .context("csv row failed")?;
    }
    into_csv_string(wtr)
}

/// One row per allocation: requested versus granted space.
pub async fn allocations_csv(pool: &PgPool) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["artist_id", "space", "requested", "allocated"])
        .context("csv header failed")?;

    for alloc in asj_db::artists::list_all_allocations(pool).await? {
        wtr.write_record([
            alloc.artist_id.to_string(),
            alloc.space_shortname.clone(),
            alloc.requested.to_string(),
            alloc.allocated.to_string(),
        ])
        .context("csv row failed")?;
    }
    into_csv_string(wtr)
}

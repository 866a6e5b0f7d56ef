use asj_catalog::BidError;
use asj_db::artists::{insert_artist, insert_person, NewArtist, NewPerson};
use asj_db::bidders::{insert_bidder, NewBidder};
use asj_db::pieces::{
    insert_piece, place_bid, replace_bids, set_piece_location, top_bid, NewBid, NewPiece,
    PlaceBidError,
};
use asj_money::Cents;
use chrono::Utc;
use uuid::Uuid;

fn test_artist_id() -> i32 {
    (Uuid::new_v4().as_u128() % 900_000 + 1_000_000) as i32
}

/// Bid writes must respect the acceptance rule end to end: minimum bid,
/// strict raises, and the all-or-nothing bid-sheet replacement.
///
/// DB-backed test. Skips if ASJ_DATABASE_URL is not set.
#[tokio::test]
async fn bid_rules_enforced() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let url = match std::env::var(asj_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: ASJ_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;
    asj_db::migrate(&pool).await?;

    let person_id = insert_person(
        &pool,
        &NewPerson {
            name: "Test Artist".into(),
            email: "artist@example.com".into(),
            phone: String::new(),
            address: String::new(),
            telegram_chat_id: None,
        },
    )
    .await?;
    let artist_id = insert_artist(
        &pool,
        &NewArtist {
            artist_id: Some(test_artist_id()),
            person_id,
            artist_name: String::new(),
            payment_to: String::new(),
            reservation_date: Utc::now(),
        },
    )
    .await?;

    let bidder_person = insert_person(
        &pool,
        &NewPerson {
            name: "Test Bidder".into(),
            email: "bidder@example.com".into(),
            phone: String::new(),
            address: String::new(),
            telegram_chat_id: None,
        },
    )
    .await?;
    let bidder_id = insert_bidder(
        &pool,
        &NewBidder {
            person_id: bidder_person,
            at_con_contact: String::new(),
        },
    )
    .await?;

    insert_piece(
        &pool,
        &NewPiece {
            artist_id,
            piece_id: 1,
            name: "Sunrise".into(),
            media: "Acrylic".into(),
            adult: false,
            not_for_sale: false,
            min_bid: Some(Cents::from_dollars(10)),
            buy_now: None,
        },
        asj_catalog::DEFAULT_MAX_PIECE_ID,
    )
    .await?;

    // Not hung yet: bids rejected.
    let err = place_bid(
        &pool,
        artist_id,
        1,
        &NewBid {
            bidder_id,
            amount: Cents::from_dollars(10),
            buy_now_bid: false,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        PlaceBidError::Rejected(BidError::PieceNotInShow)
    ));

    set_piece_location(&pool, artist_id, 1, Some("A-1")).await?;

    // Below minimum rejected, at minimum accepted.
    let err = place_bid(
        &pool,
        artist_id,
        1,
        &NewBid {
            bidder_id,
            amount: Cents::from_dollars(9),
            buy_now_bid: false,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        PlaceBidError::Rejected(BidError::BelowMinBid { .. })
    ));

    place_bid(
        &pool,
        artist_id,
        1,
        &NewBid {
            bidder_id,
            amount: Cents::from_dollars(10),
            buy_now_bid: false,
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    // Equal to top rejected; strict raise accepted.
    let err = place_bid(
        &pool,
        artist_id,
        1,
        &NewBid {
            bidder_id,
            amount: Cents::from_dollars(10),
            buy_now_bid: false,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        PlaceBidError::Rejected(BidError::NotAboveTopBid { .. })
    ));

    place_bid(
        &pool,
        artist_id,
        1,
        &NewBid {
            bidder_id,
            amount: Cents::from_dollars(15),
            buy_now_bid: false,
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    let top = top_bid(&pool, artist_id, 1).await?.expect("top bid");
    assert_eq!(top.amount, Cents::from_dollars(15));

    // Bid-sheet replacement: a bad row aborts the whole sheet with its index.
    let sheet = vec![
        NewBid {
            bidder_id,
            amount: Cents::from_dollars(12),
            buy_now_bid: false,
        },
        NewBid {
            bidder_id,
            amount: Cents::from_dollars(12),
            buy_now_bid: false,
        },
    ];
    let (index, err) = replace_bids(&pool, artist_id, 1, &sheet).await.unwrap_err();
    assert_eq!(index, 1);
    assert!(matches!(
        err,
        PlaceBidError::Rejected(BidError::NotAboveTopBid { .. })
    ));
    // The failed replacement must not have destroyed the previous bids.
    let top = top_bid(&pool, artist_id, 1).await?.expect("top bid");
    assert_eq!(top.amount, Cents::from_dollars(15));

    let sheet = vec![
        NewBid {
            bidder_id,
            amount: Cents::from_dollars(12),
            buy_now_bid: false,
        },
        NewBid {
            bidder_id,
            amount: Cents::from_dollars(20),
            buy_now_bid: false,
        },
    ];
    replace_bids(&pool, artist_id, 1, &sheet)
        .await
        .map_err(|(i, e)| anyhow::anyhow!("row {i}: {e}"))?;
    let top = top_bid(&pool, artist_id, 1).await?.expect("top bid");
    assert_eq!(top.amount, Cents::from_dollars(20));

    Ok(())
}

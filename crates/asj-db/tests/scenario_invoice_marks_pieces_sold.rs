use asj_catalog::{BidStage, PieceStatus};
use asj_db::artists::{insert_artist, insert_person, NewArtist, NewPerson};
use asj_db::bidders::{insert_bidder, NewBidder};
use asj_db::cashier::{
    create_invoice, fetch_invoice, record_invoice_payment, winning_pieces_for_bidder,
};
use asj_db::pieces::{close_bidding, fetch_piece, insert_piece, place_bid, set_piece_location, NewBid, NewPiece};
use asj_ledger::PaymentMethod;
use asj_money::{Cents, RateBps};
use chrono::Utc;
use uuid::Uuid;

fn test_artist_id() -> i32 {
    (Uuid::new_v4().as_u128() % 900_000 + 2_000_000) as i32
}

/// Cashiering: closing the show marks bid-on pieces Won, invoicing marks
/// them Sold in the same transaction, and a cash payment settles the
/// invoice.
///
/// DB-backed test. Skips if ASJ_DATABASE_URL is not set.
#[tokio::test]
async fn invoice_marks_pieces_sold() -> anyhow::Result<()> {
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
            name: "Invoicing Artist".into(),
            email: String::new(),
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
            name: "Winning Bidder".into(),
            email: String::new(),
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

    for piece_id in [1, 2] {
        insert_piece(
            &pool,
            &NewPiece {
                artist_id,
                piece_id,
                name: format!("Piece {piece_id}"),
                media: String::new(),
                adult: false,
                not_for_sale: false,
                min_bid: Some(Cents::from_dollars(10)),
                buy_now: None,
            },
            asj_catalog::DEFAULT_MAX_PIECE_ID,
        )
        .await?;
        set_piece_location(&pool, artist_id, piece_id, Some("B-1")).await?;
        place_bid(
            &pool,
            artist_id,
            piece_id,
            &NewBid {
                bidder_id,
                amount: Cents::from_dollars(40),
                buy_now_bid: false,
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    }

    close_bidding(&pool, BidStage::Final).await?;
    assert_eq!(
        fetch_piece(&pool, artist_id, 1).await?.status,
        PieceStatus::Won
    );

    let winning = winning_pieces_for_bidder(&pool, bidder_id).await?;
    assert_eq!(winning.len(), 2);

    let tax_rate = RateBps::parse_fraction("0.10").expect("rate");
    let invoice_id = create_invoice(&pool, bidder_id, tax_rate, "cashier1", "").await?;

    for piece_id in [1, 2] {
        assert_eq!(
            fetch_piece(&pool, artist_id, piece_id).await?.status,
            PieceStatus::Sold
        );
    }

    let invoice = fetch_invoice(&pool, invoice_id).await?;
    let totals = invoice.totals();
    assert_eq!(totals.item_total, Cents::from_dollars(80));
    assert_eq!(totals.tax_paid, Cents::from_dollars(8));
    assert_eq!(totals.payment_remaining, Cents::from_dollars(88));
    assert!(invoice.paid_date.is_none());

    // Nothing left to invoice for this bidder.
    assert!(winning_pieces_for_bidder(&pool, bidder_id).await?.is_empty());

    record_invoice_payment(
        &pool,
        invoice_id,
        Cents::from_dollars(88),
        PaymentMethod::Cash,
        "",
    )
    .await?;

    let invoice = fetch_invoice(&pool, invoice_id).await?;
    assert_eq!(invoice.totals().payment_remaining, Cents::ZERO);
    assert!(invoice.paid_date.is_some());

    Ok(())
}

//! Axum router and all HTTP handlers for asj-server.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, warn};
use uuid::Uuid;

use asj_catalog::{validate_piece_config, PieceConfig};
use asj_db::artists::{NewArtist, NewPerson};
use asj_db::bidders::NewBidder;
use asj_db::pieces::{NewBid, NewPiece, PlaceBidError};
use asj_notify::LoginError;
use asj_ledger::PaymentMethod;
use asj_money::Cents;

use crate::api_types::*;
use crate::state::AppState;
use crate::{reports, results, square, telegram};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/artists", get(list_artists).post(register_artist))
        .route("/v1/artists/:artist_id", get(artist_account))
        .route(
            "/v1/artists/:artist_id/square-payments",
            post(record_square_payment),
        )
        .route(
            "/v1/artists/:artist_id/pieces",
            get(list_pieces).post(register_piece),
        )
        .route("/v1/artists/:artist_id/pieces/lock", post(lock_pieces))
        .route("/v1/artists/:artist_id/pieces/unlock", post(unlock_pieces))
        .route("/v1/bidders", post(register_bidder))
        .route("/v1/bidders/:bidder_id", get(get_bidder))
        .route("/v1/bidders/:bidder_id/codes", post(assign_code))
        .route("/v1/bidders/:bidder_id/telegram", post(link_telegram))
        .route("/v1/pieces/:artist_id/:piece_id", get(get_piece))
        .route(
            "/v1/pieces/:artist_id/:piece_id/location",
            put(set_location),
        )
        .route("/v1/pieces/:artist_id/:piece_id/bids", put(put_bid_sheet))
        .route(
            "/v1/cashier/bidders/:bidder_id/winnings",
            get(bidder_winnings),
        )
        .route("/v1/cashier/invoices", post(create_invoice))
        .route("/v1/cashier/invoices/:invoice_id", get(get_invoice))
        .route(
            "/v1/cashier/invoices/:invoice_id/payments",
            post(record_payment),
        )
        .route("/v1/tasks/results", post(start_results))
        .route("/v1/tasks/:task_id", get(get_task))
        .route("/v1/stream", get(stream))
        .route("/v1/reports/summary", get(report_summary))
        .route("/v1/reports/artists.csv", get(report_artists))
        .route("/v1/reports/pieces.csv", get(report_pieces))
        .route("/v1/reports/allocations.csv", get(report_allocations))
        .route("/webhooks/square", post(square_webhook))
        .route("/webhooks/telegram", post(telegram_webhook))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

fn envelope(
    status: StatusCode,
    field: Option<&str>,
    message: String,
    index: Option<usize>,
) -> Response {
    (
        status,
        Json(ErrorEnvelope {
            error: ApiError {
                field: field.map(str::to_string),
                message,
                index,
            },
        }),
    )
        .into_response()
}

fn validation(field: &str, message: String, index: Option<usize>) -> Response {
    envelope(StatusCode::UNPROCESSABLE_ENTITY, Some(field), message, index)
}

fn not_found(message: String) -> Response {
    envelope(StatusCode::NOT_FOUND, None, message, None)
}

fn forbidden(message: &str) -> Response {
    envelope(StatusCode::FORBIDDEN, None, message.to_string(), None)
}

fn internal(e: anyhow::Error) -> Response {
    error!(error = %e, "request failed");
    envelope(
        StatusCode::INTERNAL_SERVER_ERROR,
        None,
        "internal error".to_string(),
        None,
    )
}

fn is_row_not_found(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::RowNotFound)
        )
    })
}

/// 404 for a missing row, 500 for everything else.
fn fetch_error(e: anyhow::Error, what: &str) -> Response {
    if is_row_not_found(&e) {
        not_found(format!("no such {what}"))
    } else {
        internal(e)
    }
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        service: "asj-server",
        version: env!("CARGO_PKG_VERSION"),
        show: st.show.name.clone(),
    })
}

// ---------------------------------------------------------------------------
// Artists
// ---------------------------------------------------------------------------

pub(crate) async fn list_artists(State(st): State<Arc<AppState>>) -> Response {
    match asj_db::artists::list_artists(&st.pool).await {
        Ok(artists) => Json(
            artists
                .iter()
                .map(|a| ArtistResponse {
                    artist_id: a.artist_id,
                    name: a.person_name.clone(),
                    artist_name: a.artist_name.clone(),
                    display_name: a.display_name().to_string(),
                })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => internal(e),
    }
}

pub(crate) async fn register_artist(
    State(st): State<Arc<AppState>>,
    Json(req): Json<RegisterArtistRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return validation("name", "name must not be empty".to_string(), None);
    }

    let person = NewPerson {
        name: req.name.clone(),
        email: req.email,
        phone: req.phone,
        address: req.address,
        telegram_chat_id: None,
    };
    let result = async {
        let person_id = asj_db::artists::insert_person(&st.pool, &person).await?;
        asj_db::artists::insert_artist(
            &st.pool,
            &NewArtist {
                artist_id: req.artist_id,
                person_id,
                artist_name: req.artist_name.clone(),
                payment_to: req.payment_to.clone(),
                reservation_date: Utc::now(),
            },
        )
        .await
    }
    .await;

    match result {
        Ok(artist_id) => (
            StatusCode::CREATED,
            Json(ArtistResponse {
                artist_id,
                name: req.name.clone(),
                artist_name: req.artist_name.clone(),
                display_name: if req.artist_name.is_empty() {
                    req.name
                } else {
                    req.artist_name
                },
            }),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

pub(crate) async fn artist_account(
    State(st): State<Arc<AppState>>,
    Path(artist_id): Path<i32>,
) -> Response {
    let artist = match asj_db::artists::fetch_artist(&st.pool, artist_id).await {
        Ok(a) => a,
        Err(e) => return fetch_error(e, "artist"),
    };
    let result = async {
        let balance = asj_db::ledger::artist_balance(&st.pool, artist_id).await?;
        let details = asj_db::ledger::artist_deduction_details(&st.pool, artist_id).await?;
        anyhow::Ok((balance, details))
    }
    .await;

    match result {
        Ok((balance, details)) => Json(ArtistAccountResponse {
            artist_id,
            display_name: artist.display_name().to_string(),
            balance_cents: balance.raw(),
            total_requested_cost_cents: details.total_requested_cost.raw(),
            deduction_to_date_cents: details.deduction_to_date.raw(),
            deduction_remaining_cents: details.deduction_remaining.raw(),
            payment_remaining_cents: details.payment_remaining.raw(),
        })
        .into_response(),
        Err(e) => internal(e),
    }
}

/// Record an artist's Square payment-link payment, pending webhook
/// confirmation.
pub(crate) async fn record_square_payment(
    State(st): State<Arc<AppState>>,
    Path(artist_id): Path<i32>,
    Json(req): Json<SquarePaymentRequest>,
) -> Response {
    if req.amount_cents <= 0 {
        return validation("amount_cents", "amount must be positive".to_string(), None);
    }
    match asj_db::ledger::insert_square_payment(
        &st.pool,
        artist_id,
        Cents::new(req.amount_cents),
        &req.payment_link_id,
        &req.payment_link_url,
        &req.order_id,
    )
    .await
    {
        Ok(payment_id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "payment_id": payment_id })),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

// ---------------------------------------------------------------------------
// Bidders
// ---------------------------------------------------------------------------

pub(crate) async fn register_bidder(
    State(st): State<Arc<AppState>>,
    Json(req): Json<RegisterBidderRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return validation("name", "name must not be empty".to_string(), None);
    }

    let result = async {
        let person_id = asj_db::artists::insert_person(
            &st.pool,
            &NewPerson {
                name: req.name.clone(),
                email: req.email,
                phone: req.phone,
                address: req.address,
                telegram_chat_id: None,
            },
        )
        .await?;
        asj_db::bidders::insert_bidder(
            &st.pool,
            &NewBidder {
                person_id,
                at_con_contact: req.at_con_contact,
            },
        )
        .await
    }
    .await;

    match result {
        Ok(bidder_id) => (
            StatusCode::CREATED,
            Json(BidderResponse {
                bidder_id,
                name: req.name,
                codes: Vec::new(),
            }),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

pub(crate) async fn assign_code(
    State(st): State<Arc<AppState>>,
    Path(bidder_id): Path<i32>,
    Json(req): Json<AssignCodeRequest>,
) -> Response {
    match asj_db::bidders::assign_bidder_code(
        &st.pool,
        bidder_id,
        &req.code,
        st.show.bidder_id_offset,
        st.show.bidder_id_check10,
    )
    .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) if e.to_string().contains("checksum") || e.to_string().contains("malformed") => {
            validation("code", e.to_string(), None)
        }
        Err(e) => internal(e),
    }
}

pub(crate) async fn get_bidder(
    State(st): State<Arc<AppState>>,
    Path(bidder_id): Path<i32>,
) -> Response {
    match asj_db::bidders::fetch_bidder(&st.pool, bidder_id).await {
        Ok(b) => Json(BidderResponse {
            bidder_id: b.bidder_id,
            name: b.person_name,
            codes: b.codes,
        })
        .into_response(),
        Err(e) => fetch_error(e, "bidder"),
    }
}

/// Bind a Telegram account to a bidder from the login widget's redirect
/// fields. The widget's HMAC is checked against the bot token before
/// anything is stored.
pub(crate) async fn link_telegram(
    State(st): State<Arc<AppState>>,
    Path(bidder_id): Path<i32>,
    Json(req): Json<TelegramLinkRequest>,
) -> Response {
    if st.secrets.telegram_bot_token.is_empty() {
        return forbidden("telegram login is not configured");
    }
    let login = match asj_notify::verify_login(
        &req.fields,
        &st.secrets.telegram_bot_token,
        Utc::now().timestamp(),
    ) {
        Ok(login) => login,
        Err(e @ (LoginError::MissingField(_) | LoginError::MalformedField(_))) => {
            return validation("fields", e.to_string(), None)
        }
        Err(e) => {
            warn!(bidder_id, error = %e, "telegram login rejected");
            return forbidden("telegram login verification failed");
        }
    };

    match asj_db::bidders::link_bidder_telegram(&st.pool, bidder_id, login.telegram_id).await {
        Ok(()) => Json(TelegramLinkResponse {
            telegram_id: login.telegram_id,
        })
        .into_response(),
        Err(e) if e.to_string().contains("no such bidder") => not_found(e.to_string()),
        Err(e) => internal(e),
    }
}

// ---------------------------------------------------------------------------
// Pieces and bid entry
// ---------------------------------------------------------------------------

fn piece_response(
    piece: asj_db::pieces::PieceRow,
    top: Option<asj_db::pieces::TopBidRow>,
) -> PieceResponse {
    PieceResponse {
        artist_id: piece.artist_id,
        piece_id: piece.piece_id,
        code: piece.code(),
        name: piece.name,
        media: piece.media,
        status: piece.status.as_str().to_string(),
        location: piece.location,
        voice_auction: piece.voice_auction,
        min_bid_cents: piece.min_bid.map(Cents::raw),
        buy_now_cents: piece.buy_now.map(Cents::raw),
        top_bid: top.map(|t| TopBidResponse {
            bidder_id: t.bidder_id,
            amount_cents: t.amount.raw(),
            buy_now_bid: t.buy_now_bid,
        }),
    }
}

pub(crate) async fn get_piece(
    State(st): State<Arc<AppState>>,
    Path((artist_id, piece_id)): Path<(i32, i32)>,
) -> Response {
    let piece = match asj_db::pieces::fetch_piece(&st.pool, artist_id, piece_id).await {
        Ok(p) => p,
        Err(e) => return fetch_error(e, "piece"),
    };
    let top = match asj_db::pieces::top_bid(&st.pool, artist_id, piece_id).await {
        Ok(t) => t,
        Err(e) => return internal(e),
    };
    Json(piece_response(piece, top)).into_response()
}

pub(crate) async fn list_pieces(
    State(st): State<Arc<AppState>>,
    Path(artist_id): Path<i32>,
) -> Response {
    match asj_db::pieces::list_pieces_for_artist(&st.pool, artist_id).await {
        // Top bids are per-piece lookups; the control-sheet listing skips them.
        Ok(pieces) => Json(
            pieces
                .into_iter()
                .map(|p| piece_response(p, None))
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => internal(e),
    }
}

pub(crate) async fn register_piece(
    State(st): State<Arc<AppState>>,
    Path(artist_id): Path<i32>,
    Json(req): Json<RegisterPieceRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return validation("name", "name must not be empty".to_string(), None);
    }
    let min_bid = req.min_bid_cents.map(Cents::new);
    let buy_now = req.buy_now_cents.map(Cents::new);
    if let Err(e) = validate_piece_config(
        &PieceConfig {
            piece_id: req.piece_id,
            not_for_sale: req.not_for_sale,
            min_bid,
            buy_now,
        },
        st.show.max_piece_id,
    ) {
        return validation("piece_id", e.to_string(), None);
    }

    let piece = NewPiece {
        artist_id,
        piece_id: req.piece_id,
        name: req.name,
        media: req.media,
        adult: req.adult,
        not_for_sale: req.not_for_sale,
        min_bid,
        buy_now,
    };
    match asj_db::pieces::insert_piece(&st.pool, &piece, st.show.max_piece_id).await {
        Ok(()) => match asj_db::pieces::fetch_piece(&st.pool, artist_id, req.piece_id).await {
            Ok(row) => (StatusCode::CREATED, Json(piece_response(row, None))).into_response(),
            Err(e) => internal(e),
        },
        Err(e) => internal(e),
    }
}

/// Move a piece to a panel/table or take it down, following the status
/// machine. An empty or null location clears it.
pub(crate) async fn set_location(
    State(st): State<Arc<AppState>>,
    Path((artist_id, piece_id)): Path<(i32, i32)>,
    Json(req): Json<SetLocationRequest>,
) -> Response {
    let location = req.location.as_deref().filter(|s| !s.trim().is_empty());
    match asj_db::pieces::set_piece_location(&st.pool, artist_id, piece_id, location).await {
        Ok(status) => Json(SetLocationResponse {
            status: status.as_str().to_string(),
        })
        .into_response(),
        Err(e) if is_row_not_found(&e) => not_found("no such piece".to_string()),
        Err(e)
            if e.to_string().contains("transition")
                || e.to_string().contains("invalid piece status") =>
        {
            validation("location", e.to_string(), None)
        }
        Err(e) => internal(e),
    }
}

pub(crate) async fn lock_pieces(
    State(st): State<Arc<AppState>>,
    Path(artist_id): Path<i32>,
) -> Response {
    match asj_db::pieces::lock_pieces_for_printing(&st.pool, artist_id).await {
        Ok(affected) => Json(PieceLockResponse { affected }).into_response(),
        Err(e) => internal(e),
    }
}

pub(crate) async fn unlock_pieces(
    State(st): State<Arc<AppState>>,
    Path(artist_id): Path<i32>,
) -> Response {
    match asj_db::pieces::unlock_pieces(&st.pool, artist_id).await {
        Ok(affected) => Json(PieceLockResponse { affected }).into_response(),
        Err(e) => internal(e),
    }
}

/// Replace a piece's bids with a keyed-in bid sheet. All-or-nothing: the
/// first bad row rejects the whole sheet with its index.
pub(crate) async fn put_bid_sheet(
    State(st): State<Arc<AppState>>,
    Path((artist_id, piece_id)): Path<(i32, i32)>,
    Json(req): Json<BidSheetRequest>,
) -> Response {
    let mut bids = Vec::with_capacity(req.bids.len());
    for (index, entry) in req.bids.iter().enumerate() {
        if entry.amount <= 0 {
            return validation(
                "amount",
                "bid amount must be positive".to_string(),
                Some(index),
            );
        }
        let bidder_id =
            match asj_db::bidders::find_bidder_by_code(&st.pool, &entry.bidder_code).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    return validation(
                        "bidder_code",
                        format!("unknown bidder code {:?}", entry.bidder_code),
                        Some(index),
                    )
                }
                Err(e) => return internal(e),
            };
        bids.push(NewBid {
            bidder_id,
            amount: Cents::from_dollars(entry.amount),
            buy_now_bid: entry.buy_now_bid,
        });
    }

    match asj_db::pieces::replace_bids(&st.pool, artist_id, piece_id, &bids).await {
        Ok(()) => Json(BidSheetResponse {
            accepted: bids.len(),
        })
        .into_response(),
        Err((index, PlaceBidError::Rejected(e))) => {
            validation("amount", e.to_string(), Some(index))
        }
        Err((_, PlaceBidError::UnknownPiece { artist_id, piece_id })) => {
            not_found(format!("no such piece {artist_id}-{piece_id}"))
        }
        Err((_, PlaceBidError::Db(e))) => internal(e),
    }
}

// ---------------------------------------------------------------------------
// Cashier
// ---------------------------------------------------------------------------

pub(crate) async fn bidder_winnings(
    State(st): State<Arc<AppState>>,
    Path(bidder_id): Path<i32>,
) -> Response {
    match asj_db::cashier::winning_pieces_for_bidder(&st.pool, bidder_id).await {
        Ok(pieces) => Json(
            pieces
                .iter()
                .map(|p| WinningPieceResponse {
                    artist_id: p.artist_id,
                    piece_id: p.piece_id,
                    name: p.name.clone(),
                    amount_cents: p.amount.raw(),
                })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => internal(e),
    }
}

fn invoice_response(
    show: &asj_config::ShowConfig,
    invoice: &asj_db::cashier::InvoiceRow,
) -> InvoiceResponse {
    let totals = invoice.totals();
    InvoiceResponse {
        invoice_id: invoice.invoice_id,
        invoice_number: format!("{}{}", show.invoice_prefix, invoice.invoice_id),
        bidder_id: invoice.bidder_id,
        items: invoice
            .items
            .iter()
            .map(|i| InvoiceItemResponse {
                artist_id: i.artist_id,
                piece_id: i.piece_id,
                name: i.piece_name.clone(),
                price_cents: i.price.raw(),
            })
            .collect(),
        item_total_cents: totals.item_total.raw(),
        tax_paid_cents: totals.tax_paid.raw(),
        tax_description: show.tax_description.clone(),
        total_paid_cents: totals.total_paid.raw(),
        payment_remaining_cents: totals.payment_remaining.raw(),
        paid: invoice.paid_date.is_some(),
    }
}

pub(crate) async fn create_invoice(
    State(st): State<Arc<AppState>>,
    Json(req): Json<CreateInvoiceRequest>,
) -> Response {
    let invoice_id = match asj_db::cashier::create_invoice(
        &st.pool,
        req.bidder_id,
        st.show.tax_rate,
        &req.created_by,
        &req.notes,
    )
    .await
    {
        Ok(id) => id,
        Err(e) if e.to_string().contains("no uninvoiced won pieces") => {
            return validation("bidder_id", e.to_string(), None)
        }
        Err(e) => return internal(e),
    };

    match asj_db::cashier::fetch_invoice(&st.pool, invoice_id).await {
        Ok(invoice) => {
            (StatusCode::CREATED, Json(invoice_response(&st.show, &invoice))).into_response()
        }
        Err(e) => internal(e),
    }
}

pub(crate) async fn get_invoice(
    State(st): State<Arc<AppState>>,
    Path(invoice_id): Path<i32>,
) -> Response {
    match asj_db::cashier::fetch_invoice(&st.pool, invoice_id).await {
        Ok(invoice) => Json(invoice_response(&st.show, &invoice)).into_response(),
        Err(e) => fetch_error(e, "invoice"),
    }
}

pub(crate) async fn record_payment(
    State(st): State<Arc<AppState>>,
    Path(invoice_id): Path<i32>,
    Json(req): Json<RecordPaymentRequest>,
) -> Response {
    let Some(method) = PaymentMethod::from_code(req.method) else {
        return validation(
            "method",
            format!("unknown payment method code {}", req.method),
            None,
        );
    };
    if req.amount_cents <= 0 {
        return validation("amount_cents", "amount must be positive".to_string(), None);
    }

    let result = async {
        let payment_id = asj_db::cashier::record_invoice_payment(
            &st.pool,
            invoice_id,
            Cents::new(req.amount_cents),
            method,
            &req.notes,
        )
        .await?;
        if let Some(checkout_id) = &req.square_checkout_id {
            asj_db::cashier::attach_square_checkout(&st.pool, payment_id, checkout_id).await?;
        }
        anyhow::Ok(payment_id)
    }
    .await;

    match result {
        Ok(invoice_payment_id) => Json(RecordPaymentResponse {
            invoice_payment_id,
            complete: method.completes_immediately(),
        })
        .into_response(),
        Err(e) => internal(e),
    }
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

pub(crate) async fn square_webhook(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let signature = headers
        .get(square::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !square::verify_signature(
        &st.secrets.square_signature_key,
        &st.show.square.notification_url,
        &body,
        signature,
    ) {
        warn!("square webhook signature rejected");
        return forbidden("invalid webhook signature");
    }

    let event_id = match asj_db::tasks::log_webhook_event(&st.pool, "square", &body).await {
        Ok(id) => id,
        Err(e) => return internal(e),
    };

    // Logged deliveries always get a 200; Square retries on anything else
    // and the event is already recorded for replay.
    let error = match square::process_event(&st.pool, &body).await {
        Ok(outcome) => {
            tracing::info!(event_id, outcome, "square webhook processed");
            None
        }
        Err(e) => {
            error!(event_id, error = %e, "square webhook processing failed");
            Some(e.to_string())
        }
    };
    if let Err(e) =
        asj_db::tasks::mark_webhook_processed(&st.pool, event_id, error.as_deref()).await
    {
        error!(event_id, error = %e, "webhook log update failed");
    }
    StatusCode::OK.into_response()
}

pub(crate) async fn telegram_webhook(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let secret = headers
        .get(telegram::SECRET_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if st.secrets.telegram_webhook_secret.is_empty()
        || secret != st.secrets.telegram_webhook_secret
    {
        warn!("telegram webhook secret rejected");
        return forbidden("invalid webhook secret");
    }

    let event_id = match asj_db::tasks::log_webhook_event(&st.pool, "telegram", &body).await {
        Ok(id) => id,
        Err(e) => return internal(e),
    };

    let error = match telegram::process_update(st.telegram.as_ref(), &st.show.name, &body).await
    {
        Ok(outcome) => {
            tracing::info!(event_id, outcome, "telegram webhook processed");
            None
        }
        Err(e) => {
            error!(event_id, error = %e, "telegram webhook processing failed");
            Some(e.to_string())
        }
    };
    if let Err(e) =
        asj_db::tasks::mark_webhook_processed(&st.pool, event_id, error.as_deref()).await
    {
        error!(event_id, error = %e, "webhook log update failed");
    }
    StatusCode::OK.into_response()
}

// ---------------------------------------------------------------------------
// Bulk tasks and SSE
// ---------------------------------------------------------------------------

pub(crate) async fn start_results(State(st): State<Arc<AppState>>) -> Response {
    match results::start_results_task(st.clone()).await {
        Ok(task_id) => match asj_db::tasks::fetch_bulk_task(&st.pool, task_id).await {
            Ok(task) => (StatusCode::ACCEPTED, Json(task_response(&task))).into_response(),
            Err(e) => internal(e),
        },
        Err(e) => internal(e),
    }
}

fn task_response(task: &asj_db::tasks::BulkTaskRow) -> TaskResponse {
    TaskResponse {
        task_id: task.task_id,
        kind: task.kind.clone(),
        status: task.status.as_str().to_string(),
        total: task.total,
        sent: task.sent,
        failed: task.failed,
    }
}

pub(crate) async fn get_task(
    State(st): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Response {
    match asj_db::tasks::fetch_bulk_task(&st.pool, task_id).await {
        Ok(task) => Json(task_response(&task)).into_response(),
        Err(e) => fetch_error(e, "task"),
    }
}

pub(crate) async fn stream(
    State(st): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = st.bus.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(msg) => Event::default().json_data(&msg).ok().map(Ok),
            // Lagged receivers skip missed messages rather than erroring out.
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

fn csv_response(result: anyhow::Result<String>) -> Response {
    match result {
        Ok(csv) => ([(header::CONTENT_TYPE, "text/csv")], csv).into_response(),
        Err(e) => internal(e),
    }
}

pub(crate) async fn report_summary(State(st): State<Arc<AppState>>) -> Response {
    match asj_db::cashier::show_summary(&st.pool).await {
        Ok(s) => Json(SummaryResponse {
            artists: s.artists,
            bidders: s.bidders,
            pieces_in_show: s.pieces_in_show,
            pieces_won: s.pieces_won,
            pieces_sold: s.pieces_sold,
            pieces_voice_auction: s.pieces_voice_auction,
            valid_bids: s.valid_bids,
            invoices: s.invoices,
            invoice_item_total_cents: s.invoice_item_total.raw(),
            invoice_tax_total_cents: s.invoice_tax_total.raw(),
        })
        .into_response(),
        Err(e) => internal(e),
    }
}

pub(crate) async fn report_artists(State(st): State<Arc<AppState>>) -> Response {
    csv_response(reports::artists_csv(&st.pool).await)
}

pub(crate) async fn report_pieces(State(st): State<Arc<AppState>>) -> Response {
    csv_response(reports::pieces_csv(&st.pool).await)
}

pub(crate) async fn report_allocations(State(st): State<Arc<AppState>>) -> Response {
    csv_response(reports::allocations_csv(&st.pool).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asj_db::cashier::{InvoiceItemRow, InvoiceRow};

    #[test]
    fn invoice_response_carries_show_money_settings() {
        let show = asj_config::load_layered_yaml_from_strings(&[r#"
show:
  name: Test Show
  year: "2026"
money:
  tax_rate: "0.0825"
  tax_description: County 8.25% Tax
  commission: "0.10"
  invoice_prefix: "2026-"
"#])
        .unwrap()
        .show()
        .unwrap();

        let invoice = InvoiceRow {
            invoice_id: 17,
            bidder_id: 3,
            tax_paid: Cents::from_dollars(8),
            paid_date: None,
            created_by: "cashier1".into(),
            notes: String::new(),
            items: vec![InvoiceItemRow {
                artist_id: 1,
                piece_id: 2,
                piece_name: "Sunrise".into(),
                price: Cents::from_dollars(40),
            }],
            payments: Vec::new(),
        };

        let resp = invoice_response(&show, &invoice);
        assert_eq!(resp.invoice_number, "2026-17");
        assert_eq!(resp.tax_description, "County 8.25% Tax");
        assert_eq!(resp.item_total_cents, 4000);
        assert!(!resp.paid);
    }
}

//! Request and response types for all asj-server HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded by
//! Axum and decoded by tests. No business logic lives here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Which request field the message is about, when one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    /// Index into a submitted list (bid sheets), when one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub show: String,
}

// ---------------------------------------------------------------------------
// Artists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterArtistRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub payment_to: String,
    /// Explicit artist ID, or omitted to take the next free one.
    #[serde(default)]
    pub artist_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistResponse {
    pub artist_id: i32,
    pub name: String,
    pub artist_name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistAccountResponse {
    pub artist_id: i32,
    pub display_name: String,
    pub balance_cents: i64,
    pub total_requested_cost_cents: i64,
    pub deduction_to_date_cents: i64,
    pub deduction_remaining_cents: i64,
    pub payment_remaining_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquarePaymentRequest {
    pub amount_cents: i64,
    pub payment_link_id: String,
    pub payment_link_url: String,
    pub order_id: String,
}

// ---------------------------------------------------------------------------
// Bidders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterBidderRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub at_con_contact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidderResponse {
    pub bidder_id: i32,
    pub name: String,
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignCodeRequest {
    pub code: String,
}

/// Redirect fields from the Telegram login widget, `hash` included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramLinkRequest {
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramLinkResponse {
    pub telegram_id: i64,
}

// ---------------------------------------------------------------------------
// Pieces and bids
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPieceRequest {
    pub piece_id: i32,
    pub name: String,
    #[serde(default)]
    pub media: String,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub not_for_sale: bool,
    #[serde(default)]
    pub min_bid_cents: Option<i64>,
    #[serde(default)]
    pub buy_now_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLocationRequest {
    /// Panel/table name; `null` or empty clears the location.
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLocationResponse {
    pub status: String,
}

/// Count of pieces a print lock/unlock touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceLockResponse {
    pub affected: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceResponse {
    pub artist_id: i32,
    pub piece_id: i32,
    pub code: String,
    pub name: String,
    pub media: String,
    pub status: String,
    pub location: String,
    pub voice_auction: bool,
    pub min_bid_cents: Option<i64>,
    pub buy_now_cents: Option<i64>,
    pub top_bid: Option<TopBidResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopBidResponse {
    pub bidder_id: i32,
    pub amount_cents: i64,
    pub buy_now_bid: bool,
}

/// One row of a paper bid sheet as keyed in at the data-entry station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidEntry {
    /// Printed bidder code, checksum included.
    pub bidder_code: String,
    /// Whole dollars, as written on the sheet.
    pub amount: i64,
    #[serde(default)]
    pub buy_now_bid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidSheetRequest {
    pub bids: Vec<BidEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidSheetResponse {
    pub accepted: usize,
}

// ---------------------------------------------------------------------------
// Cashier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinningPieceResponse {
    pub artist_id: i32,
    pub piece_id: i32,
    pub name: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    pub bidder_id: i32,
    pub created_by: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub invoice_id: i32,
    /// Printed invoice number, e.g. `"2026-17"`.
    pub invoice_number: String,
    pub bidder_id: i32,
    pub items: Vec<InvoiceItemResponse>,
    pub item_total_cents: i64,
    pub tax_paid_cents: i64,
    /// Tax line label from show config, e.g. `"County 8.25% Tax"`.
    pub tax_description: String,
    pub total_paid_cents: i64,
    pub payment_remaining_cents: i64,
    pub paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItemResponse {
    pub artist_id: i32,
    pub piece_id: i32,
    pub name: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount_cents: i64,
    /// Payment method code (0 = not paid .. 5 = Square card).
    pub method: i16,
    #[serde(default)]
    pub notes: String,
    /// Square Terminal checkout to await, for method 5.
    #[serde(default)]
    pub square_checkout_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentResponse {
    pub invoice_payment_id: i32,
    pub complete: bool,
}

/// Headline totals for the reports page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub artists: i64,
    pub bidders: i64,
    pub pieces_in_show: i64,
    pub pieces_won: i64,
    pub pieces_sold: i64,
    pub pieces_voice_auction: i64,
    pub valid_bids: i64,
    pub invoices: i64,
    pub invoice_item_total_cents: i64,
    pub invoice_tax_total_cents: i64,
}

// ---------------------------------------------------------------------------
// Bulk tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: Uuid,
    pub kind: String,
    pub status: String,
    pub total: i32,
    pub sent: i32,
    pub failed: i32,
}

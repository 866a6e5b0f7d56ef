//! asj-catalog: piece and bid domain rules.
//!
//! Pure crate — no IO, no DB. Everything here operates on snapshots handed
//! in by the persistence layer:
//!
//! - [`status`]: explicit state machine for a piece's show lifecycle.
//! - [`piece`]: bid-sheet configuration validation (min bid / buy-now / NFS).
//! - [`bid`]: the bid acceptance rule applied before any bid is persisted.
//! - [`promotion`]: won-status / voice-auction evaluation at close stages.
//! - [`codes`]: mod-11 check-digit bidder codes.

pub mod bid;
pub mod codes;
pub mod piece;
pub mod promotion;
pub mod status;

pub use bid::{validate_bid, BidCandidate, BidError, PieceBidView, TopBid};
pub use codes::{check_code, make_check_digit, CheckDigitError, DEFAULT_CHECK10};
pub use piece::{validate_piece_config, PieceConfig, PieceConfigError, DEFAULT_MAX_PIECE_ID};
pub use promotion::{evaluate_won_status, BidStage, WonEvaluation, VOICE_AUCTION_THRESHOLD};
pub use status::{PieceEvent, PieceState, PieceStatus, StatusTransitionError};

//! Won-status promotion at the close of silent bidding.
//!
//! When staff close a bidding stage, every In Show piece with at least one
//! valid bid either becomes Won or is routed to the voice auction. The
//! decision is a straight threshold on the valid-bid count: pieces that drew
//! heavy silent interest go under the hammer instead of closing quietly.

use crate::status::PieceStatus;

/// Valid-bid count at which a piece escalates to the voice auction.
pub const VOICE_AUCTION_THRESHOLD: usize = 6;

/// Which pass over the bid sheets is being evaluated.
///
/// Intermediate scans record bids but never promote; only the close and
/// final passes settle pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidStage {
    Intermediate,
    Close,
    Final,
}

impl BidStage {
    /// `true` when this stage settles pieces (marks Won / routes to voice).
    pub fn settles(&self) -> bool {
        matches!(self, BidStage::Close | BidStage::Final)
    }
}

/// Outcome of evaluating one piece at a settling stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WonEvaluation {
    /// Piece is not In Show, the stage does not settle, or it drew no valid
    /// bids — nothing changes.
    Unchanged,
    /// Piece closes Won to its top bidder.
    Won,
    /// Piece escalates to the voice auction; status stays In Show with the
    /// voice-auction flag set. The flag never reverts within an evaluation.
    VoiceAuction,
}

/// Evaluate a piece's close-stage outcome.
///
/// `valid_bid_count` is the number of non-invalidated bids recorded for the
/// piece. Pieces already flagged for voice auction stay flagged regardless
/// of the count — the flag is sticky within a stage evaluation.
pub fn evaluate_won_status(
    stage: BidStage,
    status: PieceStatus,
    valid_bid_count: usize,
    already_voice_auction: bool,
) -> WonEvaluation {
    if !stage.settles() || status != PieceStatus::InShow {
        return WonEvaluation::Unchanged;
    }
    if already_voice_auction {
        return WonEvaluation::VoiceAuction;
    }
    if valid_bid_count == 0 {
        return WonEvaluation::Unchanged;
    }
    if valid_bid_count >= VOICE_AUCTION_THRESHOLD {
        WonEvaluation::VoiceAuction
    } else {
        WonEvaluation::Won
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intermediate_stage_never_settles() {
        assert_eq!(
            evaluate_won_status(BidStage::Intermediate, PieceStatus::InShow, 3, false),
            WonEvaluation::Unchanged
        );
    }

    #[test]
    fn no_bids_leaves_piece_unchanged() {
        assert_eq!(
            evaluate_won_status(BidStage::Close, PieceStatus::InShow, 0, false),
            WonEvaluation::Unchanged
        );
    }

    #[test]
    fn few_bids_closes_won() {
        for n in 1..VOICE_AUCTION_THRESHOLD {
            assert_eq!(
                evaluate_won_status(BidStage::Close, PieceStatus::InShow, n, false),
                WonEvaluation::Won,
                "count {n}"
            );
        }
    }

    #[test]
    fn threshold_routes_to_voice_auction() {
        assert_eq!(
            evaluate_won_status(BidStage::Close, PieceStatus::InShow, 6, false),
            WonEvaluation::VoiceAuction
        );
        assert_eq!(
            evaluate_won_status(BidStage::Final, PieceStatus::InShow, 11, false),
            WonEvaluation::VoiceAuction
        );
    }

    #[test]
    fn voice_auction_flag_is_sticky() {
        // Even if bids were invalidated back below the threshold, an already
        // flagged piece stays in the voice auction for this evaluation.
        assert_eq!(
            evaluate_won_status(BidStage::Final, PieceStatus::InShow, 2, true),
            WonEvaluation::VoiceAuction
        );
    }

    #[test]
    fn only_in_show_pieces_are_evaluated() {
        for st in [
            PieceStatus::NotInShow,
            PieceStatus::NotInShowLocked,
            PieceStatus::Won,
            PieceStatus::Sold,
            PieceStatus::Returned,
        ] {
            assert_eq!(
                evaluate_won_status(BidStage::Close, st, 4, false),
                WonEvaluation::Unchanged,
                "{st:?}"
            );
        }
    }
}

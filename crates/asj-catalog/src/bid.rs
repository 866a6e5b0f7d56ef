//! Bid acceptance rule.
//!
//! [`validate_bid`] is the single gate every candidate bid passes before the
//! persistence layer will write it. It is a pure precondition check over a
//! snapshot of the piece ([`PieceBidView`]) — no state beyond the piece and
//! the candidate being evaluated.

use asj_money::Cents;

use crate::status::PieceStatus;

/// The current top bid on a piece, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopBid {
    pub amount: Cents,
    pub buy_now_bid: bool,
}

/// Snapshot of the piece fields the bid rule consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceBidView {
    pub status: PieceStatus,
    pub not_for_sale: bool,
    pub min_bid: Option<Cents>,
    /// Configured buy-now price, if the artist offered one.
    pub buy_now: Option<Cents>,
    /// Highest valid bid currently recorded.
    pub top_bid: Option<TopBid>,
}

/// A candidate bid as entered from the bid sheet or kiosk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidCandidate {
    pub amount: Cents,
    pub buy_now_bid: bool,
}

/// Why a candidate bid was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidError {
    /// Not-for-sale pieces never take bids.
    PieceNotForSale,
    /// New bids require the piece to be hung and In Show.
    PieceNotInShow,
    /// Bid must strictly exceed the current top bid.
    NotAboveTopBid { top: Cents },
    /// A buy-now bid has already finalized this piece.
    BuyNowAlreadyInvoked,
    /// Buy-now is only available as the opening bid.
    BuyNowAfterBids,
    /// The piece has no buy-now price configured.
    BuyNowNotOffered,
    /// A buy-now bid must meet the buy-now price.
    BelowBuyNowPrice { buy_now: Cents },
    /// Every bid must meet the piece's minimum.
    BelowMinBid { min_bid: Cents },
}

impl std::fmt::Display for BidError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PieceNotForSale => write!(f, "not-for-sale piece cannot have bids placed on it"),
            Self::PieceNotInShow => {
                write!(f, "new bids cannot be placed on pieces that are not in show")
            }
            Self::NotAboveTopBid { top } => {
                write!(f, "new bid must be higher than the existing top bid of {top}")
            }
            Self::BuyNowAlreadyInvoked => {
                write!(f, "cannot bid on a piece that has had its buy-now option invoked")
            }
            Self::BuyNowAfterBids => {
                write!(f, "buy-now option is not available on a piece with bids")
            }
            Self::BuyNowNotOffered => write!(f, "buy-now option is not available on this piece"),
            Self::BelowBuyNowPrice { buy_now } => {
                write!(f, "buy-now bid cannot be less than the buy-now price of {buy_now}")
            }
            Self::BelowMinBid { min_bid } => {
                write!(f, "bid cannot be less than the minimum bid of {min_bid}")
            }
        }
    }
}

impl std::error::Error for BidError {}

/// Validate a candidate bid against the piece snapshot.
///
/// Rules, in evaluation order:
/// 1. Not-for-sale pieces reject everything.
/// 2. The piece must be In Show.
/// 3. Against an existing top bid: the amount must strictly exceed it, no
///    bid may follow an invoked buy-now, and a buy-now flag is only allowed
///    on the opening bid.
/// 4. Buy-now bids require a configured buy-now price and must meet it.
/// 5. Every bid must meet the minimum bid.
pub fn validate_bid(piece: &PieceBidView, candidate: &BidCandidate) -> Result<(), BidError> {
    if piece.not_for_sale {
        return Err(BidError::PieceNotForSale);
    }
    if piece.status != PieceStatus::InShow {
        return Err(BidError::PieceNotInShow);
    }

    if let Some(top) = piece.top_bid {
        if candidate.amount <= top.amount {
            return Err(BidError::NotAboveTopBid { top: top.amount });
        }
        if piece.buy_now.is_some() && top.buy_now_bid {
            return Err(BidError::BuyNowAlreadyInvoked);
        }
        if candidate.buy_now_bid {
            return Err(BidError::BuyNowAfterBids);
        }
    }

    if candidate.buy_now_bid {
        let buy_now = piece.buy_now.ok_or(BidError::BuyNowNotOffered)?;
        if candidate.amount < buy_now {
            return Err(BidError::BelowBuyNowPrice { buy_now });
        }
    }

    if let Some(min_bid) = piece.min_bid {
        if candidate.amount < min_bid {
            return Err(BidError::BelowMinBid { min_bid });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_show(min: i64, buy_now: Option<i64>, top: Option<TopBid>) -> PieceBidView {
        PieceBidView {
            status: PieceStatus::InShow,
            not_for_sale: false,
            min_bid: Some(Cents::from_dollars(min)),
            buy_now: buy_now.map(Cents::from_dollars),
            top_bid: top,
        }
    }

    fn bid(amount: i64) -> BidCandidate {
        BidCandidate {
            amount: Cents::from_dollars(amount),
            buy_now_bid: false,
        }
    }

    fn buy_now_bid(amount: i64) -> BidCandidate {
        BidCandidate {
            amount: Cents::from_dollars(amount),
            buy_now_bid: true,
        }
    }

    fn top(amount: i64) -> TopBid {
        TopBid {
            amount: Cents::from_dollars(amount),
            buy_now_bid: false,
        }
    }

    #[test]
    fn opening_bid_at_min_is_accepted() {
        let piece = in_show(10, None, None);
        assert_eq!(validate_bid(&piece, &bid(10)), Ok(()));
    }

    #[test]
    fn not_for_sale_rejects_everything() {
        let mut piece = in_show(10, None, None);
        piece.not_for_sale = true;
        piece.min_bid = None;
        assert_eq!(validate_bid(&piece, &bid(100)), Err(BidError::PieceNotForSale));
    }

    #[test]
    fn piece_must_be_in_show() {
        let mut piece = in_show(10, None, None);
        piece.status = PieceStatus::NotInShow;
        assert_eq!(validate_bid(&piece, &bid(20)), Err(BidError::PieceNotInShow));
        piece.status = PieceStatus::Won;
        assert_eq!(validate_bid(&piece, &bid(20)), Err(BidError::PieceNotInShow));
    }

    #[test]
    fn equal_or_lower_than_top_is_rejected() {
        let piece = in_show(10, None, Some(top(25)));
        assert_eq!(
            validate_bid(&piece, &bid(25)),
            Err(BidError::NotAboveTopBid { top: Cents::from_dollars(25) })
        );
        assert_eq!(
            validate_bid(&piece, &bid(20)),
            Err(BidError::NotAboveTopBid { top: Cents::from_dollars(25) })
        );
        assert_eq!(validate_bid(&piece, &bid(26)), Ok(()));
    }

    #[test]
    fn invoked_buy_now_freezes_the_piece() {
        let piece = in_show(
            10,
            Some(40),
            Some(TopBid {
                amount: Cents::from_dollars(40),
                buy_now_bid: true,
            }),
        );
        assert_eq!(validate_bid(&piece, &bid(50)), Err(BidError::BuyNowAlreadyInvoked));
    }

    #[test]
    fn buy_now_only_available_as_opening_bid() {
        let piece = in_show(10, Some(40), Some(top(15)));
        assert_eq!(
            validate_bid(&piece, &buy_now_bid(40)),
            Err(BidError::BuyNowAfterBids)
        );
    }

    #[test]
    fn buy_now_requires_configured_price() {
        let piece = in_show(10, None, None);
        assert_eq!(
            validate_bid(&piece, &buy_now_bid(40)),
            Err(BidError::BuyNowNotOffered)
        );
    }

    #[test]
    fn buy_now_bid_must_meet_buy_now_price() {
        let piece = in_show(10, Some(40), None);
        assert_eq!(
            validate_bid(&piece, &buy_now_bid(39)),
            Err(BidError::BelowBuyNowPrice { buy_now: Cents::from_dollars(40) })
        );
        assert_eq!(validate_bid(&piece, &buy_now_bid(40)), Ok(()));
    }

    #[test]
    fn below_min_bid_rejected() {
        let piece = in_show(10, None, None);
        assert_eq!(
            validate_bid(&piece, &bid(9)),
            Err(BidError::BelowMinBid { min_bid: Cents::from_dollars(10) })
        );
    }

    #[test]
    fn raise_over_regular_top_with_buy_now_configured_is_fine() {
        // Buy-now configured but never invoked: ordinary raises continue.
        let piece = in_show(10, Some(100), Some(top(15)));
        assert_eq!(validate_bid(&piece, &bid(20)), Ok(()));
    }
}

//! Bid-sheet configuration rules for a piece.
//!
//! A piece is either not-for-sale (display only) or carries a minimum bid,
//! optionally with a buy-now price above it. These are the cross-field
//! checks the original bid sheet enforces before a piece enters the show.

use asj_money::Cents;

/// Ceiling on artist-assigned piece IDs when the show configures none;
/// keeps hand-written codes short.
pub const DEFAULT_MAX_PIECE_ID: i32 = 999;

/// Sale configuration portion of a piece, as entered at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceConfig {
    pub piece_id: i32,
    pub not_for_sale: bool,
    pub min_bid: Option<Cents>,
    pub buy_now: Option<Cents>,
}

/// Errors produced validating a piece's sale configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PieceConfigError {
    /// Piece ID must be between 1 and the show's configured maximum.
    PieceIdOutOfRange { piece_id: i32, max: i32 },
    /// Minimum bid, when given, must be greater than zero.
    NonPositiveMinBid,
    /// Buy-now price, when given, must be greater than zero.
    NonPositiveBuyNow,
    /// A not-for-sale piece cannot carry a minimum bid.
    NotForSaleWithMinBid,
    /// A not-for-sale piece cannot carry a buy-now price.
    NotForSaleWithBuyNow,
    /// A salable piece must have a minimum bid.
    MissingMinBid,
    /// Buy-now must be empty or strictly greater than the minimum bid.
    BuyNowNotAboveMinBid,
}

impl std::fmt::Display for PieceConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PieceIdOutOfRange { piece_id, max } => {
                write!(f, "piece ID {piece_id} must be between 1 and {max}")
            }
            Self::NonPositiveMinBid => write!(f, "minimum bid must be greater than zero"),
            Self::NonPositiveBuyNow => write!(f, "buy-now price must be greater than zero"),
            Self::NotForSaleWithMinBid => {
                write!(f, "a piece cannot be not-for-sale and have a minimum bid")
            }
            Self::NotForSaleWithBuyNow => {
                write!(f, "a piece cannot be not-for-sale and have a buy-now price")
            }
            Self::MissingMinBid => {
                write!(f, "a piece must either be not-for-sale or have a minimum bid")
            }
            Self::BuyNowNotAboveMinBid => {
                write!(f, "buy-now must be empty, or greater than the minimum bid")
            }
        }
    }
}

impl std::error::Error for PieceConfigError {}

/// Validate a piece's sale configuration against the show's piece-ID cap.
pub fn validate_piece_config(cfg: &PieceConfig, max_piece_id: i32) -> Result<(), PieceConfigError> {
    if cfg.piece_id <= 0 || cfg.piece_id > max_piece_id {
        return Err(PieceConfigError::PieceIdOutOfRange {
            piece_id: cfg.piece_id,
            max: max_piece_id,
        });
    }
    if let Some(min_bid) = cfg.min_bid {
        if !min_bid.is_positive() {
            return Err(PieceConfigError::NonPositiveMinBid);
        }
    }
    if let Some(buy_now) = cfg.buy_now {
        if !buy_now.is_positive() {
            return Err(PieceConfigError::NonPositiveBuyNow);
        }
    }
    if cfg.not_for_sale {
        if cfg.min_bid.is_some() {
            return Err(PieceConfigError::NotForSaleWithMinBid);
        }
        if cfg.buy_now.is_some() {
            return Err(PieceConfigError::NotForSaleWithBuyNow);
        }
    } else {
        let min_bid = cfg.min_bid.ok_or(PieceConfigError::MissingMinBid)?;
        if let Some(buy_now) = cfg.buy_now {
            if min_bid >= buy_now {
                return Err(PieceConfigError::BuyNowNotAboveMinBid);
            }
        }
    }
    Ok(())
}

/// Piece code as printed on bid sheets: `"<artist id>-<piece id>"`.
pub fn piece_code(artist_id: i32, piece_id: i32) -> String {
    format!("{artist_id}-{piece_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salable(min: i64, buy_now: Option<i64>) -> PieceConfig {
        PieceConfig {
            piece_id: 1,
            not_for_sale: false,
            min_bid: Some(Cents::from_dollars(min)),
            buy_now: buy_now.map(Cents::from_dollars),
        }
    }

    fn validate_piece_config_default(cfg: &PieceConfig) -> Result<(), PieceConfigError> {
        validate_piece_config(cfg, DEFAULT_MAX_PIECE_ID)
    }

    #[test]
    fn typical_salable_piece_passes() {
        assert_eq!(validate_piece_config_default(&salable(10, None)), Ok(()));
        assert_eq!(validate_piece_config_default(&salable(10, Some(40))), Ok(()));
    }

    #[test]
    fn not_for_sale_piece_passes_without_prices() {
        let cfg = PieceConfig {
            piece_id: 7,
            not_for_sale: true,
            min_bid: None,
            buy_now: None,
        };
        assert_eq!(validate_piece_config_default(&cfg), Ok(()));
    }

    #[test]
    fn piece_id_bounds() {
        let mut cfg = salable(10, None);
        cfg.piece_id = 0;
        assert_eq!(
            validate_piece_config_default(&cfg),
            Err(PieceConfigError::PieceIdOutOfRange {
                piece_id: 0,
                max: DEFAULT_MAX_PIECE_ID,
            })
        );
        cfg.piece_id = DEFAULT_MAX_PIECE_ID + 1;
        assert!(validate_piece_config_default(&cfg).is_err());
        cfg.piece_id = DEFAULT_MAX_PIECE_ID;
        assert_eq!(validate_piece_config_default(&cfg), Ok(()));
    }

    #[test]
    fn configured_piece_id_cap_is_enforced() {
        let mut cfg = salable(10, None);
        cfg.piece_id = 600;
        assert_eq!(validate_piece_config(&cfg, 999), Ok(()));
        let err = validate_piece_config(&cfg, 500).unwrap_err();
        assert_eq!(err, PieceConfigError::PieceIdOutOfRange { piece_id: 600, max: 500 });
        assert_eq!(err.to_string(), "piece ID 600 must be between 1 and 500");
        cfg.piece_id = 500;
        assert_eq!(validate_piece_config(&cfg, 500), Ok(()));
    }

    #[test]
    fn not_for_sale_excludes_prices() {
        let cfg = PieceConfig {
            piece_id: 1,
            not_for_sale: true,
            min_bid: Some(Cents::from_dollars(5)),
            buy_now: None,
        };
        assert_eq!(
            validate_piece_config_default(&cfg),
            Err(PieceConfigError::NotForSaleWithMinBid)
        );
        let cfg = PieceConfig {
            piece_id: 1,
            not_for_sale: true,
            min_bid: None,
            buy_now: Some(Cents::from_dollars(5)),
        };
        assert_eq!(
            validate_piece_config_default(&cfg),
            Err(PieceConfigError::NotForSaleWithBuyNow)
        );
    }

    #[test]
    fn salable_requires_min_bid() {
        let cfg = PieceConfig {
            piece_id: 1,
            not_for_sale: false,
            min_bid: None,
            buy_now: None,
        };
        assert_eq!(validate_piece_config_default(&cfg), Err(PieceConfigError::MissingMinBid));
    }

    #[test]
    fn buy_now_must_exceed_min_bid() {
        assert_eq!(
            validate_piece_config_default(&salable(40, Some(40))),
            Err(PieceConfigError::BuyNowNotAboveMinBid)
        );
        assert_eq!(
            validate_piece_config_default(&salable(40, Some(39))),
            Err(PieceConfigError::BuyNowNotAboveMinBid)
        );
    }

    #[test]
    fn zero_prices_rejected() {
        assert_eq!(
            validate_piece_config_default(&salable(0, None)),
            Err(PieceConfigError::NonPositiveMinBid)
        );
    }

    #[test]
    fn code_format() {
        assert_eq!(piece_code(12, 3), "12-3");
    }
}

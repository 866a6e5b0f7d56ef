//! Artist account ledger rules.
//!
//! An artist's account is an append-only list of signed payments: space fees
//! and commission are negative, sales winnings and money received from the
//! artist are positive, an outbound cheque is negative. Everything here is
//! pure arithmetic over those entries; persistence happens elsewhere.

use asj_allocation::SpaceAmount;
use asj_money::{Cents, RateBps};

// ─── Payment kinds ───────────────────────────────────────────────────────────

/// The ledger-relevant payment categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentKind {
    /// Money received from the artist (reservation fee, general payment).
    General,
    /// Negative charge for allocated space.
    SpaceFee,
    /// Positive credit for pieces sold.
    Winnings,
    /// Negative charge: show's cut of winnings.
    Commission,
    /// Negative entry recording an outbound cheque.
    PaymentSent,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::General => "GENERAL",
            PaymentKind::SpaceFee => "SPACE_FEE",
            PaymentKind::Winnings => "WINNINGS",
            PaymentKind::Commission => "COMMISSION",
            PaymentKind::PaymentSent => "PAYMENT_SENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GENERAL" => Some(PaymentKind::General),
            "SPACE_FEE" => Some(PaymentKind::SpaceFee),
            "WINNINGS" => Some(PaymentKind::Winnings),
            "COMMISSION" => Some(PaymentKind::Commission),
            "PAYMENT_SENT" => Some(PaymentKind::PaymentSent),
            _ => None,
        }
    }
}

/// One signed ledger entry on an artist's account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEntry {
    pub kind: PaymentKind,
    pub amount: Cents,
}

/// Account balance: plain sum of all entries.
pub fn balance(payments: &[PaymentEntry]) -> Cents {
    payments.iter().map(|p| p.amount).sum()
}

// ─── Space fees ──────────────────────────────────────────────────────────────

/// A space allocation priced for fee purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedAllocation {
    /// Space type short name, e.g. `"P"` for panel.
    pub space_shortname: String,
    /// Price per whole unit.
    pub unit_price: Cents,
    pub requested: SpaceAmount,
    pub allocated: SpaceAmount,
}

/// Charge for an amount of space at a per-unit price, half units charged at
/// half price, rounded half up on an odd-cent price.
pub fn space_charge(unit_price: Cents, amount: SpaceAmount) -> Cents {
    let raw = i128::from(unit_price.raw()) * i128::from(amount.halves());
    Cents::new(((raw + 1) / 2) as i64)
}

/// Deduction status of an artist's account, per its allocations and the
/// space-fee entries already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeductionDetails {
    /// Σ unit price × requested over all allocations.
    pub total_requested_cost: Cents,
    /// Space fees already charged (entries are negative; reported positive).
    pub deduction_to_date: Cents,
    /// max(total_requested_cost − deduction_to_date, 0).
    pub deduction_remaining: Cents,
    /// max(deduction_remaining − balance, 0): what the artist still owes.
    pub payment_remaining: Cents,
}

pub fn deduction_details(
    allocations: &[PricedAllocation],
    payments: &[PaymentEntry],
) -> DeductionDetails {
    let total_requested_cost: Cents = allocations
        .iter()
        .map(|a| space_charge(a.unit_price, a.requested))
        .sum();
    let deduction_to_date: Cents = -payments
        .iter()
        .filter(|p| p.kind == PaymentKind::SpaceFee)
        .map(|p| p.amount)
        .sum::<Cents>();
    let deduction_remaining =
        (total_requested_cost - deduction_to_date).clamp_non_negative();
    let payment_remaining =
        (deduction_remaining - balance(payments)).clamp_non_negative();
    DeductionDetails {
        total_requested_cost,
        deduction_to_date,
        deduction_remaining,
        payment_remaining,
    }
}

/// Compute the replacement space-fee entry for an artist.
///
/// Fees are charged on *allocated* space. Returns `None` when nothing was
/// allocated; callers delete any previous space-fee entries either way.
pub fn space_fee_entry(allocations: &[PricedAllocation]) -> Option<PaymentEntry> {
    let total: Cents = allocations
        .iter()
        .map(|a| space_charge(a.unit_price, a.allocated))
        .sum();
    if !total.is_positive() {
        return None;
    }
    Some(PaymentEntry {
        kind: PaymentKind::SpaceFee,
        amount: -total,
    })
}

/// Description string for a space-fee entry: `"P:2, T:1.5"`.
pub fn space_fee_description(allocations: &[PricedAllocation]) -> String {
    allocations
        .iter()
        .map(|a| format!("{}:{}", a.space_shortname, a.allocated))
        .collect::<Vec<_>>()
        .join(", ")
}

// ─── Winnings and commission ─────────────────────────────────────────────────

/// Per-piece summary needed for the winnings run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceSummary {
    /// Counted in the entry description when the piece made it to the show.
    pub was_in_show: bool,
    /// Top valid bid, if any.
    pub top_bid: Option<Cents>,
}

/// Replacement winnings and commission entries for one artist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinningsOutcome {
    /// Positive winnings credit; `None` when no piece reached the show.
    pub winnings: Option<PaymentEntry>,
    pub winnings_description: String,
    /// Negative commission charge; `None` when commission rounds to zero.
    pub commission: Option<PaymentEntry>,
    pub commission_description: String,
}

/// Compute winnings (Σ top valid bid) and commission (winnings × rate).
///
/// Callers delete any previous winnings/commission entries before applying
/// the outcome, so re-running the close is idempotent.
pub fn winnings_and_commission(pieces: &[PieceSummary], rate: RateBps) -> WinningsOutcome {
    let total_pieces = pieces.iter().filter(|p| p.was_in_show).count();
    let pieces_with_bids = pieces.iter().filter(|p| p.top_bid.is_some()).count();
    let total_winnings: Cents = pieces.iter().filter_map(|p| p.top_bid).sum();
    let commission = rate.apply(total_winnings);

    let winnings = (total_pieces > 0).then_some(PaymentEntry {
        kind: PaymentKind::Winnings,
        amount: total_winnings,
    });
    let commission_entry = commission.is_positive().then_some(PaymentEntry {
        kind: PaymentKind::Commission,
        amount: -commission,
    });

    WinningsOutcome {
        winnings,
        winnings_description: format!(
            "{} piece{}, {} with bid{}",
            total_pieces,
            if total_pieces == 1 { "" } else { "s" },
            pieces_with_bids,
            if pieces_with_bids == 1 { "" } else { "s" },
        ),
        commission: commission_entry,
        commission_description: format!("{} of sales", rate.percent_string()),
    }
}

// ─── Cheques ─────────────────────────────────────────────────────────────────

/// A cheque ready to be written, as a negative ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChequeDraft {
    /// Negative: money leaving the show's account.
    pub amount: Cents,
    pub payee: String,
    pub description: String,
}

impl ChequeDraft {
    /// Face value of the cheque (positive).
    pub fn face_value(&self) -> Cents {
        -self.amount
    }

    /// Face value written out for the cheque's word line.
    pub fn amount_words(&self) -> String {
        asj_money::amount_in_words(self.face_value())
    }
}

/// Draft a cheque paying out a positive balance.
///
/// Accounts at zero or in debt get no cheque. `number` is the physical
/// cheque number when already known.
pub fn cheque_for_balance(
    balance: Cents,
    payee: &str,
    number: Option<&str>,
) -> Option<ChequeDraft> {
    if !balance.is_positive() {
        return None;
    }
    let number_str = match number {
        Some(n) => format!("#{n}"),
        None => "pending number".to_string(),
    };
    Some(ChequeDraft {
        amount: -balance,
        payee: payee.to_string(),
        description: format!("Cheque {number_str} Payee {payee}"),
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: PaymentKind, dollars: i64) -> PaymentEntry {
        PaymentEntry {
            kind,
            amount: Cents::from_dollars(dollars),
        }
    }

    fn alloc(shortname: &str, price: i64, requested: &str, allocated: &str) -> PricedAllocation {
        PricedAllocation {
            space_shortname: shortname.to_string(),
            unit_price: Cents::from_dollars(price),
            requested: SpaceAmount::parse(requested).unwrap(),
            allocated: SpaceAmount::parse(allocated).unwrap(),
        }
    }

    #[test]
    fn balance_sums_signed_entries() {
        let payments = vec![
            entry(PaymentKind::General, 30),
            entry(PaymentKind::SpaceFee, -20),
        ];
        assert_eq!(balance(&payments), Cents::from_dollars(10));
    }

    #[test]
    fn half_spaces_charged_half_price() {
        assert_eq!(
            space_charge(Cents::from_dollars(30), SpaceAmount::parse("2.5").unwrap()),
            Cents::from_dollars(75)
        );
        // Odd-cent price on a half unit rounds half up.
        assert_eq!(
            space_charge(Cents::new(1501), SpaceAmount::parse("0.5").unwrap()),
            Cents::new(751)
        );
    }

    #[test]
    fn deduction_details_basic() {
        let allocations = vec![alloc("P", 30, "2", "2"), alloc("T", 40, "1", "1")];
        // $20 of space fees already applied, $50 paid in.
        let payments = vec![
            entry(PaymentKind::SpaceFee, -20),
            entry(PaymentKind::General, 50),
        ];
        let d = deduction_details(&allocations, &payments);
        assert_eq!(d.total_requested_cost, Cents::from_dollars(100));
        assert_eq!(d.deduction_to_date, Cents::from_dollars(20));
        assert_eq!(d.deduction_remaining, Cents::from_dollars(80));
        // Balance is 30, so 50 still expected.
        assert_eq!(d.payment_remaining, Cents::from_dollars(50));
    }

    #[test]
    fn deduction_never_negative() {
        let allocations = vec![alloc("P", 30, "1", "1")];
        let payments = vec![entry(PaymentKind::SpaceFee, -100)];
        let d = deduction_details(&allocations, &payments);
        assert_eq!(d.deduction_remaining, Cents::ZERO);
        assert_eq!(d.payment_remaining, Cents::from_dollars(70));
    }

    #[test]
    fn payment_remaining_never_negative() {
        let allocations = vec![alloc("P", 30, "1", "1")];
        let payments = vec![entry(PaymentKind::General, 500)];
        let d = deduction_details(&allocations, &payments);
        assert_eq!(d.payment_remaining, Cents::ZERO);
    }

    #[test]
    fn space_fee_entry_charges_allocated_not_requested() {
        let allocations = vec![alloc("P", 30, "4", "2.5")];
        let fee = space_fee_entry(&allocations).unwrap();
        assert_eq!(fee.kind, PaymentKind::SpaceFee);
        assert_eq!(fee.amount, Cents::from_dollars(-75));
        assert_eq!(space_fee_description(&allocations), "P:2.5");
    }

    #[test]
    fn no_fee_when_nothing_allocated() {
        let allocations = vec![alloc("P", 30, "4", "0")];
        assert_eq!(space_fee_entry(&allocations), None);
    }

    #[test]
    fn winnings_and_commission_typical() {
        let pieces = vec![
            PieceSummary {
                was_in_show: true,
                top_bid: Some(Cents::from_dollars(100)),
            },
            PieceSummary {
                was_in_show: true,
                top_bid: None,
            },
        ];
        let out = winnings_and_commission(&pieces, RateBps::parse_fraction("0.10").unwrap());
        let w = out.winnings.unwrap();
        assert_eq!(w.amount, Cents::from_dollars(100));
        assert_eq!(out.winnings_description, "2 pieces, 1 with bid");
        let c = out.commission.unwrap();
        assert_eq!(c.amount, Cents::from_dollars(-10));
        assert_eq!(out.commission_description, "10% of sales");
    }

    #[test]
    fn no_entries_for_artist_with_no_show_pieces() {
        let pieces = vec![PieceSummary {
            was_in_show: false,
            top_bid: None,
        }];
        let out = winnings_and_commission(&pieces, RateBps::parse_fraction("0.10").unwrap());
        assert!(out.winnings.is_none());
        assert!(out.commission.is_none());
    }

    #[test]
    fn zero_winnings_still_recorded_when_pieces_shown() {
        let pieces = vec![PieceSummary {
            was_in_show: true,
            top_bid: None,
        }];
        let out = winnings_and_commission(&pieces, RateBps::parse_fraction("0.10").unwrap());
        assert_eq!(out.winnings.unwrap().amount, Cents::ZERO);
        assert!(out.commission.is_none());
    }

    #[test]
    fn cheque_only_for_positive_balance() {
        assert!(cheque_for_balance(Cents::ZERO, "A", None).is_none());
        assert!(cheque_for_balance(Cents::from_dollars(-5), "A", None).is_none());

        let chq = cheque_for_balance(Cents::new(12345), "Jo Artist", Some("104")).unwrap();
        assert_eq!(chq.amount, Cents::new(-12345));
        assert_eq!(chq.face_value(), Cents::new(12345));
        assert_eq!(chq.description, "Cheque #104 Payee Jo Artist");
        assert_eq!(
            chq.amount_words(),
            "one hundred and twenty-three dollars and forty-five cents"
        );
    }

    #[test]
    fn cheque_without_number_pending() {
        let chq = cheque_for_balance(Cents::from_dollars(10), "A", None).unwrap();
        assert_eq!(chq.description, "Cheque pending number Payee A");
    }

    #[test]
    fn payment_kind_roundtrip() {
        for k in [
            PaymentKind::General,
            PaymentKind::SpaceFee,
            PaymentKind::Winnings,
            PaymentKind::Commission,
            PaymentKind::PaymentSent,
        ] {
            assert_eq!(PaymentKind::parse(k.as_str()), Some(k));
        }
        assert_eq!(PaymentKind::parse("REFUND"), None);
    }
}

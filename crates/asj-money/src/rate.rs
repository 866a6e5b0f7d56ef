use crate::Cents;

/// A percentage-style rate in basis points (1 bps = 0.01%).
///
/// The show's 10% sales tax is `RateBps(1000)`; a 10% artist commission is
/// likewise `RateBps(1000)`. Rates never exceed 100% here, so `u32` is ample.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RateBps(u32);

impl RateBps {
    pub const ZERO: RateBps = RateBps(0);

    #[inline]
    pub const fn new(bps: u32) -> Self {
        RateBps(bps)
    }

    /// Parse a decimal fraction such as `"0.10"` into basis points.
    ///
    /// Accepts up to four fractional digits; anything finer than a basis
    /// point is rejected rather than silently truncated.
    pub fn parse_fraction(s: &str) -> Option<RateBps> {
        let s = s.trim();
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if frac_part.len() > 4 {
            return None;
        }
        let int: u32 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };
        let mut frac: u32 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().ok()?
        };
        for _ in frac_part.len()..4 {
            frac *= 10;
        }
        int.checked_mul(10_000)?.checked_add(frac).map(RateBps)
    }

    #[inline]
    pub const fn bps(self) -> u32 {
        self.0
    }

    /// Apply this rate to an amount, rounding half-up to the nearest cent.
    ///
    /// Intermediate math is `i128`, so no realistic amount can overflow.
    pub fn apply(self, amount: Cents) -> Cents {
        let scaled = amount.raw() as i128 * self.0 as i128;
        // Round half away from zero, as 2-dp decimal quantization would.
        let half = if scaled >= 0 { 5_000 } else { -5_000 };
        Cents::new(((scaled + half) / 10_000) as i64)
    }

    /// Render as a whole-percent string for invoices ("10%", "7.25%").
    pub fn percent_string(self) -> String {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            format!("{whole}%")
        } else if frac % 10 == 0 {
            format!("{whole}.{}%", frac / 10)
        } else {
            format!("{whole}.{frac:02}%")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fraction_standard_tax() {
        assert_eq!(RateBps::parse_fraction("0.10"), Some(RateBps::new(1000)));
        assert_eq!(RateBps::parse_fraction("0.0725"), Some(RateBps::new(725)));
        assert_eq!(RateBps::parse_fraction("1"), Some(RateBps::new(10_000)));
    }

    #[test]
    fn parse_fraction_rejects_sub_bps_precision() {
        assert_eq!(RateBps::parse_fraction("0.00001"), None);
    }

    #[test]
    fn parse_fraction_rejects_garbage() {
        assert_eq!(RateBps::parse_fraction("ten percent"), None);
        assert_eq!(RateBps::parse_fraction("-0.1"), None);
    }

    #[test]
    fn apply_ten_percent() {
        let tax = RateBps::new(1000);
        assert_eq!(tax.apply(Cents::from_dollars(100)), Cents::from_dollars(10));
    }

    #[test]
    fn apply_rounds_half_up() {
        // 7.25% of $1.03 = 7.4675 cents -> 7 cents; of $1.00 = 7.25 -> 7;
        // 10% of $0.25 = 2.5 cents -> 3 cents (half-up).
        assert_eq!(RateBps::new(1000).apply(Cents::new(25)), Cents::new(3));
        assert_eq!(RateBps::new(725).apply(Cents::new(103)), Cents::new(7));
    }

    #[test]
    fn apply_negative_amounts_round_away_from_zero() {
        assert_eq!(RateBps::new(1000).apply(Cents::new(-25)), Cents::new(-3));
    }

    #[test]
    fn percent_string_forms() {
        assert_eq!(RateBps::new(1000).percent_string(), "10%");
        assert_eq!(RateBps::new(725).percent_string(), "7.25%");
        assert_eq!(RateBps::new(750).percent_string(), "7.5%");
    }
}

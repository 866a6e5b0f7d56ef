use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A fixed-point monetary amount in whole cents.
///
/// 1 USD = `Cents(100)`.
///
/// # Construction
///
/// Use [`Cents::new`] for explicit construction from a raw cent count, or
/// [`Cents::from_dollars`] for whole-dollar amounts (bids are whole dollars
/// on the bid sheet). There is intentionally no `From<i64>` implementation —
/// callers must be deliberate about when a raw integer represents money.
///
/// # Retrieval
///
/// Use [`Cents::raw`] to extract the underlying `i64` when crossing layer
/// boundaries (DB columns, JSON payloads) that require raw integers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(i64);

impl Cents {
    /// Zero monetary amount.
    pub const ZERO: Cents = Cents(0);

    /// Maximum representable value.
    pub const MAX: Cents = Cents(i64::MAX);

    /// Minimum representable value.
    pub const MIN: Cents = Cents(i64::MIN);

    /// Construct a `Cents` from a raw cent count.
    #[inline]
    pub const fn new(raw: i64) -> Self {
        Cents(raw)
    }

    /// Construct a whole-dollar amount.
    #[inline]
    pub const fn from_dollars(dollars: i64) -> Self {
        Cents(dollars * 100)
    }

    /// Extract the underlying raw cent count.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Saturating addition — clamps at [`Cents::MAX`] on overflow.
    #[inline]
    pub fn saturating_add(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction — clamps at [`Cents::MIN`] on underflow.
    #[inline]
    pub fn saturating_sub(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_sub(rhs.0))
    }

    /// Absolute value. `Cents::MIN.abs()` saturates to `Cents::MAX`.
    #[inline]
    pub fn abs(self) -> Cents {
        Cents(self.0.saturating_abs())
    }

    /// `true` if this amount is strictly positive.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `true` if this amount is strictly negative.
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Multiply a per-unit price by an integer quantity (e.g. a space price
    /// by a half-unit count) with overflow detection.
    ///
    /// Returns `None` on overflow; callers must handle this explicitly —
    /// overflow in a fee calculation is a hard error, not a saturation.
    #[inline]
    pub fn checked_mul(self, qty: i64) -> Option<Cents> {
        self.0.checked_mul(qty).map(Cents)
    }

    /// The larger of `self` and [`Cents::ZERO`].
    #[inline]
    pub fn clamp_non_negative(self) -> Cents {
        if self.0 < 0 {
            Cents::ZERO
        } else {
            self
        }
    }

    /// Split into `(dollars, cents)` with `cents` always in `0..100`.
    /// Negative amounts carry the sign on the dollar part via the caller's
    /// use of [`Cents::is_negative`]; both returned parts are magnitudes.
    #[inline]
    pub fn parts(self) -> (i64, i64) {
        let a = self.0.saturating_abs();
        (a / 100, a % 100)
    }
}

impl Add for Cents {
    type Output = Cents;
    #[inline]
    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl Sub for Cents {
    type Output = Cents;
    #[inline]
    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl Neg for Cents {
    type Output = Cents;
    #[inline]
    fn neg(self) -> Cents {
        Cents(-self.0)
    }
}

impl AddAssign for Cents {
    #[inline]
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Cents {
    #[inline]
    fn sub_assign(&mut self, rhs: Cents) {
        self.0 -= rhs.0;
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

impl std::fmt::Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (dollars, cents) = self.parts();
        if self.0 < 0 {
            write!(f, "-{dollars}.{cents:02}")
        } else {
            write!(f, "{dollars}.{cents:02}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_additive_identity() {
        let a = Cents::from_dollars(42);
        assert_eq!(a + Cents::ZERO, a);
        assert_eq!(Cents::ZERO + a, a);
    }

    #[test]
    fn add_and_sub_roundtrip() {
        let a = Cents::new(10_000);
        let b = Cents::new(2_500);
        assert_eq!((a + b) - b, a);
    }

    #[test]
    fn from_dollars_scales_by_100() {
        assert_eq!(Cents::from_dollars(25).raw(), 2_500);
    }

    #[test]
    fn neg_produces_opposite_sign() {
        let pos = Cents::new(500);
        assert_eq!((-pos).raw(), -500);
        assert_eq!(-(-pos), pos);
    }

    #[test]
    fn ordering() {
        assert!(Cents::new(100) < Cents::new(200));
        assert!(Cents::new(200) > Cents::new(100));
    }

    #[test]
    fn saturating_ops_clamp() {
        assert_eq!(Cents::MAX.saturating_add(Cents::new(1)), Cents::MAX);
        assert_eq!(Cents::MIN.saturating_sub(Cents::new(1)), Cents::MIN);
    }

    #[test]
    fn checked_mul_overflow_returns_none() {
        assert_eq!(Cents::MAX.checked_mul(2), None);
        assert_eq!(Cents::from_dollars(10).checked_mul(3), Some(Cents::from_dollars(30)));
    }

    #[test]
    fn clamp_non_negative() {
        assert_eq!(Cents::new(-1).clamp_non_negative(), Cents::ZERO);
        assert_eq!(Cents::new(1).clamp_non_negative(), Cents::new(1));
    }

    #[test]
    fn sum_over_iterator() {
        let total: Cents = [Cents::new(100), Cents::new(250), Cents::new(-50)]
            .into_iter()
            .sum();
        assert_eq!(total, Cents::new(300));
    }

    #[test]
    fn display_two_decimal_places() {
        assert_eq!(Cents::new(150).to_string(), "1.50");
        assert_eq!(Cents::new(5).to_string(), "0.05");
        assert_eq!(Cents::new(-275).to_string(), "-2.75");
        // Sign survives for sub-dollar negatives.
        assert_eq!(Cents::new(-5).to_string(), "-0.05");
    }

    #[test]
    fn parts_are_magnitudes() {
        assert_eq!(Cents::new(-275).parts(), (2, 75));
        assert_eq!(Cents::new(1234).parts(), (12, 34));
    }
}

//! Space amounts in half-unit quanta.
//!
//! Panels and tables are requested in whole units, or half units where the
//! space type permits splitting. Storing the count of half units as an
//! integer keeps arithmetic exact; "3.5 panels" is `SpaceAmount(7)`.

/// A non-negative quantity of space, counted in half units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SpaceAmount(i32);

/// Errors parsing or validating a space amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceAmountError {
    /// Amounts are zero or positive.
    Negative,
    /// Not representable as a whole or half unit (e.g. "1.3").
    NotHalfQuantized { input: String },
    /// Half units requested on a space type that only rents whole units.
    HalfNotAllowed,
}

impl std::fmt::Display for SpaceAmountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Negative => write!(f, "space amount must not be negative"),
            Self::NotHalfQuantized { input } => {
                write!(f, "space amount {input:?} is not a whole or half unit")
            }
            Self::HalfNotAllowed => {
                write!(f, "this space type cannot be allocated in half units")
            }
        }
    }
}

impl std::error::Error for SpaceAmountError {}

impl SpaceAmount {
    pub const ZERO: SpaceAmount = SpaceAmount(0);

    /// Whole units.
    pub fn whole(units: i32) -> Result<Self, SpaceAmountError> {
        if units < 0 {
            return Err(SpaceAmountError::Negative);
        }
        Ok(SpaceAmount(units * 2))
    }

    /// Raw half-unit count.
    pub fn from_halves(halves: i32) -> Result<Self, SpaceAmountError> {
        if halves < 0 {
            return Err(SpaceAmountError::Negative);
        }
        Ok(SpaceAmount(halves))
    }

    /// Parse `"3"` or `"3.5"` (also accepts `"3.0"`).
    pub fn parse(input: &str) -> Result<Self, SpaceAmountError> {
        let bad = || SpaceAmountError::NotHalfQuantized {
            input: input.to_string(),
        };
        let (units_str, frac) = match input.split_once('.') {
            None => (input, 0),
            Some((u, "0")) => (u, 0),
            Some((u, "5")) => (u, 1),
            Some(_) => return Err(bad()),
        };
        let units: i32 = units_str.parse().map_err(|_| bad())?;
        // "-0.5" parses its unit part as 0, so catch the sign explicitly.
        if units < 0 || units_str.starts_with('-') {
            return Err(SpaceAmountError::Negative);
        }
        Ok(SpaceAmount(units * 2 + frac))
    }

    pub fn halves(&self) -> i32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_whole(&self) -> bool {
        self.0 % 2 == 0
    }

    pub fn saturating_sub(self, other: SpaceAmount) -> SpaceAmount {
        SpaceAmount((self.0 - other.0).max(0))
    }

    pub fn min(self, other: SpaceAmount) -> SpaceAmount {
        SpaceAmount(self.0.min(other.0))
    }

    /// Round down to a whole number of units.
    pub fn floor_whole(self) -> SpaceAmount {
        SpaceAmount(self.0 - self.0 % 2)
    }

    /// Enforce the increment rule for a space type.
    pub fn validate_increment(&self, allow_half: bool) -> Result<(), SpaceAmountError> {
        if !allow_half && !self.is_whole() {
            return Err(SpaceAmountError::HalfNotAllowed);
        }
        Ok(())
    }
}

impl std::ops::Add for SpaceAmount {
    type Output = SpaceAmount;
    fn add(self, rhs: SpaceAmount) -> SpaceAmount {
        SpaceAmount(self.0 + rhs.0)
    }
}

impl std::iter::Sum for SpaceAmount {
    fn sum<I: Iterator<Item = SpaceAmount>>(iter: I) -> SpaceAmount {
        iter.fold(SpaceAmount::ZERO, |acc, a| acc + a)
    }
}

impl std::fmt::Display for SpaceAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_whole() {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{}.5", self.0 / 2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_and_half() {
        assert_eq!(SpaceAmount::parse("3"), SpaceAmount::whole(3));
        assert_eq!(SpaceAmount::parse("3.5"), SpaceAmount::from_halves(7));
        assert_eq!(SpaceAmount::parse("0"), Ok(SpaceAmount::ZERO));
        assert_eq!(SpaceAmount::parse("3.0"), SpaceAmount::whole(3));
    }

    #[test]
    fn parse_rejects_other_fractions() {
        assert!(matches!(
            SpaceAmount::parse("1.3"),
            Err(SpaceAmountError::NotHalfQuantized { .. })
        ));
        assert!(SpaceAmount::parse("x").is_err());
        assert_eq!(SpaceAmount::parse("-1"), Err(SpaceAmountError::Negative));
        assert_eq!(SpaceAmount::parse("-0.5"), Err(SpaceAmountError::Negative));
        assert_eq!(SpaceAmount::parse("-1.5"), Err(SpaceAmountError::Negative));
    }

    #[test]
    fn increment_rule() {
        let half = SpaceAmount::from_halves(3).unwrap();
        assert_eq!(half.validate_increment(true), Ok(()));
        assert_eq!(
            half.validate_increment(false),
            Err(SpaceAmountError::HalfNotAllowed)
        );
        assert_eq!(SpaceAmount::whole(2).unwrap().validate_increment(false), Ok(()));
    }

    #[test]
    fn display() {
        assert_eq!(SpaceAmount::whole(4).unwrap().to_string(), "4");
        assert_eq!(SpaceAmount::from_halves(9).unwrap().to_string(), "4.5");
    }

    #[test]
    fn floor_and_sub() {
        let a = SpaceAmount::from_halves(7).unwrap();
        assert_eq!(a.floor_whole(), SpaceAmount::whole(3).unwrap());
        assert_eq!(
            a.saturating_sub(SpaceAmount::whole(5).unwrap()),
            SpaceAmount::ZERO
        );
    }
}

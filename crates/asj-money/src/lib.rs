//! asj-money: fixed-point money for the art show.
//!
//! All monetary amounts use integer cents stored as `i64`. Using raw `i64`
//! for money is error-prone: it allows accidental arithmetic with unrelated
//! integers (piece IDs, bid counts, space units) without any compile-time
//! signal. `Cents` wraps the raw value so the type system prevents:
//! - Implicit construction from raw `i64` (no `From<i64>` impl).
//! - Mixing `Cents` with unrelated `i64` values in arithmetic.
//!
//! Percentage-style rates (sales tax, artist commission) are carried as
//! basis points ([`RateBps`]) so every total stays in integer arithmetic;
//! rate application rounds half-up, matching 2-decimal-place quantization.

mod cents;
mod rate;
mod words;

pub use cents::Cents;
pub use rate::RateBps;
pub use words::amount_in_words;

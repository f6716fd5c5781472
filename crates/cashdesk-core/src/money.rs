//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Summing a day of line items in binary floating point:                  │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Reports add thousands of line totals together. Any drift shows up     │
//! │  as revenue that does not match the till.                               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Storage, arithmetic and aggregation all use i64 cents.               │
//! │    Decimal strings ("10.50") only exist at the request boundary.       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cashdesk_core::money::Money;
//!
//! let price = Money::from_cents(1099);        // 10.99
//! let doubled = price * 2;                    // 21.98
//! let total = price + Money::from_cents(500); // 15.99
//! assert_eq!(total.to_decimal_string(), "15.99");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: profit can be negative when goods are sold below cost
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as cents**: the wire format never carries floats
/// - **Operators follow `i64`**: checkout totals go through the `checked_*`
///   forms and [`Money::try_sum`] instead
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use cashdesk_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a fixed-point decimal string with at most two fractional digits.
    ///
    /// ## Accepted Forms
    /// `"10"`, `"10.5"`, `"10.50"`, `"-3.25"`, `"0.07"`
    ///
    /// ## Rejected Forms
    /// `""`, `"10.505"` (sub-cent precision), `"1e3"`, `"10,50"`
    ///
    /// ```rust
    /// use cashdesk_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("10.5").unwrap().cents(), 1050);
    /// assert!(Money::parse_decimal("10.505").is_err());
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("'{}' {}", input, reason),
        };

        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (major, minor) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major.is_empty() || !major.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("is not a decimal amount"));
        }
        if minor.len() > 2 || !minor.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("must have at most two fractional digits"));
        }

        let major: i64 = major
            .parse()
            .map_err(|_| invalid("is out of range"))?;
        let minor: i64 = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().map_err(|_| invalid("is out of range"))? * 10,
            _ => minor.parse().map_err(|_| invalid("is out of range"))?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("is out of range"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Formats as a plain two-digit decimal (`"-5.50"`), the storage-boundary form.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.major().abs(), self.minor())
    }

    /// Calculates tax, rounding half up in integer math.
    ///
    /// Formula: `(amount_cents * bps + 5000) / 10000`
    ///
    /// ```rust
    /// use cashdesk_core::money::Money;
    /// use cashdesk_core::types::TaxRate;
    ///
    /// let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825));
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 prevents overflow on large amounts
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity, failing instead of wrapping.
    ///
    /// ```rust
    /// use cashdesk_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).multiply_quantity(3).unwrap().cents(), 897);
    /// assert!(Money::from_cents(i64::MAX / 2).multiply_quantity(3).is_err());
    /// ```
    pub fn multiply_quantity(&self, qty: i64) -> Result<Self, ValidationError> {
        self.0
            .checked_mul(qty)
            .map(Money)
            .ok_or_else(|| overflow("line_total"))
    }

    /// Adds two amounts, failing instead of wrapping.
    pub fn checked_add(&self, other: Money) -> Result<Self, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| overflow("amount"))
    }

    /// Subtracts `other`, failing instead of wrapping.
    pub fn checked_sub(&self, other: Money) -> Result<Self, ValidationError> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| overflow("amount"))
    }

    /// Sums amounts, failing on the first overflow.
    pub fn try_sum<I>(amounts: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, next| acc.checked_add(next))
    }

    /// Ratio of `self` to `whole`, or 0.0 when `whole` is zero.
    ///
    /// Only used for display ratios such as profit margin; every amount
    /// feeding it stays in integer cents.
    pub fn ratio_of(&self, whole: Money) -> f64 {
        if whole.is_zero() {
            0.0
        } else {
            self.0 as f64 / whole.0 as f64
        }
    }
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: i64::MIN,
        max: i64::MAX,
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(-7).to_string(), "-0.07");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(Money::parse_decimal("10").unwrap().cents(), 1000);
        assert_eq!(Money::parse_decimal("10.5").unwrap().cents(), 1050);
        assert_eq!(Money::parse_decimal("10.05").unwrap().cents(), 1005);
        assert_eq!(Money::parse_decimal(" 0.07 ").unwrap().cents(), 7);
        assert_eq!(Money::parse_decimal("-3.25").unwrap().cents(), -325);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        for input in ["", ".5", "10.505", "1e3", "10,50", "abc", "-", "1.-5"] {
            assert!(Money::parse_decimal(input).is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let huge = Money::parse_decimal("50000000000000000.00").unwrap();
        assert!(matches!(
            huge.multiply_quantity(2),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)).is_err());
        assert!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)).is_err());

        let total = Money::try_sum([Money::from_cents(250), Money::from_cents(750)]).unwrap();
        assert_eq!(total.cents(), 1000);
        assert!(Money::try_sum([Money::from_cents(i64::MAX), Money::from_cents(1)]).is_err());
    }

    #[test]
    fn test_tax_calculation_with_rounding() {
        // 10.00 at 8.25% = 0.825 → 0.83
        let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 83);
    }

    #[test]
    fn test_ratio_of_zero_whole() {
        assert_eq!(Money::from_cents(100).ratio_of(Money::zero()), 0.0);
        assert_eq!(Money::from_cents(25).ratio_of(Money::from_cents(100)), 0.25);
    }

    #[test]
    fn test_sum_of_dimes_is_exact() {
        // The classic 0.1 + 0.2 trap, a thousand times over
        let total: Money = std::iter::repeat(Money::from_cents(10)).take(1000).sum();
        assert_eq!(total.to_decimal_string(), "100.00");
    }

    proptest! {
        #[test]
        fn prop_decimal_string_parses_back(cents in -10_000_000_000i64..10_000_000_000i64) {
            let money = Money::from_cents(cents);
            prop_assert_eq!(Money::parse_decimal(&money.to_decimal_string()).unwrap(), money);
        }

        #[test]
        fn prop_sum_is_order_independent(mut values in proptest::collection::vec(-1_000_000i64..1_000_000i64, 0..50)) {
            let forward: Money = values.iter().map(|c| Money::from_cents(*c)).sum();
            values.reverse();
            let backward: Money = values.iter().map(|c| Money::from_cents(*c)).sum();
            prop_assert_eq!(forward, backward);
        }
    }
}

//! # Money Module
//!
//! Provides the `Money` type for monetary values that are stored or shown.
//!
//! ## Where Rounding Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INTERMEDIATE MATH                      STORED / DISPLAYED              │
//! │  (Decimal, never rounded)               (Money, integer cents)          │
//! │                                                                         │
//! │  unit_price  = 10 × 1.05 = 10.5   ──┐                                   │
//! │  line_incl   = 10.5 × 0.333         ├──► total_price = 3.50             │
//! │              = 3.4965             ──┘    vat_amount  = 0.17             │
//! │                                                                         │
//! │  Rounding happens once, at the boundary, half away from zero.           │
//! │  Re-pricing a line always starts again from the unrounded inputs,       │
//! │  so repeated edits never compound rounding error.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasa_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let price = Money::from_cents(1099);
//! assert_eq!(price.to_decimal(), Decimal::new(1099, 2));
//!
//! // 3.4965 rounds to 3.50
//! assert_eq!(Money::from_decimal(Decimal::new(34965, 4)).cents(), 350);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;
use crate::MONEY_SCALE;

// =============================================================================
// Rounding
// =============================================================================

/// Rounds to 2 decimal places, half away from zero.
#[inline]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds and change computations may go negative
/// - **Integer storage**: two equal totals always compare equal
/// - **Wire format**: a JSON number in major units (`10.5`), which is what
///   the backend sends and expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "number")] i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from a decimal amount, rounding to cents.
    ///
    /// Amounts beyond the i64 cent range saturate.
    pub fn from_decimal(amount: Decimal) -> Self {
        let saturated = if amount.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        };
        let cents = round2(amount)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .unwrap_or(saturated);
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as an exact decimal in major units.
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, MONEY_SCALE)
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns `percent`% of this amount, rounded to cents.
    ///
    /// ## Example
    /// ```rust
    /// use kasa_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let subtotal = Money::from_cents(10000);
    /// assert_eq!(subtotal.percentage(Decimal::TEN).cents(), 1000);
    /// ```
    pub fn percentage(&self, percent: Decimal) -> Money {
        Money::from_decimal(self.to_decimal() * percent / Decimal::ONE_HUNDRED)
    }

    /// Splits a tax-inclusive amount into `(net, tax)`.
    ///
    /// `net = round2(self / (1 + rate))`, `tax = self - net`, so the two
    /// parts always add back up to the original amount exactly.
    ///
    /// ## Example
    /// ```rust
    /// use kasa_core::money::Money;
    /// use kasa_core::types::TaxRate;
    ///
    /// let total = Money::from_cents(9000);
    /// let (net, vat) = total.split_inclusive(TaxRate::from_bps(500));
    /// assert_eq!(net.cents(), 8571);
    /// assert_eq!(vat.cents(), 429);
    /// ```
    pub fn split_inclusive(&self, rate: TaxRate) -> (Money, Money) {
        if rate.is_zero() {
            return (*self, Money::zero());
        }
        let net = Money::from_decimal(self.to_decimal() / rate.multiplier());
        (net, *self - net)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Major units with two decimals, no currency symbol.
///
/// Currency symbols are a display concern of the session config.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::serde_decimal::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::serde_decimal::deserialize(deserializer).map(Money::from_decimal)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_decimal_rounds_half_away_from_zero() {
        assert_eq!(Money::from_decimal(dec!(10.005)).cents(), 1001);
        assert_eq!(Money::from_decimal(dec!(10.004)).cents(), 1000);
        assert_eq!(Money::from_decimal(dec!(-10.005)).cents(), -1001);
        assert_eq!(Money::from_decimal(dec!(0.125)).cents(), 13);
    }

    #[test]
    fn test_from_decimal_saturates_out_of_range() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        assert_eq!(Money::from_decimal(huge).cents(), i64::MAX);
        assert_eq!(Money::from_decimal(Decimal::MAX).cents(), i64::MAX);
        assert_eq!(Money::from_decimal(Decimal::MIN).cents(), i64::MIN);
        // fits a Decimal, but not as i64 cents
        assert_eq!(Money::from_decimal(Decimal::from(10_i64.pow(17))).cents(), i64::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-a).cents(), -1000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_percentage() {
        let subtotal = Money::from_cents(9999);
        assert_eq!(subtotal.percentage(dec!(10)).cents(), 1000);
        assert_eq!(subtotal.percentage(dec!(0)).cents(), 0);
    }

    #[test]
    fn test_split_inclusive_adds_back_up() {
        let total = Money::from_cents(10500);
        let (net, vat) = total.split_inclusive(TaxRate::from_bps(500));
        assert_eq!(net.cents(), 10000);
        assert_eq!(vat.cents(), 500);

        let (net, vat) = total.split_inclusive(TaxRate::zero());
        assert_eq!(net, total);
        assert!(vat.is_zero());
    }

    #[test]
    fn test_serde_as_major_units() {
        let json = serde_json::to_string(&Money::from_cents(1050)).unwrap();
        assert_eq!(json, "10.5");

        let parsed: Money = serde_json::from_str("10.499").unwrap();
        assert_eq!(parsed.cents(), 1050);

        let from_string: Money = serde_json::from_str("\"12.34\"").unwrap();
        assert_eq!(from_string.cents(), 1234);
    }
}

//! # Discounts
//!
//! A sale carries at most one discount. It is always computed against the
//! VAT-exclusive subtotal, before the sale-level VAT split.
//!
//! ```text
//!   fixed 15.00       on base 100.00  →  15.00
//!   fixed 150.00      on base 100.00  → 100.00   (never exceeds the base)
//!   percentage 10     on base  99.99  →  10.00
//! ```
//!
//! Setting a new discount replaces the previous one; discounts never stack.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::serde_decimal;
use crate::validation::validate_discount_value;

/// Default upper bound for percentage discounts.
pub const DEFAULT_PERCENT_CAP: Decimal = Decimal::ONE_HUNDRED;

/// How the discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DiscountKind {
    /// Money off, in major units.
    #[default]
    Fixed,
    /// Percent of the VAT-exclusive subtotal.
    Percentage,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Fixed => "fixed",
            DiscountKind::Percentage => "percentage",
        }
    }
}

/// A discount as entered by the cashier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Discount {
    pub kind: DiscountKind,
    #[serde(with = "serde_decimal")]
    #[ts(type = "number")]
    pub value: Decimal,
}

impl Discount {
    /// No discount.
    pub const fn none() -> Self {
        Discount {
            kind: DiscountKind::Fixed,
            value: Decimal::ZERO,
        }
    }

    /// Validates and builds a discount.
    ///
    /// Rejects negative values and percentages above `percent_cap`.
    pub fn new(kind: DiscountKind, value: Decimal, percent_cap: Decimal) -> CoreResult<Self> {
        validate_discount_value(value, kind == DiscountKind::Percentage, percent_cap)
            .map_err(CoreError::InvalidDiscount)?;
        Ok(Discount { kind, value })
    }

    pub fn is_none(&self) -> bool {
        self.value.is_zero()
    }

    /// Monetary deduction against `base_subtotal` (VAT-exclusive, unrounded).
    ///
    /// The result is never negative and never exceeds the rounded base.
    pub fn amount(&self, base_subtotal: Decimal) -> Money {
        let ceiling = Money::from_decimal(base_subtotal.max(Decimal::ZERO));
        let raw = match self.kind {
            DiscountKind::Fixed => Money::from_decimal(self.value),
            DiscountKind::Percentage => {
                Money::from_decimal(base_subtotal * self.value / Decimal::ONE_HUNDRED)
            }
        };
        raw.max(Money::zero()).min(ceiling)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// A fixed discount never exceeds the subtotal it applies to.
    #[test]
    fn prop_fixed_discount_bounded() {
        proptest!(|(
            value_cents in 0i64..=100_000_000,
            subtotal_cents in 0i64..=10_000_000
        )| {
            let d = Discount::new(
                DiscountKind::Fixed,
                Decimal::new(value_cents, 2),
                DEFAULT_PERCENT_CAP,
            ).unwrap();
            let amount = d.amount(Decimal::new(subtotal_cents, 2));
            prop_assert!(amount.cents() <= subtotal_cents);
            prop_assert!(!amount.is_negative());
        });
    }

    /// Any accepted percentage stays within the subtotal.
    #[test]
    fn prop_percentage_discount_bounded() {
        proptest!(|(
            pct_bps in 0i64..=10_000,
            subtotal_cents in 0i64..=10_000_000
        )| {
            let d = Discount::new(
                DiscountKind::Percentage,
                Decimal::new(pct_bps, 2),
                DEFAULT_PERCENT_CAP,
            ).unwrap();
            prop_assert!(d.amount(Decimal::new(subtotal_cents, 2)).cents() <= subtotal_cents);
        });
    }
}

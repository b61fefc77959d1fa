//! # Line Pricing
//!
//! Computes one cart line's VAT-inclusive unit price, line total and VAT
//! amount.
//!
//! ## Two Entry Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Catalog price (ex-VAT)                 Manual override (inclusive)     │
//! │  P = 10.00, v = 5%                      U = 12.00, v = 5%               │
//! │       │                                      │                          │
//! │       ▼                                      ▼                          │
//! │  price_from_base()                      price_from_inclusive()          │
//! │  unit = P × 1.05 = 10.50                base = U / 1.05 = 11.4285...    │
//! │       │                                      │                          │
//! │       └──────────────┬───────────────────────┘                          │
//! │                      ▼                                                  │
//! │              price_line(base, unit, v, qty)                             │
//! │              total = round2(unit × qty)                                 │
//! │              vat   = total − round2(base × qty)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Either way the `unit_price` shown to the cashier is VAT-inclusive.
//! Unit prices are kept unrounded; only the line's money amounts are.

use rust_decimal::Decimal;

use crate::money::Money;
use crate::types::TaxRate;

/// The priced state of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePrice {
    /// VAT-exclusive price per base unit.
    pub base_unit_price: Decimal,
    /// VAT-inclusive price per base unit.
    pub unit_price: Decimal,
    pub vat_percentage: TaxRate,
    pub vat_amount: Money,
    /// VAT-inclusive line total.
    pub total_price: Money,
}

impl LinePrice {
    /// VAT-exclusive line value, unrounded. Summed by the cart totals.
    pub fn line_base(&self, quantity: Decimal) -> Decimal {
        self.base_unit_price * quantity
    }
}

/// Inclusive unit price for an ex-VAT price.
#[inline]
pub fn inclusive_unit_price(base_price: Decimal, rate: TaxRate) -> Decimal {
    if rate.is_zero() {
        base_price
    } else {
        base_price * rate.multiplier()
    }
}

/// Ex-VAT unit price recovered from an inclusive one.
#[inline]
pub fn base_from_inclusive(unit_price: Decimal, rate: TaxRate) -> Decimal {
    if rate.is_zero() {
        unit_price
    } else {
        unit_price / rate.multiplier()
    }
}

/// Prices a line from the catalog's ex-VAT price.
pub fn price_from_base(base_price: Decimal, rate: TaxRate, quantity: Decimal) -> LinePrice {
    price_line(base_price, inclusive_unit_price(base_price, rate), rate, quantity)
}

/// Prices a line from a VAT-inclusive unit price entered by the cashier.
///
/// The entered price is kept verbatim as `unit_price`.
pub fn price_from_inclusive(unit_price: Decimal, rate: TaxRate, quantity: Decimal) -> LinePrice {
    price_line(base_from_inclusive(unit_price, rate), unit_price, rate, quantity)
}

/// Prices a line from an already known base/inclusive unit price pair.
///
/// Used on every quantity or unit change: the stored unit prices are
/// reused, only the line amounts are recomputed.
pub fn price_line(
    base_unit_price: Decimal,
    unit_price: Decimal,
    rate: TaxRate,
    quantity: Decimal,
) -> LinePrice {
    let total_price = Money::from_decimal(unit_price * quantity);

    let vat_amount = if rate.is_zero() {
        Money::zero()
    } else {
        total_price - Money::from_decimal(base_unit_price * quantity)
    };

    LinePrice {
        base_unit_price,
        unit_price,
        vat_percentage: rate,
        vat_amount,
        total_price,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::money::round2;
    use proptest::prelude::*;

    /// VAT + rounded ex-VAT value adds back up to the line total exactly.
    #[test]
    fn prop_vat_is_total_minus_base_value() {
        proptest!(|(
            price_cents in 0i64..=1_000_000,
            bps in 1u32..=5_000,
            qty_units in 1i64..=1_000_000
        )| {
            let base = Decimal::new(price_cents, 2);
            let qty = Decimal::new(qty_units, 3);
            let line = price_from_base(base, TaxRate::from_bps(bps), qty);

            prop_assert_eq!(line.total_price.to_decimal(), round2(line.unit_price * qty));
            prop_assert_eq!(
                line.vat_amount + Money::from_decimal(base * qty),
                line.total_price
            );
            prop_assert!(!line.vat_amount.is_negative());
        });
    }

    /// Entering the inclusive price a catalog line already shows re-derives its base.
    #[test]
    fn prop_override_inverts_catalog_pricing() {
        proptest!(|(
            price_cents in 1i64..=1_000_000,
            bps in 0u32..=5_000
        )| {
            let rate = TaxRate::from_bps(bps);
            let catalog = price_from_base(Decimal::new(price_cents, 2), rate, Decimal::ONE);
            let manual = price_from_inclusive(catalog.unit_price, rate, Decimal::ONE);

            prop_assert_eq!(
                manual.base_unit_price.round_dp(8),
                catalog.base_unit_price.round_dp(8)
            );
            prop_assert_eq!(manual.total_price, catalog.total_price);
        });
    }
}

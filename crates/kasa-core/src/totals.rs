//! # Cart Totals
//!
//! Folds priced lines into the figures shown under the cart and sent with
//! the sale.
//!
//! ## Sale-level VAT
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  base   = Σ base_unit_price × quantity        (ex-VAT, unrounded)       │
//! │  itemV  = Σ vat_amount                        (VAT baked into lines)    │
//! │  disc   = discount.amount(base)                                         │
//! │                                                                         │
//! │  sale VAT rate s > 0 and not no_vat:                                    │
//! │      total    = round2(base − disc + itemV)   (treated as inclusive)    │
//! │      subtotal = round2(total / (1 + s))                                 │
//! │      vat      = total − subtotal                                        │
//! │                                                                         │
//! │  otherwise:                                                             │
//! │      subtotal = round2(base − disc)                                     │
//! │      vat      = itemV                                                   │
//! │      total    = subtotal + vat                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sale rate never adds tax on top of the line prices; it only splits
//! the inclusive total for the receipt.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::discount::Discount;
use crate::money::Money;
use crate::types::TaxRate;

/// What a single line contributes to the totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    /// `base_unit_price × quantity`, unrounded.
    pub base_value: Decimal,
    pub vat_amount: Money,
}

/// Immutable totals projection of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    /// Ex-VAT value of all lines before discount.
    pub base_subtotal: Money,
    /// Sum of line VAT amounts.
    pub item_vat: Money,
    /// Ex-VAT, after discount.
    pub subtotal: Money,
    pub discount: Money,
    pub vat: Money,
    /// Amount the customer pays.
    pub total: Money,
    /// Sale rate used for the split; zero when the split was not applied.
    pub vat_percentage: TaxRate,
    pub line_count: usize,
}

impl Totals {
    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }
}

/// Aggregates line amounts, the discount and the sale VAT setting.
pub fn aggregate<I>(lines: I, discount: &Discount, sale_vat: TaxRate, no_vat: bool) -> Totals
where
    I: IntoIterator<Item = LineAmounts>,
{
    let mut base = Decimal::ZERO;
    let mut item_vat = Money::zero();
    let mut line_count = 0usize;

    for line in lines {
        base += line.base_value;
        item_vat += line.vat_amount;
        line_count += 1;
    }

    let discount_amount = discount.amount(base);
    let net = base - discount_amount.to_decimal();

    if !no_vat && !sale_vat.is_zero() {
        let total = Money::from_decimal(net + item_vat.to_decimal());
        let (subtotal, vat) = total.split_inclusive(sale_vat);
        Totals {
            base_subtotal: Money::from_decimal(base),
            item_vat,
            subtotal,
            discount: discount_amount,
            vat,
            total,
            vat_percentage: sale_vat,
            line_count,
        }
    } else {
        let subtotal = Money::from_decimal(net);
        Totals {
            base_subtotal: Money::from_decimal(base),
            item_vat,
            subtotal,
            discount: discount_amount,
            vat: item_vat,
            total: subtotal + item_vat,
            vat_percentage: TaxRate::zero(),
            line_count,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::{DiscountKind, DEFAULT_PERCENT_CAP};
    use crate::pricing::price_from_base;
    use rust_decimal_macros::dec;

    fn line(base: Decimal, bps: u32, qty: Decimal) -> LineAmounts {
        let priced = price_from_base(base, TaxRate::from_bps(bps), qty);
        LineAmounts {
            base_value: priced.line_base(qty),
            vat_amount: priced.vat_amount,
        }
    }

    fn percent(value: Decimal) -> Discount {
        Discount::new(DiscountKind::Percentage, value, DEFAULT_PERCENT_CAP).unwrap()
    }

    #[test]
    fn test_empty_cart() {
        let totals = aggregate(
            Vec::<LineAmounts>::new(),
            &Discount::none(),
            TaxRate::from_bps(500),
            false,
        );
        assert!(totals.is_empty());
        assert!(totals.total.is_zero());
        assert!(totals.vat.is_zero());
    }

    #[test]
    fn test_item_vat_without_sale_rate() {
        let lines = vec![line(dec!(10), 500, dec!(1)), line(dec!(4), 0, dec!(2))];
        let totals = aggregate(lines, &Discount::none(), TaxRate::zero(), false);

        assert_eq!(totals.base_subtotal.cents(), 1800);
        assert_eq!(totals.subtotal.cents(), 1800);
        assert_eq!(totals.vat.cents(), 50);
        assert_eq!(totals.total.cents(), 1850);
        assert_eq!(totals.line_count, 2);
    }

    #[test]
    fn test_ten_percent_discount_with_sale_vat_split() {
        // subtotal 100, no item VAT, 10% off, sale VAT 5%
        let lines = vec![line(dec!(100), 0, dec!(1))];
        let totals = aggregate(lines, &percent(dec!(10)), TaxRate::from_bps(500), false);

        assert_eq!(totals.discount.cents(), 1000);
        assert_eq!(totals.total.cents(), 9000);
        assert_eq!(totals.subtotal.cents(), 8571);
        assert_eq!(totals.vat.cents(), 429);
        assert_eq!(totals.vat_percentage, TaxRate::from_bps(500));
    }

    #[test]
    fn test_sale_split_includes_item_vat() {
        // base 100 at 5% → item VAT 5; total = 100 - 10 + 5 = 95
        let lines = vec![line(dec!(100), 500, dec!(1))];
        let totals = aggregate(lines, &percent(dec!(10)), TaxRate::from_bps(500), false);

        assert_eq!(totals.item_vat.cents(), 500);
        assert_eq!(totals.total.cents(), 9500);
        assert_eq!(totals.subtotal.cents(), 9048);
        assert_eq!(totals.vat.cents(), 452);
        assert_eq!(totals.subtotal + totals.vat, totals.total);
    }

    #[test]
    fn test_no_vat_flag_disables_split() {
        let lines = vec![line(dec!(100), 500, dec!(1))];
        let totals = aggregate(lines, &percent(dec!(10)), TaxRate::from_bps(500), true);

        assert_eq!(totals.subtotal.cents(), 9000);
        assert_eq!(totals.vat.cents(), 500);
        assert_eq!(totals.total.cents(), 9500);
        assert!(totals.vat_percentage.is_zero());
    }

    #[test]
    fn test_full_discount_never_goes_negative() {
        let lines = vec![line(dec!(20), 0, dec!(1))];
        let fixed = Discount::new(DiscountKind::Fixed, dec!(500), DEFAULT_PERCENT_CAP).unwrap();
        let totals = aggregate(lines, &fixed, TaxRate::zero(), false);
        assert_eq!(totals.discount.cents(), 2000);
        assert!(totals.total.is_zero());
    }
}

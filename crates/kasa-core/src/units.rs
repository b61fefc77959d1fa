//! # Unit Conversion
//!
//! Converts quantities between a product's base unit and the display units
//! configured in the conversion table.
//!
//! ```text
//!   display unit                    base unit
//!   ┌──────────┐   to_base()        ┌──────────┐
//!   │  2 box   │ ─────────────────► │ 24 piece │   box: * 12
//!   └──────────┘ ◄───────────────── └──────────┘
//!                  from_base()
//! ```
//!
//! Quantities in the cart are always stored in the base unit. The display
//! quantity is derived from it, never the other way round.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::types::{ConversionOperator, UnitConversion};
use crate::QUANTITY_SCALE;

/// Rounds a quantity to storage precision (4 decimal places).
#[inline]
pub fn round_quantity(qty: Decimal) -> Decimal {
    qty.round_dp(QUANTITY_SCALE)
}

/// Finds the conversion row for `unit` under `base_unit`.
pub fn find_conversion<'a>(
    unit: &str,
    base_unit: &str,
    conversions: &'a [UnitConversion],
) -> Option<&'a UnitConversion> {
    conversions
        .iter()
        .find(|c| c.name == unit && c.base_unit == base_unit)
}

/// Converts `qty` expressed in `unit` into the base unit.
///
/// Returns `qty` unchanged when `unit` is the base unit, when no
/// conversion row exists, or when the row's value is zero. Callers check
/// [`is_available`] before converting.
///
/// ## Example
/// ```rust
/// use kasa_core::types::{ConversionOperator, UnitConversion};
/// use kasa_core::units::to_base;
/// use rust_decimal::Decimal;
///
/// let table = vec![UnitConversion {
///     name: "box".into(),
///     base_unit: "piece".into(),
///     operator: ConversionOperator::Multiply,
///     operation_value: Decimal::from(12),
/// }];
/// assert_eq!(to_base("box", Decimal::from(2), "piece", &table), Decimal::from(24));
/// ```
pub fn to_base(
    unit: &str,
    qty: Decimal,
    base_unit: &str,
    conversions: &[UnitConversion],
) -> Decimal {
    if unit == base_unit {
        return qty;
    }
    let Some(conv) = find_conversion(unit, base_unit, conversions) else {
        return qty;
    };
    let converted = match conv.operator {
        ConversionOperator::Multiply => qty.checked_mul(conv.operation_value),
        ConversionOperator::Divide => qty.checked_div(conv.operation_value),
    };
    converted.unwrap_or(qty)
}

/// Converts a base-unit quantity into `target_unit`. Exact inverse of [`to_base`].
pub fn from_base(
    target_unit: &str,
    base_qty: Decimal,
    base_unit: &str,
    conversions: &[UnitConversion],
) -> Decimal {
    if target_unit == base_unit {
        return base_qty;
    }
    let Some(conv) = find_conversion(target_unit, base_unit, conversions) else {
        return base_qty;
    };
    let converted = match conv.operator {
        ConversionOperator::Multiply => base_qty.checked_div(conv.operation_value),
        ConversionOperator::Divide => base_qty.checked_mul(conv.operation_value),
    };
    converted.unwrap_or(base_qty)
}

/// Returns every unit a product with `base_unit` can be sold in, sorted
/// and de-duplicated. Always contains `base_unit` itself.
pub fn available_units(base_unit: &str, conversions: &[UnitConversion]) -> Vec<String> {
    let mut units: BTreeSet<String> = conversions
        .iter()
        .filter(|c| c.base_unit == base_unit)
        .map(|c| c.name.clone())
        .collect();
    units.insert(base_unit.to_string());
    units.into_iter().collect()
}

/// Returns true when `unit` is in [`available_units`] for `base_unit`.
pub fn is_available(unit: &str, base_unit: &str, conversions: &[UnitConversion]) -> bool {
    unit == base_unit || find_conversion(unit, base_unit, conversions).is_some()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn conv(name: &str, base: &str, op: ConversionOperator, value: Decimal) -> UnitConversion {
        UnitConversion {
            name: name.to_string(),
            base_unit: base.to_string(),
            operator: op,
            operation_value: value,
        }
    }

    fn table() -> Vec<UnitConversion> {
        vec![
            conv("box", "piece", ConversionOperator::Multiply, dec!(12)),
            conv("g", "kg", ConversionOperator::Divide, dec!(1000)),
            conv("pack", "piece", ConversionOperator::Multiply, dec!(6)),
            conv("tray", "kg", ConversionOperator::Multiply, dec!(0)),
        ]
    }

    #[test]
    fn test_box_to_pieces() {
        let t = table();
        assert_eq!(to_base("box", dec!(2), "piece", &t), dec!(24));
        assert_eq!(from_base("box", dec!(24), "piece", &t), dec!(2));
    }

    #[test]
    fn test_grams_to_kg() {
        let t = table();
        assert_eq!(to_base("g", dec!(250), "kg", &t), dec!(0.25));
        assert_eq!(from_base("g", dec!(1.5), "kg", &t), dec!(1500));
    }

    #[test]
    fn test_base_unit_and_unknown_unit_are_identity() {
        let t = table();
        assert_eq!(to_base("piece", dec!(3), "piece", &t), dec!(3));
        assert_eq!(to_base("crate", dec!(3), "piece", &t), dec!(3));
        // "box" is configured for piece, not kg
        assert_eq!(from_base("box", dec!(3), "kg", &t), dec!(3));
    }

    #[test]
    fn test_zero_operation_value_is_identity() {
        let t = table();
        assert_eq!(from_base("tray", dec!(5), "kg", &t), dec!(5));
    }

    #[test]
    fn test_available_units_sorted_unique() {
        let mut t = table();
        t.push(conv("box", "piece", ConversionOperator::Multiply, dec!(24)));
        assert_eq!(available_units("piece", &t), vec!["box", "pack", "piece"]);
        assert_eq!(available_units("litre", &t), vec!["litre"]);
        assert!(is_available("g", "kg", &t));
        assert!(!is_available("g", "piece", &t));
    }

    fn operator_strategy() -> impl Strategy<Value = ConversionOperator> {
        prop_oneof![
            Just(ConversionOperator::Multiply),
            Just(ConversionOperator::Divide)
        ]
    }

    proptest! {
        /// Base → display → base lands on the same quantity at storage precision.
        #[test]
        fn prop_round_trip_within_storage_precision(
            qty_units in 1i64..100_000_000,
            value in 1i64..10_000,
            op in operator_strategy()
        ) {
            let qty = Decimal::new(qty_units, 4);
            let t = vec![conv("alt", "base", op, Decimal::from(value))];

            for unit in available_units("base", &t) {
                let display = from_base(&unit, qty, "base", &t);
                let back = to_base(&unit, display, "base", &t);
                prop_assert_eq!(round_quantity(back), round_quantity(qty));
            }
        }
    }
}

//! # Validation Module
//!
//! Input validation for everything a cashier can type into the billing screen.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Billing screen                                                │
//! │  ├── Numeric keypad, unit picker limited to available units             │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Cart mutation (Rust)                                          │
//! │  ├── THIS MODULE: field rules (positive, range, precision)              │
//! │  └── Cart rules (stock, line limit) in cart / stock                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend                                                       │
//! │  └── Authoritative stock, sale acceptance                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validator runs before the cart is touched, so a rejected input
//! never leaves a half-applied edit behind.
//!
//! ## Usage
//! ```rust
//! use kasa_core::validation::{validate_quantity, validate_unit_price};
//! use rust_decimal::Decimal;
//!
//! validate_quantity(Decimal::new(25, 1)).unwrap();
//! assert!(validate_unit_price(Decimal::NEGATIVE_ONE).is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::types::TaxRate;
use crate::{MAX_LINE_QUANTITY, MAX_MONEY_AMOUNT, MONEY_SCALE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a unit name and returns it trimmed.
///
/// ## Example
/// ```rust
/// use kasa_core::validation::validate_unit;
///
/// assert_eq!(validate_unit("  box ").unwrap(), "box");
/// assert!(validate_unit("").is_err());
/// ```
pub fn validate_unit(unit: &str) -> ValidationResult<String> {
    let unit = unit.trim();

    if unit.is_empty() {
        return Err(ValidationError::Required {
            field: "unit".to_string(),
        });
    }

    Ok(unit.to_string())
}

/// Validates a product search query.
///
/// ## Rules
/// - Can be empty (returns the whole catalog)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::OutOfRange {
            field: "search".to_string(),
            min: Decimal::ZERO,
            max: Decimal::from(100),
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity (base or display unit).
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Edit Quantity                                                    │
/// │                                                                         │
/// │  User enters quantity: 2.5 (kg)                                         │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(2.5) ← THIS FUNCTION                                 │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"                │
/// │       │                                                                 │
/// │       ├── qty > 99999? → Error: "quantity must be between ..."          │
/// │       │                                                                 │
/// │       └── OK → convert to base unit, re-price line                      │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: Decimal) -> ValidationResult<()> {
    if qty <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > Decimal::from(MAX_LINE_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: Decimal::ZERO,
            max: Decimal::from(MAX_LINE_QUANTITY),
        });
    }

    Ok(())
}

/// Validates a unit price (catalog or manual override).
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
/// - Must not exceed MAX_MONEY_AMOUNT
pub fn validate_unit_price(price: Decimal) -> ValidationResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        });
    }

    check_money_ceiling(price, "unit_price")?;

    Ok(())
}

/// Validates a discount value.
///
/// ## Rules
/// - Must be non-negative
/// - Percentages must not exceed `percent_cap`
/// - Fixed amounts must not exceed MAX_MONEY_AMOUNT
pub fn validate_discount_value(
    value: Decimal,
    is_percentage: bool,
    percent_cap: Decimal,
) -> ValidationResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::MustNotBeNegative {
            field: "discount".to_string(),
        });
    }

    if is_percentage && value > percent_cap {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: Decimal::ZERO,
            max: percent_cap,
        });
    }

    if !is_percentage {
        check_money_ceiling(value, "discount")?;
    }

    Ok(())
}

/// Validates a tender amount.
///
/// ## Rules
/// - Must be positive (> 0)
/// - At most two decimal places; a tender is real money
/// - Must not exceed MAX_MONEY_AMOUNT
pub fn validate_payment_amount(amount: Decimal) -> ValidationResult<()> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    check_money_ceiling(amount, "payment amount")?;

    if amount.normalize().scale() > MONEY_SCALE {
        return Err(ValidationError::TooPrecise {
            field: "payment amount".to_string(),
            max_scale: MONEY_SCALE,
        });
    }

    Ok(())
}

fn check_money_ceiling(amount: Decimal, field: &str) -> ValidationResult<()> {
    let max = Decimal::from(MAX_MONEY_AMOUNT);
    if amount > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: Decimal::ZERO,
            max,
        });
    }
    Ok(())
}

/// Validates a VAT rate.
///
/// ## Rules
/// - Must be between 0% and 100%
pub fn validate_tax_rate(rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "vat_percentage".to_string(),
            min: Decimal::ZERO,
            max: Decimal::ONE_HUNDRED,
        });
    }

    Ok(())
}

/// Parses a VAT percentage from outside input (catalog, snapshot, config).
///
/// ## Rules
/// - Must be between 0% and 100%
/// - At most two decimal places; finer rates have no basis-point form
pub fn parse_tax_percentage(pct: Decimal) -> ValidationResult<TaxRate> {
    if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "vat_percentage".to_string(),
            min: Decimal::ZERO,
            max: Decimal::ONE_HUNDRED,
        });
    }

    if pct.normalize().scale() > MONEY_SCALE {
        return Err(ValidationError::TooPrecise {
            field: "vat_percentage".to_string(),
            max_scale: MONEY_SCALE,
        });
    }

    Ok(TaxRate::from_percentage(pct))
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in the cart.
pub fn validate_cart_size(current_lines: usize, max_lines: usize) -> ValidationResult<()> {
    if current_lines >= max_lines {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: Decimal::ZERO,
            max: Decimal::from(max_lines as u64),
        });
    }

    Ok(())
}

/// Validates a payment method code (`cash`, `card`, ...).
pub fn validate_payment_method(method: &str) -> ValidationResult<String> {
    let method = method.trim();

    if method.is_empty() {
        return Err(ValidationError::Required {
            field: "payment method".to_string(),
        });
    }

    // ':' and ',' are separators in the composite method encoding
    if method.contains(|c| c == ':' || c == ',') {
        return Err(ValidationError::NotAllowed {
            field: "payment method".to_string(),
            allowed: vec!["letters".to_string(), "digits".to_string(), "_".to_string()],
        });
    }

    Ok(method.to_lowercase())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(dec!(1)).is_ok());
        assert!(validate_quantity(dec!(0.125)).is_ok());
        assert!(validate_quantity(dec!(99999)).is_ok());

        assert!(validate_quantity(dec!(0)).is_err());
        assert!(validate_quantity(dec!(-1)).is_err());
        assert!(validate_quantity(dec!(100000)).is_err());
    }

    #[test]
    fn test_validate_unit_price() {
        assert!(validate_unit_price(dec!(0)).is_ok());
        assert!(validate_unit_price(dec!(10.99)).is_ok());
        assert!(validate_unit_price(dec!(-0.01)).is_err());
        assert!(validate_unit_price(dec!(999999999)).is_ok());
        assert!(validate_unit_price(dec!(1000000000)).is_err());
    }

    #[test]
    fn test_validate_discount_value() {
        assert!(validate_discount_value(dec!(15), false, dec!(100)).is_ok());
        assert!(validate_discount_value(dec!(250), false, dec!(100)).is_ok());
        assert!(validate_discount_value(dec!(100), true, dec!(100)).is_ok());

        assert!(validate_discount_value(dec!(100.01), true, dec!(100)).is_err());
        assert!(validate_discount_value(dec!(60), true, dec!(50)).is_err());
        assert!(validate_discount_value(dec!(-5), false, dec!(100)).is_err());
        let huge = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        assert!(validate_discount_value(huge, false, dec!(100)).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(dec!(40)).is_ok());
        assert!(validate_payment_amount(dec!(40.50)).is_ok());
        assert!(validate_payment_amount(dec!(40.500)).is_ok());

        assert!(validate_payment_amount(dec!(0)).is_err());
        assert!(validate_payment_amount(dec!(40.005)).is_err());
        let huge = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        assert!(validate_payment_amount(huge).is_err());
    }

    #[test]
    fn test_validate_tax_rate() {
        assert!(validate_tax_rate(TaxRate::from_bps(0)).is_ok());
        assert!(validate_tax_rate(TaxRate::from_bps(10_000)).is_ok());
        assert!(validate_tax_rate(TaxRate::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_parse_tax_percentage() {
        assert_eq!(parse_tax_percentage(dec!(5)).unwrap().bps(), 500);
        assert_eq!(parse_tax_percentage(dec!(7.50)).unwrap().bps(), 750);
        assert_eq!(parse_tax_percentage(dec!(0)).unwrap(), TaxRate::zero());

        assert!(matches!(
            parse_tax_percentage(dec!(-5)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(parse_tax_percentage(dec!(100.01)).is_err());
        assert!(matches!(
            parse_tax_percentage(dec!(7.125)),
            Err(ValidationError::TooPrecise { .. })
        ));
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0, 100).is_ok());
        assert!(validate_cart_size(99, 100).is_ok());
        assert!(validate_cart_size(100, 100).is_err());
    }

    #[test]
    fn test_validate_strings() {
        assert_eq!(validate_unit(" kg ").unwrap(), "kg");
        assert!(validate_unit("   ").is_err());
        assert_eq!(validate_search_query("  rice ").unwrap(), "rice");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
        assert_eq!(validate_payment_method(" Card ").unwrap(), "card");
        assert!(validate_payment_method("cash:10").is_err());
        assert!(validate_payment_method("").is_err());
    }
}

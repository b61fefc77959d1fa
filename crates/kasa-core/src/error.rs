//! # Error Types
//!
//! Domain-specific error types for kasa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasa-core errors (this file)                                          │
//! │  ├── CoreError        - Cart / pricing / tender rule violations        │
//! │  └── ValidationError  - Field-level input validation failures          │
//! │                                                                         │
//! │  kasa-session errors (separate crate)                                  │
//! │  └── SessionError     - Backend failures, submission, resume           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SessionError → UI message         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these errors is fatal. A rejected mutation leaves the cart
//! exactly as it was, so the cashier can correct the input and retry.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Cart, pricing and tender errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Local stock pre-check failed.
    ///
    /// ## User Workflow
    /// ```text
    /// Scan "Rice 1kg" (stock snapshot: 3, already in cart: 3)
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Rice 1kg", available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 Rice 1kg in stock"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        product: String,
        available: Decimal,
        requested: Decimal,
    },

    /// Authoritative stock re-check at checkout failed.
    ///
    /// Distinct from [`CoreError::InsufficientStock`]: the local snapshot
    /// said yes, the backend now says no.
    #[error("Stock changed for {product}: only {available} available, cart needs {requested}")]
    StaleStockOnCheckout {
        product_id: i64,
        product: String,
        available: Decimal,
        requested: Decimal,
    },

    /// Quantity input rejected.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(#[source] ValidationError),

    /// Price input rejected.
    #[error("Invalid price: {0}")]
    InvalidPrice(#[source] ValidationError),

    /// Discount input rejected.
    #[error("Invalid discount: {0}")]
    InvalidDiscount(#[source] ValidationError),

    /// Split tender does not cover the sale total.
    #[error("Payment short by {shortfall}: paid {paid}, total {total}")]
    PaymentShortfall {
        paid: Money,
        total: Money,
        shortfall: Money,
    },

    /// Held-sale record could not be read at all.
    ///
    /// Individual malformed lines are normalized during resume; this
    /// error is only raised when the snapshot itself is unreadable.
    #[error("Held sale is corrupt: {reason}")]
    HeldSaleCorrupt { reason: String },

    /// Cart line id does not exist.
    #[error("Cart line not found: {0}")]
    LineNotFound(String),

    /// Unit is not configured for the product's base unit.
    #[error("Unit '{unit}' is not available for base unit '{base_unit}'")]
    UnitNotAvailable { unit: String, base_unit: String },

    /// Cart has reached its line limit.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Checkout or hold attempted on an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for errors caused by stock limits (local or authoritative).
    pub fn is_stock_error(&self) -> bool {
        matches!(
            self,
            CoreError::InsufficientStock { .. } | CoreError::StaleStockOnCheckout { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any cart state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: Decimal,
        max: Decimal,
    },

    /// Too many decimal places.
    #[error("{field} allows at most {max_scale} decimal places")]
    TooPrecise { field: String, max_scale: u32 },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: 7,
            product: "Rice 1kg".to_string(),
            available: dec!(3),
            requested: dec!(4),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Rice 1kg: available 3, requested 4"
        );

        let err = CoreError::PaymentShortfall {
            paid: Money::from_cents(8000),
            total: Money::from_cents(9000),
            shortfall: Money::from_cents(1000),
        };
        assert_eq!(err.to_string(), "Payment short by 10.00: paid 80.00, total 90.00");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");

        let err = ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: dec!(0),
            max: dec!(100),
        };
        assert_eq!(err.to_string(), "discount must be between 0 and 100");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "unit".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_stock_error_classification() {
        let stale = CoreError::StaleStockOnCheckout {
            product_id: 1,
            product: "Milk".into(),
            available: dec!(1),
            requested: dec!(2),
        };
        assert!(stale.is_stock_error());
        assert!(!CoreError::EmptyCart.is_stock_error());
    }
}

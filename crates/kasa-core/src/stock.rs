//! # Stock Checks
//!
//! Two gates keep the cart within available stock.
//!
//! ```text
//!   add / increment                       checkout
//!   ───────────────                       ────────
//!   local snapshot on the line            fresh product from the backend
//!   check_increment()                     check_authoritative()
//!   → InsufficientStock                   → StaleStockOnCheckout
//! ```
//!
//! A product may sit on several lines (2 boxes + 3 pieces), so both gates
//! compare against the product's total base quantity across the cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::Product;

/// Stock state of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockStatus {
    /// Tracking disabled or stock unlimited.
    NoCheck,
    CheckedOk,
    CheckedInsufficient,
}

/// Classifies the cart's total demand for a product against its limit.
pub fn status(limit: Option<Decimal>, in_cart: Decimal) -> StockStatus {
    match limit {
        None => StockStatus::NoCheck,
        Some(available) if in_cart <= available => StockStatus::CheckedOk,
        Some(_) => StockStatus::CheckedInsufficient,
    }
}

/// Total base quantity the cart needs of one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDemand {
    pub product_id: i64,
    pub name: String,
    pub quantity: Decimal,
}

/// Rejects an increment that would push the product past its local limit.
///
/// `in_cart` is the product's current total excluding the line being
/// changed; `requested` is that line's new quantity.
pub fn check_increment(
    product_id: i64,
    name: &str,
    limit: Option<Decimal>,
    in_cart: Decimal,
    requested: Decimal,
) -> CoreResult<()> {
    let Some(available) = limit else {
        return Ok(());
    };
    let total = in_cart + requested;
    if total > available {
        return Err(CoreError::InsufficientStock {
            product_id,
            product: name.to_string(),
            available,
            requested: total,
        });
    }
    Ok(())
}

/// Checks the cart's demand against a freshly fetched product.
pub fn check_authoritative(fresh: &Product, demand: &StockDemand) -> CoreResult<()> {
    match fresh.stock_limit() {
        Some(available) if demand.quantity > available => Err(CoreError::StaleStockOnCheckout {
            product_id: demand.product_id,
            product: fresh.name.clone(),
            available,
            requested: demand.quantity,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(stock: Option<Decimal>, track: bool) -> Product {
        Product {
            id: 9,
            name: "Rice 1kg".to_string(),
            barcode: None,
            category_id: None,
            price: dec!(2),
            vat_percentage: Default::default(),
            base_unit: "piece".to_string(),
            sale_unit: None,
            track_stock: track,
            stock_quantity: stock,
            has_weight: false,
            weight_unit: None,
        }
    }

    #[test]
    fn test_status() {
        assert_eq!(status(None, dec!(50)), StockStatus::NoCheck);
        assert_eq!(status(Some(dec!(5)), dec!(5)), StockStatus::CheckedOk);
        assert_eq!(status(Some(dec!(5)), dec!(5.5)), StockStatus::CheckedInsufficient);
    }

    #[test]
    fn test_increment_counts_other_lines() {
        // 2 already on another line, asking for 3 more with 4 in stock
        let err = check_increment(9, "Rice 1kg", Some(dec!(4)), dec!(2), dec!(3)).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, dec!(4));
                assert_eq!(requested, dec!(5));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(check_increment(9, "Rice 1kg", Some(dec!(5)), dec!(2), dec!(3)).is_ok());
        assert!(check_increment(9, "Rice 1kg", None, dec!(2), dec!(300)).is_ok());
    }

    #[test]
    fn test_authoritative_check() {
        let demand = StockDemand {
            product_id: 9,
            name: "Rice 1kg".to_string(),
            quantity: dec!(3),
        };

        assert!(check_authoritative(&product(Some(dec!(3)), true), &demand).is_ok());
        assert!(check_authoritative(&product(Some(dec!(1)), false), &demand).is_ok());
        assert!(check_authoritative(&product(None, true), &demand).is_ok());

        let err = check_authoritative(&product(Some(dec!(2)), true), &demand).unwrap_err();
        assert!(matches!(
            err,
            CoreError::StaleStockOnCheckout { available, .. } if available == dec!(2)
        ));
    }
}

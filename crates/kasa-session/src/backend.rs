//! # Backend Contract
//!
//! The logical operations the billing session needs from the store backend.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Backend method            Endpoint                                     │
//! │  ──────────────            ────────                                     │
//! │  list_products()           GET    /products[?category_id][&search]...   │
//! │  unit_conversions()        GET    /unit-conversions                     │
//! │  product()                 GET    /products/:id                         │
//! │  submit_sale()             POST   /sales                                │
//! │  create_held_sale()        POST   /held-sales                           │
//! │  list_held_sales()         GET    /sales/held/list                      │
//! │  delete_held_sale()        DELETE /held-sales/:id                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transport, auth, timeouts and retries belong to the implementation.
//! [`crate::memory::InMemoryBackend`] implements the contract in process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kasa_core::held::{HeldSale, HeldSaleSnapshot};
use kasa_core::validation::validate_search_query;
use kasa_core::{CoreResult, Money, Product, SaleRequest, UnitConversion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

pub type BackendResult<T> = Result<T, BackendError>;

/// A failed backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Network failure or timeout; nothing reached the backend.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error status.
    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("{0} not found")]
    NotFound(String),

    /// The response body could not be read.
    #[error("Invalid backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Unavailable(_) => true,
            BackendError::Rejected { status, .. } => *status >= 500,
            BackendError::NotFound(_) | BackendError::Decode(_) => false,
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Filters of `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

impl ProductQuery {
    pub fn all() -> Self {
        ProductQuery::default()
    }

    /// Name or barcode-prefix search. An empty term matches everything.
    pub fn search(term: &str) -> CoreResult<Self> {
        let term = validate_search_query(term)?;
        Ok(ProductQuery {
            search: Some(term).filter(|t| !t.is_empty()),
            ..ProductQuery::default()
        })
    }

    pub fn barcode(code: &str) -> Self {
        ProductQuery {
            barcode: Some(code.trim().to_string()),
            ..ProductQuery::default()
        }
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Whether a product passes every set filter.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category_id {
            if product.category_id != Some(category) {
                return false;
            }
        }
        if let Some(code) = &self.barcode {
            if product.barcode.as_deref() != Some(code.as_str()) {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let by_name = product.name.to_lowercase().contains(&term);
            let by_code = product
                .barcode
                .as_deref()
                .is_some_and(|code| code.starts_with(term.as_str()));
            if !by_name && !by_code {
                return false;
            }
        }
        true
    }
}

/// Answer of `POST /sales`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub id: i64,
    pub total: Money,
    pub change_amount: Money,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Backend Trait
// =============================================================================

#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> BackendResult<Vec<Product>>;

    async fn unit_conversions(&self) -> BackendResult<Vec<UnitConversion>>;

    /// Fresh product, used for the authoritative stock re-check.
    async fn product(&self, id: i64) -> BackendResult<Product>;

    async fn submit_sale(&self, sale: &SaleRequest) -> BackendResult<SaleReceipt>;

    async fn create_held_sale(&self, snapshot: &HeldSaleSnapshot) -> BackendResult<HeldSale>;

    async fn list_held_sales(&self) -> BackendResult<Vec<HeldSale>>;

    async fn delete_held_sale(&self, id: i64) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasa_core::TaxRate;
    use rust_decimal_macros::dec;

    fn product() -> Product {
        Product {
            id: 1,
            name: "Basmati Rice".to_string(),
            barcode: Some("6291041500213".to_string()),
            category_id: Some(3),
            price: dec!(4.5),
            vat_percentage: TaxRate::zero(),
            base_unit: "kg".to_string(),
            sale_unit: None,
            track_stock: false,
            stock_quantity: None,
            has_weight: true,
            weight_unit: None,
        }
    }

    #[test]
    fn test_query_filters() {
        let p = product();
        assert!(ProductQuery::all().matches(&p));
        assert!(ProductQuery::search("rice").unwrap().matches(&p));
        assert!(ProductQuery::search("629104").unwrap().matches(&p));
        assert!(!ProductQuery::search("sugar").unwrap().matches(&p));
        assert!(ProductQuery::barcode(" 6291041500213 ").matches(&p));
        assert!(!ProductQuery::all().in_category(4).matches(&p));
        assert!(ProductQuery::search("  ").unwrap().matches(&p));
        assert!(ProductQuery::search(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_retryable() {
        assert!(BackendError::Unavailable("reset".into()).is_retryable());
        assert!(!BackendError::NotFound("product 1".into()).is_retryable());
        assert!(!BackendError::Rejected {
            status: 409,
            message: "conflict".into()
        }
        .is_retryable());
    }
}

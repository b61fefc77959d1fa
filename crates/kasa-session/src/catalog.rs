//! # Catalog Cache
//!
//! Products and the unit conversion table, as last fetched from the backend.
//!
//! ```text
//!   load()/refresh() ──► GET /products + GET /unit-conversions
//!                              │
//!                              ▼
//!   Catalog { by id, by barcode, conversions, loaded_at }
//!                              │
//!   product() / by_barcode() / search() / units_for()   (no I/O)
//! ```
//!
//! The cache never re-prices cart lines; lines keep the price they were
//! added at. Only stock snapshots flow from a refresh into the cart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use kasa_core::units::available_units;
use kasa_core::{Product, UnitConversion};
use tracing::{debug, info};

use crate::backend::{Backend, ProductQuery};
use crate::error::SessionResult;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: HashMap<i64, Product>,
    by_barcode: HashMap<String, i64>,
    conversions: Vec<UnitConversion>,
    loaded_at: Option<DateTime<Utc>>,
}

impl Catalog {
    /// Builds a catalog from already fetched data.
    pub fn from_parts(products: Vec<Product>, conversions: Vec<UnitConversion>) -> Self {
        let mut catalog = Catalog {
            conversions,
            ..Catalog::default()
        };
        for product in products {
            catalog.upsert(product);
        }
        catalog
    }

    /// Fetches the whole catalog.
    pub async fn fetch(backend: &dyn Backend) -> SessionResult<Self> {
        let products = backend.list_products(&ProductQuery::all()).await?;
        let conversions = backend.unit_conversions().await?;

        let mut catalog = Catalog::from_parts(products, conversions);
        catalog.loaded_at = Some(Utc::now());
        info!(
            products = catalog.products.len(),
            conversions = catalog.conversions.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Inserts or replaces one product, keeping the barcode index in step.
    pub fn upsert(&mut self, product: Product) {
        if let Some(old) = self.products.get(&product.id) {
            if let Some(code) = &old.barcode {
                self.by_barcode.remove(code);
            }
        }
        if let Some(code) = product.barcode.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            self.by_barcode.insert(code.to_string(), product.id);
        }
        debug!(product_id = product.id, "Catalog product updated");
        self.products.insert(product.id, product);
    }

    pub fn product(&self, id: i64) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn by_barcode(&self, code: &str) -> Option<&Product> {
        self.by_barcode
            .get(code.trim())
            .and_then(|id| self.products.get(id))
    }

    /// Local search, sorted by name.
    pub fn search(&self, query: &ProductQuery) -> Vec<&Product> {
        let mut found: Vec<&Product> = self.products.values().filter(|p| query.matches(p)).collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        found
    }

    pub fn conversions(&self) -> &[UnitConversion] {
        &self.conversions
    }

    /// Units a product can be sold in, base unit included.
    pub fn units_for(&self, product: &Product) -> Vec<String> {
        available_units(&product.base_unit, &self.conversions)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

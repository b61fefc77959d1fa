//! In-process [`Backend`] for tests, demos and the quote tool.
//!
//! Keeps products, conversions, sales and held sales in memory. Submitting
//! a sale decrements tracked stock, so a second session sees the sale the
//! same way it would against a real backend. Any operation can be told to
//! fail once with [`InMemoryBackend::fail_next`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use kasa_core::held::{HeldSale, HeldSaleSnapshot};
use kasa_core::{Product, SaleRequest, UnitConversion};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::debug;

use crate::backend::{Backend, BackendError, BackendResult, ProductQuery, SaleReceipt};

/// Backend call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListProducts,
    UnitConversions,
    Product,
    SubmitSale,
    CreateHeldSale,
    ListHeldSales,
    DeleteHeldSale,
}

#[derive(Debug, Default)]
struct Store {
    products: BTreeMap<i64, Product>,
    conversions: Vec<UnitConversion>,
    sales: Vec<SaleRequest>,
    held: BTreeMap<i64, HeldSale>,
    next_sale_id: i64,
    next_held_id: i64,
    failures: HashMap<Operation, BackendError>,
}

impl Store {
    fn take_failure(&mut self, op: Operation) -> BackendResult<()> {
        match self.failures.remove(&op) {
            Some(err) => {
                debug!(?op, %err, "Injected backend failure");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    store: Mutex<Store>,
}

impl InMemoryBackend {
    pub fn new(products: Vec<Product>, conversions: Vec<UnitConversion>) -> Self {
        let store = Store {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            conversions,
            next_sale_id: 1,
            next_held_id: 1,
            ..Store::default()
        };
        InMemoryBackend {
            store: Mutex::new(store),
        }
    }

    /// Makes the next call of `op` fail with `err`.
    pub async fn fail_next(&self, op: Operation, err: BackendError) {
        self.store.lock().await.failures.insert(op, err);
    }

    /// Sets a product's stock, as another register selling it would.
    pub async fn set_stock(&self, product_id: i64, stock: Option<Decimal>) {
        if let Some(product) = self.store.lock().await.products.get_mut(&product_id) {
            product.stock_quantity = stock;
        }
    }

    pub async fn upsert_product(&self, product: Product) {
        self.store.lock().await.products.insert(product.id, product);
    }

    pub async fn submitted_sales(&self) -> Vec<SaleRequest> {
        self.store.lock().await.sales.clone()
    }

    pub async fn held_count(&self) -> usize {
        self.store.lock().await.held.len()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn list_products(&self, query: &ProductQuery) -> BackendResult<Vec<Product>> {
        let mut store = self.store.lock().await;
        store.take_failure(Operation::ListProducts)?;
        Ok(store
            .products
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect())
    }

    async fn unit_conversions(&self) -> BackendResult<Vec<UnitConversion>> {
        let mut store = self.store.lock().await;
        store.take_failure(Operation::UnitConversions)?;
        Ok(store.conversions.clone())
    }

    async fn product(&self, id: i64) -> BackendResult<Product> {
        let mut store = self.store.lock().await;
        store.take_failure(Operation::Product)?;
        store
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("product {id}")))
    }

    async fn submit_sale(&self, sale: &SaleRequest) -> BackendResult<SaleReceipt> {
        let mut store = self.store.lock().await;
        store.take_failure(Operation::SubmitSale)?;

        if let Some(item) = sale
            .items
            .iter()
            .find(|item| !store.products.contains_key(&item.product_id))
        {
            return Err(BackendError::Rejected {
                status: 422,
                message: format!("unknown product {}", item.product_id),
            });
        }
        for item in &sale.items {
            if let Some(product) = store.products.get_mut(&item.product_id) {
                if let (true, Some(stock)) = (product.track_stock, product.stock_quantity.as_mut()) {
                    *stock -= item.quantity;
                }
            }
        }

        let id = store.next_sale_id;
        store.next_sale_id += 1;
        store.sales.push(sale.clone());

        Ok(SaleReceipt {
            id,
            total: sale.total,
            change_amount: sale.change_amount,
            created_at: Utc::now(),
        })
    }

    async fn create_held_sale(&self, snapshot: &HeldSaleSnapshot) -> BackendResult<HeldSale> {
        let mut store = self.store.lock().await;
        store.take_failure(Operation::CreateHeldSale)?;

        let id = store.next_held_id;
        store.next_held_id += 1;
        let held = HeldSale {
            id,
            created_at: Utc::now(),
            snapshot: snapshot.clone(),
        };
        store.held.insert(id, held.clone());
        Ok(held)
    }

    async fn list_held_sales(&self) -> BackendResult<Vec<HeldSale>> {
        let mut store = self.store.lock().await;
        store.take_failure(Operation::ListHeldSales)?;
        Ok(store.held.values().cloned().collect())
    }

    async fn delete_held_sale(&self, id: i64) -> BackendResult<()> {
        let mut store = self.store.lock().await;
        store.take_failure(Operation::DeleteHeldSale)?;
        store
            .held
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(format!("held sale {id}")))
    }
}

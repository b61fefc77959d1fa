//! # Billing Session
//!
//! Owns the live cart of one register and sequences its backend calls.
//!
//! ## Checkout Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        checkout(tenders)                                │
//! │                                                                         │
//! │  Phase 1 (local)     cart.validate_for_checkout()                       │
//! │       │              └── EmptyCart / InsufficientStock                  │
//! │       ▼                                                                 │
//! │  Phase 2 (backend)   GET /products/:id per distinct product             │
//! │       │              └── StaleStockOnCheckout (fresh stock merged in)   │
//! │       │              repeated for new demand if the cart changed        │
//! │       ▼                                                                 │
//! │  Prepare             SaleRequest::prepare(latest cart, tenders)         │
//! │       │              └── PaymentShortfall                               │
//! │       ▼                                                                 │
//! │  Submit              POST /sales                                        │
//! │       │              └── SaleSubmissionFailure (cart kept)              │
//! │       ▼                                                                 │
//! │  Confirmed           cart cleared                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//! The cart sits behind a `std::sync::Mutex` that is never held across an
//! `.await`. Every backend answer is merged into the cart as it is *then*,
//! never into a copy taken before the call.
//!
//! ## Resume Sequence
//! fetch → migrate into a local cart → `DELETE /held-sales/:id` → install.
//! A failed delete discards the local cart and the held sale stays
//! resumable. A crash between delete and install loses the held sale.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

use kasa_core::held::{HeldSaleSnapshot, HeldSaleSummary, Migration};
use kasa_core::stock::check_authoritative;
use kasa_core::{
    Cart, CartLine, CoreError, DiscountKind, HeldSale, Product, SaleRequest, TaxRate, Tender,
    Totals,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendError, SaleReceipt};
use crate::catalog::Catalog;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};

// =============================================================================
// Outcomes
// =============================================================================

/// A confirmed sale.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub receipt: SaleReceipt,
    pub sale: SaleRequest,
}

/// A resumed held sale, now the live cart.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeOutcome {
    pub held_id: i64,
    /// The held sale was written by an older client.
    pub legacy: bool,
    pub migrations: Vec<Migration>,
    pub totals: Totals,
}

// =============================================================================
// Billing Session
// =============================================================================

pub struct BillingSession {
    backend: Arc<dyn Backend>,
    config: SessionConfig,
    cart: Arc<Mutex<Cart>>,
    catalog: Arc<RwLock<Catalog>>,
}

impl BillingSession {
    /// Creates a session with an empty cart shaped by `config`.
    pub fn new(backend: Arc<dyn Backend>, config: SessionConfig) -> Self {
        let mut cart = Cart::with_policy(config.cart_policy());
        if let Err(e) = cart.set_sale_vat(config.sale_vat()) {
            warn!(error = %e, "Configured sale VAT rejected, using 0%");
        }
        cart.set_no_vat(config.pricing.no_vat);

        BillingSession {
            backend,
            config,
            cart: Arc::new(Mutex::new(cart)),
            catalog: Arc::new(RwLock::new(Catalog::default())),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Cart Access
    // -------------------------------------------------------------------------

    fn lock_cart(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with read access to the live cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        f(&self.lock_cart())
    }

    /// Runs one mutation against the live cart.
    fn mutate<F, R>(&self, f: F) -> SessionResult<R>
    where
        F: FnOnce(&mut Cart) -> Result<R, CoreError>,
    {
        let mut cart = self.lock_cart();
        f(&mut cart).map_err(SessionError::from)
    }

    pub fn snapshot(&self) -> Cart {
        self.lock_cart().clone()
    }

    pub fn totals(&self) -> Totals {
        self.lock_cart().totals()
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.lock_cart().lines().to_vec()
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// Fetches products and unit conversions, then refreshes the stock
    /// snapshot of every line already in the cart.
    pub async fn load_catalog(&self) -> SessionResult<usize> {
        let fresh = Catalog::fetch(self.backend.as_ref()).await?;
        let count = fresh.len();

        let mut cart = self.lock_cart();
        let product_ids: BTreeSet<i64> = cart.lines().iter().map(|l| l.product_id).collect();
        for id in product_ids {
            if let Some(product) = fresh.product(id) {
                cart.merge_stock(id, product.stock_limit());
            }
        }
        drop(cart);

        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        Ok(count)
    }

    /// Catalog read access.
    pub fn with_catalog<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Catalog) -> R,
    {
        f(&self.read_catalog())
    }

    fn conversions(&self) -> Vec<kasa_core::UnitConversion> {
        self.read_catalog().conversions().to_vec()
    }

    /// Catalog product, falling back to `GET /products/:id`.
    async fn resolve_product(&self, product_id: i64) -> SessionResult<Product> {
        if let Some(product) = self.read_catalog().product(product_id).cloned() {
            return Ok(product);
        }
        let product = self.fetch_product(product_id).await?;
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .upsert(product.clone());
        Ok(product)
    }

    async fn fetch_product(&self, product_id: i64) -> SessionResult<Product> {
        self.backend.product(product_id).await.map_err(|e| match e {
            BackendError::NotFound(_) => SessionError::ProductNotFound(product_id),
            other => SessionError::Backend(other),
        })
    }

    // -------------------------------------------------------------------------
    // Line Mutations
    // -------------------------------------------------------------------------

    /// Adds a product in its default unit.
    pub async fn add_product(&self, product_id: i64, quantity: Decimal) -> SessionResult<String> {
        let product = self.resolve_product(product_id).await?;
        debug!(product_id, %quantity, "add_product");

        let unit = product.default_unit().to_string();
        if unit == product.base_unit {
            self.mutate(|cart| cart.add_product(&product, quantity))
        } else {
            let conversions = self.conversions();
            self.mutate(|cart| cart.add_product_in_unit(&product, &unit, quantity, &conversions))
        }
    }

    /// Adds the product with this barcode from the catalog.
    pub fn scan_barcode(&self, code: &str, quantity: Decimal) -> SessionResult<String> {
        let product = self
            .read_catalog()
            .by_barcode(code)
            .cloned()
            .ok_or_else(|| SessionError::BarcodeNotFound(code.trim().to_string()))?;
        debug!(product_id = product.id, barcode = %code, "scan_barcode");
        self.mutate(|cart| cart.add_product(&product, quantity))
    }

    pub async fn add_product_in_unit(
        &self,
        product_id: i64,
        unit: &str,
        display_quantity: Decimal,
    ) -> SessionResult<String> {
        let product = self.resolve_product(product_id).await?;
        let conversions = self.conversions();
        debug!(product_id, unit, %display_quantity, "add_product_in_unit");
        self.mutate(|cart| cart.add_product_in_unit(&product, unit, display_quantity, &conversions))
    }

    pub async fn add_weighed_product(&self, product_id: i64, weight: Decimal) -> SessionResult<String> {
        let product = self.resolve_product(product_id).await?;
        let conversions = self.conversions();
        debug!(product_id, %weight, "add_weighed_product");
        self.mutate(|cart| cart.add_weighed_product(&product, weight, &conversions))
    }

    pub fn update_quantity(&self, line_id: &str, quantity: Decimal) -> SessionResult<()> {
        let conversions = self.conversions();
        debug!(line_id, %quantity, "update_quantity");
        self.mutate(|cart| cart.update_quantity(line_id, quantity, &conversions))
    }

    pub fn update_display_quantity(&self, line_id: &str, quantity: Decimal) -> SessionResult<()> {
        let conversions = self.conversions();
        debug!(line_id, %quantity, "update_display_quantity");
        self.mutate(|cart| cart.update_display_quantity(line_id, quantity, &conversions))
    }

    pub fn change_unit(&self, line_id: &str, unit: &str) -> SessionResult<()> {
        let conversions = self.conversions();
        debug!(line_id, unit, "change_unit");
        self.mutate(|cart| cart.change_unit(line_id, unit, &conversions))
    }

    pub fn override_unit_price(&self, line_id: &str, unit_price: Decimal) -> SessionResult<()> {
        debug!(line_id, %unit_price, "override_unit_price");
        self.mutate(|cart| cart.override_unit_price(line_id, unit_price))
    }

    pub fn remove_line(&self, line_id: &str) -> SessionResult<CartLine> {
        debug!(line_id, "remove_line");
        self.mutate(|cart| cart.remove_line(line_id))
    }

    // -------------------------------------------------------------------------
    // Sale-level Settings
    // -------------------------------------------------------------------------

    pub fn set_discount(&self, kind: DiscountKind, value: Decimal) -> SessionResult<Totals> {
        debug!(kind = kind.as_str(), %value, "set_discount");
        self.mutate(|cart| {
            cart.set_discount(kind, value)?;
            Ok(cart.totals())
        })
    }

    pub fn clear_discount(&self) -> Totals {
        let mut cart = self.lock_cart();
        cart.clear_discount();
        cart.totals()
    }

    pub fn set_sale_vat(&self, rate: TaxRate) -> SessionResult<Totals> {
        debug!(vat = %rate.percentage(), "set_sale_vat");
        self.mutate(|cart| {
            cart.set_sale_vat(rate)?;
            Ok(cart.totals())
        })
    }

    pub fn set_no_vat(&self, no_vat: bool) -> Totals {
        let mut cart = self.lock_cart();
        cart.set_no_vat(no_vat);
        cart.totals()
    }

    pub fn set_customer(&self, customer_id: Option<i64>) {
        self.lock_cart().set_customer(customer_id);
    }

    pub fn set_notes(&self, notes: Option<String>) {
        self.lock_cart().set_notes(notes);
    }

    pub fn clear(&self) {
        debug!("clear cart");
        self.lock_cart().clear();
    }

    // -------------------------------------------------------------------------
    // Stock
    // -------------------------------------------------------------------------

    /// Re-fetches every product in the cart and merges the fresh stock into
    /// the cart as it is when each answer arrives.
    ///
    /// Returns the number of lines whose snapshot was updated.
    pub async fn refresh_stock(&self) -> SessionResult<usize> {
        let product_ids: BTreeSet<i64> =
            self.with_cart(|cart| cart.lines().iter().map(|l| l.product_id).collect());

        let mut touched = 0;
        for id in product_ids {
            let fresh = self.fetch_product(id).await?;
            touched += self.learn_stock(fresh);
        }
        debug!(touched, "Stock refreshed");
        Ok(touched)
    }

    /// Merges a freshly fetched product into the live cart and the catalog,
    /// so later adds see the same stock. Returns the lines updated.
    fn learn_stock(&self, fresh: Product) -> usize {
        let touched = self.lock_cart().merge_stock(fresh.id, fresh.stock_limit());
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .upsert(fresh);
        touched
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Two-phase checkout followed by submission. See the module docs.
    ///
    /// On any error the cart is left as it was, apart from fresh stock
    /// snapshots learned during the re-check.
    pub async fn checkout(&self, tenders: Vec<Tender>) -> SessionResult<CheckoutOutcome> {
        // Phase 1
        let (mut demand, mut checked_revision) = {
            let cart = self.lock_cart();
            cart.validate_for_checkout()?;
            (cart.stock_demand(), cart.revision())
        };

        // Phase 2, repeated for whatever the cashier added while it ran
        let enforce = self.config.cart.enforce_stock;
        let mut verified: HashMap<i64, Decimal> = HashMap::new();
        let (sale, submitted_revision) = loop {
            for item in &demand {
                if verified
                    .get(&item.product_id)
                    .is_some_and(|checked| *checked >= item.quantity)
                {
                    continue;
                }
                let fresh = self.fetch_product(item.product_id).await?;
                let result = check_authoritative(&fresh, item);
                self.learn_stock(fresh);
                if enforce {
                    if let Err(e) = result {
                        warn!(product_id = item.product_id, error = %e, "Checkout blocked by stock re-check");
                        return Err(e.into());
                    }
                }
                verified.insert(item.product_id, item.quantity);
            }

            let cart = self.lock_cart();
            if cart.revision() == checked_revision {
                break (SaleRequest::prepare(&cart, tenders)?, checked_revision);
            }
            warn!(
                checked = checked_revision,
                current = cart.revision(),
                "Cart changed during stock re-check, checking again"
            );
            cart.validate_for_checkout()?;
            demand = cart.stock_demand();
            checked_revision = cart.revision();
        };

        let receipt = self
            .backend
            .submit_sale(&sale)
            .await
            .map_err(|source| {
                warn!(error = %source, "Sale submission failed, cart kept");
                SessionError::SaleSubmissionFailure { source }
            })?;

        let mut cart = self.lock_cart();
        if cart.revision() != submitted_revision {
            warn!(sale_id = receipt.id, "Cart edited while the sale was submitted");
        }
        cart.clear();
        drop(cart);

        info!(
            sale_id = receipt.id,
            total = %sale.total,
            items = sale.items.len(),
            payment_method = %sale.payment_method,
            "Sale completed"
        );
        Ok(CheckoutOutcome { receipt, sale })
    }

    // -------------------------------------------------------------------------
    // Held Sales
    // -------------------------------------------------------------------------

    /// Stores the cart as a held sale, then clears it.
    pub async fn hold(&self) -> SessionResult<HeldSale> {
        let (snapshot, revision) = {
            let cart = self.lock_cart();
            (HeldSaleSnapshot::capture(&cart)?, cart.revision())
        };

        let held = self.backend.create_held_sale(&snapshot).await?;

        let mut cart = self.lock_cart();
        if cart.revision() != revision {
            warn!(held_id = held.id, "Cart edited while holding; edits after the hold are dropped");
        }
        cart.clear();
        drop(cart);

        info!(held_id = held.id, total = %held.snapshot.total, "Sale held");
        Ok(held)
    }

    pub async fn list_held(&self) -> SessionResult<Vec<HeldSaleSummary>> {
        let held = self.backend.list_held_sales().await?;
        Ok(held.iter().map(HeldSale::summary).collect())
    }

    /// Makes a held sale the live cart. Resumes at most once.
    pub async fn resume(&self, held_id: i64) -> SessionResult<ResumeOutcome> {
        self.ensure_cart_empty()?;

        let held = self
            .backend
            .list_held_sales()
            .await?
            .into_iter()
            .find(|h| h.id == held_id)
            .ok_or(SessionError::HeldSaleNotFound(held_id))?;

        let resumed = held.snapshot.resume(&self.conversions())?;
        for migration in &resumed.migrations {
            warn!(held_id, ?migration, "Held sale migrated");
        }

        // Only delete once the cart is captured, and only into an empty cart
        self.ensure_cart_empty()?;
        self.backend.delete_held_sale(held_id).await.map_err(|e| match e {
            BackendError::NotFound(_) => SessionError::HeldSaleNotFound(held_id),
            other => SessionError::Backend(other),
        })?;

        let totals = {
            let mut cart = self.lock_cart();
            if !cart.is_empty() {
                warn!(held_id, "Cart filled while resuming; replacing it with the held sale");
            }
            cart.adopt(resumed.cart);
            cart.totals()
        };

        info!(held_id, legacy = resumed.legacy, total = %totals.total, "Held sale resumed");
        Ok(ResumeOutcome {
            held_id,
            legacy: resumed.legacy,
            migrations: resumed.migrations,
            totals,
        })
    }

    fn ensure_cart_empty(&self) -> SessionResult<()> {
        if self.lock_cart().is_empty() {
            Ok(())
        } else {
            Err(SessionError::CartNotEmpty)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

//! # Cart
//!
//! The owned cart aggregate of a billing session.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Billing screen           Cart method                 Line change       │
//! │  ──────────────           ───────────                 ───────────       │
//! │                                                                         │
//! │  Scan product ──────────► add_product() ────────────► push / merge      │
//! │  Pick "2 box" ──────────► add_product_in_unit() ────► qty = 24 piece    │
//! │  Scale reading ─────────► add_weighed_product() ────► qty = 0.735 kg    │
//! │  Edit quantity ─────────► update_quantity() ────────► re-price line     │
//! │  Switch unit ───────────► change_unit() ────────────► re-derive display │
//! │  Type a price ──────────► override_unit_price() ────► base = U / (1+v)  │
//! │  Discount / VAT ────────► set_discount() / set_sale_vat()               │
//! │                                                                         │
//! │  Any change ────────────► totals() ─────────────────► Totals (copy)     │
//! │                                                                         │
//! │  NOTE: every method validates before touching state. An Err leaves     │
//! │        the cart exactly as it was.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `quantity` is in the product's base unit, rounded to 4 places
//! - `total_price == round2(unit_price × quantity)` after every edit
//! - a unit-converted line satisfies `quantity == round4(to_base(display_quantity))`;
//!   a display quantity derived from the base quantity is kept unrounded
//!   and only rounded on output
//! - lines keep insertion order

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::discount::{Discount, DiscountKind, DEFAULT_PERCENT_CAP};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{price_from_base, price_from_inclusive, price_line, LinePrice};
use crate::serde_decimal;
use crate::stock::{self, StockDemand, StockStatus};
use crate::totals::{aggregate, LineAmounts, Totals};
use crate::types::{Product, TaxRate, UnitConversion};
use crate::units::{from_base, is_available, round_quantity, to_base};
use crate::validation::{
    validate_cart_size, validate_quantity, validate_tax_rate, validate_unit, validate_unit_price,
};
use crate::MAX_CART_LINES;

// =============================================================================
// Line Kind
// =============================================================================

/// What kind of quantity a line carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum LineKind {
    /// Counted in the base unit.
    Simple,
    /// Read off a scale.
    WeightBased { weight_unit: String },
    /// Entered in a configured display unit.
    UnitConverted {
        selected_unit: String,
        #[serde(with = "serde_decimal")]
        #[ts(type = "number")]
        display_quantity: Decimal,
    },
}

impl LineKind {
    /// Two kinds that can share one cart line.
    fn same_slot(&self, other: &LineKind) -> bool {
        match (self, other) {
            (LineKind::Simple, LineKind::Simple) => true,
            (LineKind::WeightBased { weight_unit: a }, LineKind::WeightBased { weight_unit: b }) => {
                a == b
            }
            (
                LineKind::UnitConverted {
                    selected_unit: a, ..
                },
                LineKind::UnitConverted {
                    selected_unit: b, ..
                },
            ) => a == b,
            _ => false,
        }
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// Prices are frozen when the line is created; a later catalog change does
/// not re-price lines already in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub id: String,
    pub product_id: i64,
    pub name: String,
    pub base_unit: String,

    /// Quantity in the base unit.
    #[serde(with = "serde_decimal")]
    #[ts(type = "number")]
    pub quantity: Decimal,

    pub kind: LineKind,

    /// VAT-exclusive price per base unit.
    #[serde(with = "serde_decimal")]
    #[ts(type = "number")]
    pub base_unit_price: Decimal,

    /// VAT-inclusive price per base unit.
    #[serde(with = "serde_decimal")]
    #[ts(type = "number")]
    pub unit_price: Decimal,

    pub vat_percentage: TaxRate,
    pub vat_amount: Money,
    pub total_price: Money,

    /// Stock snapshot in base units; `None` when not limited.
    #[serde(with = "serde_decimal::option", default)]
    #[ts(type = "number | null")]
    pub stock_limit: Option<Decimal>,

    /// The cashier typed the unit price.
    #[serde(default)]
    pub price_overridden: bool,
}

impl CartLine {
    /// Creates a priced line from a catalog product.
    pub fn from_product(product: &Product, quantity: Decimal, kind: LineKind) -> Self {
        let priced = price_from_base(product.price, product.vat_percentage, quantity);
        let mut line = CartLine {
            id: Uuid::new_v4().to_string(),
            product_id: product.id,
            name: product.name.clone(),
            base_unit: product.base_unit.clone(),
            quantity,
            kind,
            base_unit_price: Decimal::ZERO,
            unit_price: Decimal::ZERO,
            vat_percentage: product.vat_percentage,
            vat_amount: Money::zero(),
            total_price: Money::zero(),
            stock_limit: product.stock_limit(),
            price_overridden: false,
        };
        line.apply_price(priced);
        line
    }

    /// Recomputes the line amounts from the stored unit prices.
    pub fn reprice(&mut self) {
        let priced = price_line(
            self.base_unit_price,
            self.unit_price,
            self.vat_percentage,
            self.quantity,
        );
        self.apply_price(priced);
    }

    pub(crate) fn apply_price(&mut self, priced: LinePrice) {
        self.base_unit_price = priced.base_unit_price;
        self.unit_price = priced.unit_price;
        self.vat_percentage = priced.vat_percentage;
        self.vat_amount = priced.vat_amount;
        self.total_price = priced.total_price;
    }

    /// Quantity as the cashier sees it, rounded to 4 places.
    pub fn display_quantity(&self) -> Decimal {
        match &self.kind {
            LineKind::UnitConverted {
                display_quantity, ..
            } => round_quantity(*display_quantity),
            _ => self.quantity,
        }
    }

    /// Unit of [`CartLine::display_quantity`].
    pub fn display_unit(&self) -> &str {
        match &self.kind {
            LineKind::UnitConverted { selected_unit, .. } => selected_unit,
            _ => &self.base_unit,
        }
    }

    /// Contribution to the cart totals.
    pub fn amounts(&self) -> LineAmounts {
        LineAmounts {
            base_value: self.base_unit_price * self.quantity,
            vat_amount: self.vat_amount,
        }
    }
}

// =============================================================================
// Cart Policy
// =============================================================================

/// Limits the cart enforces on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartPolicy {
    pub max_lines: usize,
    /// Reject increments beyond the local stock snapshot.
    pub enforce_stock: bool,
    /// Largest accepted percentage discount.
    pub percent_cap: Decimal,
}

impl Default for CartPolicy {
    fn default() -> Self {
        CartPolicy {
            max_lines: MAX_CART_LINES,
            enforce_stock: true,
            percent_cap: DEFAULT_PERCENT_CAP,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
    customer_id: Option<i64>,
    notes: Option<String>,
    discount: Discount,
    sale_vat: TaxRate,
    no_vat: bool,
    policy: CartPolicy,
    revision: u64,
}

impl Cart {
    /// Creates an empty cart with the default policy.
    pub fn new() -> Self {
        Cart::default()
    }

    pub fn with_policy(policy: CartPolicy) -> Self {
        Cart {
            policy,
            ..Cart::default()
        }
    }

    /// Rebuilds a cart from already priced lines.
    pub(crate) fn restore(
        lines: Vec<CartLine>,
        discount: Discount,
        sale_vat: TaxRate,
        no_vat: bool,
        customer_id: Option<i64>,
        notes: Option<String>,
    ) -> Self {
        Cart {
            lines,
            customer_id,
            notes,
            discount,
            sale_vat,
            no_vat,
            ..Cart::default()
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn customer_id(&self) -> Option<i64> {
        self.customer_id
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn discount(&self) -> Discount {
        self.discount
    }

    pub fn sale_vat(&self) -> TaxRate {
        self.sale_vat
    }

    pub fn no_vat(&self) -> bool {
        self.no_vat
    }

    pub fn policy(&self) -> CartPolicy {
        self.policy
    }

    /// Increases on every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Totals projection of the current state.
    pub fn totals(&self) -> Totals {
        aggregate(
            self.lines.iter().map(CartLine::amounts),
            &self.discount,
            self.sale_vat,
            self.no_vat,
        )
    }

    /// Total base quantity of a product across all its lines.
    pub fn quantity_of(&self, product_id: i64) -> Decimal {
        self.lines
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }

    /// Stock status of a line, judged on its product's cart-wide quantity.
    pub fn stock_status(&self, line_id: &str) -> CoreResult<StockStatus> {
        let line = self.find(line_id)?;
        Ok(stock::status(
            line.stock_limit,
            self.quantity_of(line.product_id),
        ))
    }

    /// Per distinct product, the total the cart needs. First-added order.
    pub fn stock_demand(&self) -> Vec<StockDemand> {
        let mut demand: Vec<StockDemand> = Vec::new();
        for line in &self.lines {
            match demand.iter_mut().find(|d| d.product_id == line.product_id) {
                Some(entry) => entry.quantity += line.quantity,
                None => demand.push(StockDemand {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    quantity: line.quantity,
                }),
            }
        }
        demand
    }

    /// Local checkout pass: non-empty and within every stock snapshot.
    pub fn validate_for_checkout(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        if !self.policy.enforce_stock {
            return Ok(());
        }
        for demand in self.stock_demand() {
            let limit = self
                .lines
                .iter()
                .find(|l| l.product_id == demand.product_id)
                .and_then(|l| l.stock_limit);
            stock::check_increment(
                demand.product_id,
                &demand.name,
                limit,
                Decimal::ZERO,
                demand.quantity,
            )?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Line Mutations
    // -------------------------------------------------------------------------

    /// Adds `quantity` base units of a product.
    ///
    /// Weighed products get a weight line. Returns the id of the line that
    /// received the quantity.
    pub fn add_product(&mut self, product: &Product, quantity: Decimal) -> CoreResult<String> {
        let kind = if product.has_weight {
            LineKind::WeightBased {
                weight_unit: weight_unit_of(product),
            }
        } else {
            LineKind::Simple
        };
        self.add_line(product, quantity, kind)
    }

    /// Adds a quantity entered in `unit` (e.g. 2 box).
    pub fn add_product_in_unit(
        &mut self,
        product: &Product,
        unit: &str,
        display_quantity: Decimal,
        conversions: &[UnitConversion],
    ) -> CoreResult<String> {
        let unit = validate_unit(unit)?;
        if unit == product.base_unit {
            return self.add_product(product, display_quantity);
        }
        if !is_available(&unit, &product.base_unit, conversions) {
            return Err(CoreError::UnitNotAvailable {
                unit,
                base_unit: product.base_unit.clone(),
            });
        }
        validate_quantity(display_quantity).map_err(CoreError::InvalidQuantity)?;

        let display_quantity = round_quantity(display_quantity);
        let quantity = to_base(&unit, display_quantity, &product.base_unit, conversions);
        self.add_line(
            product,
            quantity,
            LineKind::UnitConverted {
                selected_unit: unit,
                display_quantity,
            },
        )
    }

    /// Adds a scale reading, expressed in the product's weight unit.
    pub fn add_weighed_product(
        &mut self,
        product: &Product,
        weight: Decimal,
        conversions: &[UnitConversion],
    ) -> CoreResult<String> {
        validate_quantity(weight).map_err(CoreError::InvalidQuantity)?;
        let weight_unit = weight_unit_of(product);
        let quantity = to_base(&weight_unit, weight, &product.base_unit, conversions);
        self.add_line(product, quantity, LineKind::WeightBased { weight_unit })
    }

    fn add_line(&mut self, product: &Product, quantity: Decimal, kind: LineKind) -> CoreResult<String> {
        validate_quantity(quantity).map_err(CoreError::InvalidQuantity)?;
        validate_unit_price(product.price).map_err(CoreError::InvalidPrice)?;
        let quantity = round_quantity(quantity);
        let limit = product.stock_limit();

        let existing = self
            .lines
            .iter()
            .position(|l| l.product_id == product.id && !l.price_overridden && l.kind.same_slot(&kind));

        match existing {
            Some(idx) => {
                let merged = self.lines[idx].quantity + quantity;
                validate_quantity(merged).map_err(CoreError::InvalidQuantity)?;
                self.check_stock(product.id, &product.name, limit, None, quantity)?;

                let line = &mut self.lines[idx];
                line.quantity = merged;
                if let (
                    LineKind::UnitConverted {
                        display_quantity, ..
                    },
                    LineKind::UnitConverted {
                        display_quantity: added,
                        ..
                    },
                ) = (&mut line.kind, &kind)
                {
                    *display_quantity += *added;
                }
                line.reprice();
                let id = line.id.clone();

                self.merge_stock(product.id, limit);
                self.touch();
                Ok(id)
            }
            None => {
                validate_cart_size(self.lines.len(), self.policy.max_lines).map_err(|_| {
                    CoreError::CartTooLarge {
                        max: self.policy.max_lines,
                    }
                })?;
                self.check_stock(product.id, &product.name, limit, None, quantity)?;

                let line = CartLine::from_product(product, quantity, kind);
                let id = line.id.clone();
                self.lines.push(line);

                self.merge_stock(product.id, limit);
                self.touch();
                Ok(id)
            }
        }
    }

    /// Sets a line's base quantity. Zero removes the line.
    pub fn update_quantity(
        &mut self,
        line_id: &str,
        quantity: Decimal,
        conversions: &[UnitConversion],
    ) -> CoreResult<()> {
        if quantity.is_zero() {
            return self.remove_line(line_id).map(|_| ());
        }
        validate_quantity(quantity).map_err(CoreError::InvalidQuantity)?;
        let idx = self.index_of(line_id)?;
        let quantity = round_quantity(quantity);

        let display = match &self.lines[idx].kind {
            LineKind::UnitConverted { selected_unit, .. } => Some(from_base(
                selected_unit,
                quantity,
                &self.lines[idx].base_unit,
                conversions,
            )),
            _ => None,
        };
        self.set_line_quantity(idx, quantity, display)
    }

    /// Sets a line's quantity as shown in its display unit. Zero removes it.
    pub fn update_display_quantity(
        &mut self,
        line_id: &str,
        display_quantity: Decimal,
        conversions: &[UnitConversion],
    ) -> CoreResult<()> {
        if display_quantity.is_zero() {
            return self.remove_line(line_id).map(|_| ());
        }
        validate_quantity(display_quantity).map_err(CoreError::InvalidQuantity)?;
        let idx = self.index_of(line_id)?;
        let display_quantity = round_quantity(display_quantity);

        let line = &self.lines[idx];
        let (quantity, display) = match &line.kind {
            LineKind::UnitConverted { selected_unit, .. } => {
                let quantity = round_quantity(to_base(
                    selected_unit,
                    display_quantity,
                    &line.base_unit,
                    conversions,
                ));
                (quantity, Some(display_quantity))
            }
            _ => (display_quantity, None),
        };
        self.set_line_quantity(idx, quantity, display)
    }

    fn set_line_quantity(
        &mut self,
        idx: usize,
        quantity: Decimal,
        display: Option<Decimal>,
    ) -> CoreResult<()> {
        validate_quantity(quantity).map_err(CoreError::InvalidQuantity)?;
        let line = &self.lines[idx];
        // Lowering a quantity is always allowed, even past a stale limit
        if quantity > line.quantity {
            self.check_stock(
                line.product_id,
                &line.name,
                line.stock_limit,
                Some(line.id.as_str()),
                quantity,
            )?;
        }

        let line = &mut self.lines[idx];
        line.quantity = quantity;
        if let (
            LineKind::UnitConverted {
                display_quantity, ..
            },
            Some(display),
        ) = (&mut line.kind, display)
        {
            *display_quantity = display;
        }
        line.reprice();
        self.touch();
        Ok(())
    }

    /// Switches the unit a line is shown in. The base quantity is kept.
    pub fn change_unit(
        &mut self,
        line_id: &str,
        unit: &str,
        conversions: &[UnitConversion],
    ) -> CoreResult<()> {
        let unit = validate_unit(unit)?;
        let idx = self.index_of(line_id)?;
        let line = &self.lines[idx];

        let kind = if unit == line.base_unit {
            LineKind::Simple
        } else if is_available(&unit, &line.base_unit, conversions) {
            let display_quantity = from_base(&unit, line.quantity, &line.base_unit, conversions);
            LineKind::UnitConverted {
                selected_unit: unit,
                display_quantity,
            }
        } else {
            return Err(CoreError::UnitNotAvailable {
                unit,
                base_unit: line.base_unit.clone(),
            });
        };

        self.lines[idx].kind = kind;
        self.touch();
        Ok(())
    }

    /// Replaces a line's price with a VAT-inclusive price per base unit.
    pub fn override_unit_price(&mut self, line_id: &str, unit_price: Decimal) -> CoreResult<()> {
        validate_unit_price(unit_price).map_err(CoreError::InvalidPrice)?;
        let idx = self.index_of(line_id)?;

        let line = &mut self.lines[idx];
        let priced = price_from_inclusive(unit_price, line.vat_percentage, line.quantity);
        line.apply_price(priced);
        line.price_overridden = true;
        self.touch();
        Ok(())
    }

    pub fn remove_line(&mut self, line_id: &str) -> CoreResult<CartLine> {
        let idx = self.index_of(line_id)?;
        let line = self.lines.remove(idx);
        self.touch();
        Ok(line)
    }

    /// Updates the stock snapshot on every line of a product.
    ///
    /// Returns the number of lines touched. Does not count as a cart edit.
    pub fn merge_stock(&mut self, product_id: i64, stock_limit: Option<Decimal>) -> usize {
        let mut touched = 0;
        for line in self.lines.iter_mut().filter(|l| l.product_id == product_id) {
            line.stock_limit = stock_limit;
            touched += 1;
        }
        touched
    }

    // -------------------------------------------------------------------------
    // Sale-level Settings
    // -------------------------------------------------------------------------

    /// Replaces the discount.
    pub fn set_discount(&mut self, kind: DiscountKind, value: Decimal) -> CoreResult<()> {
        self.discount = Discount::new(kind, value, self.policy.percent_cap)?;
        self.touch();
        Ok(())
    }

    pub fn clear_discount(&mut self) {
        self.discount = Discount::none();
        self.touch();
    }

    pub fn set_sale_vat(&mut self, rate: TaxRate) -> CoreResult<()> {
        validate_tax_rate(rate)?;
        self.sale_vat = rate;
        self.touch();
        Ok(())
    }

    pub fn set_no_vat(&mut self, no_vat: bool) {
        self.no_vat = no_vat;
        self.touch();
    }

    pub fn set_customer(&mut self, customer_id: Option<i64>) {
        self.customer_id = customer_id;
        self.touch();
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self.touch();
    }

    pub fn set_policy(&mut self, policy: CartPolicy) {
        self.policy = policy;
    }

    /// Empties the cart. Sale VAT settings and policy survive.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount = Discount::none();
        self.customer_id = None;
        self.notes = None;
        self.touch();
    }

    /// Takes over the contents of `other`, keeping this cart's policy.
    pub fn adopt(&mut self, other: Cart) {
        self.lines = other.lines;
        self.discount = other.discount;
        self.sale_vat = other.sale_vat;
        self.no_vat = other.no_vat;
        self.customer_id = other.customer_id;
        self.notes = other.notes;
        self.touch();
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn find(&self, line_id: &str) -> CoreResult<&CartLine> {
        self.line(line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))
    }

    fn index_of(&self, line_id: &str) -> CoreResult<usize> {
        self.lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))
    }

    fn check_stock(
        &self,
        product_id: i64,
        name: &str,
        limit: Option<Decimal>,
        exclude_line: Option<&str>,
        requested: Decimal,
    ) -> CoreResult<()> {
        if !self.policy.enforce_stock {
            return Ok(());
        }
        let in_cart: Decimal = self
            .lines
            .iter()
            .filter(|l| l.product_id == product_id && Some(l.id.as_str()) != exclude_line)
            .map(|l| l.quantity)
            .sum();
        stock::check_increment(product_id, name, limit, in_cart, requested)
    }
}

fn weight_unit_of(product: &Product) -> String {
    product
        .weight_unit
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(product.base_unit.as_str())
        .to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversionOperator;
    use rust_decimal_macros::dec;

    fn product(id: i64, price: Decimal, vat_bps: u32) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            barcode: None,
            category_id: None,
            price,
            vat_percentage: TaxRate::from_bps(vat_bps),
            base_unit: "piece".to_string(),
            sale_unit: None,
            track_stock: false,
            stock_quantity: None,
            has_weight: false,
            weight_unit: None,
        }
    }

    fn tracked(mut p: Product, stock: Decimal) -> Product {
        p.track_stock = true;
        p.stock_quantity = Some(stock);
        p
    }

    fn conversions() -> Vec<UnitConversion> {
        vec![
            UnitConversion {
                name: "box".to_string(),
                base_unit: "piece".to_string(),
                operator: ConversionOperator::Multiply,
                operation_value: dec!(12),
            },
            UnitConversion {
                name: "g".to_string(),
                base_unit: "kg".to_string(),
                operator: ConversionOperator::Divide,
                operation_value: dec!(1000),
            },
        ]
    }

    #[test]
    fn test_add_product_prices_line() {
        let mut cart = Cart::new();
        let id = cart.add_product(&product(1, dec!(10), 500), dec!(1)).unwrap();

        let line = cart.line(&id).unwrap();
        assert_eq!(line.unit_price, dec!(10.5));
        assert_eq!(line.total_price.cents(), 1050);
        assert_eq!(line.vat_amount.cents(), 50);
        assert_eq!(line.kind, LineKind::Simple);
        assert_eq!(cart.revision(), 1);
    }

    #[test]
    fn test_two_boxes_become_twenty_four_pieces() {
        let mut cart = Cart::new();
        let id = cart
            .add_product_in_unit(&product(1, dec!(1), 0), "box", dec!(2), &conversions())
            .unwrap();

        let line = cart.line(&id).unwrap();
        assert_eq!(line.quantity, dec!(24));
        assert_eq!(line.display_quantity(), dec!(2));
        assert_eq!(line.display_unit(), "box");
        assert_eq!(line.total_price.cents(), 2400);
    }

    #[test]
    fn test_same_product_same_unit_merges() {
        let mut cart = Cart::new();
        let p = product(1, dec!(1), 0);
        let a = cart.add_product_in_unit(&p, "box", dec!(1), &conversions()).unwrap();
        let b = cart.add_product_in_unit(&p, "box", dec!(2), &conversions()).unwrap();
        let c = cart.add_product(&p, dec!(3)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.line(&a).unwrap().quantity, dec!(36));
        assert_eq!(cart.line(&a).unwrap().display_quantity(), dec!(3));
        assert_eq!(cart.quantity_of(1), dec!(39));
    }

    #[test]
    fn test_unknown_unit_rejected_without_change() {
        let mut cart = Cart::new();
        let before = cart.clone();
        let err = cart
            .add_product_in_unit(&product(1, dec!(1), 0), "crate", dec!(1), &conversions())
            .unwrap_err();
        assert!(matches!(err, CoreError::UnitNotAvailable { .. }));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_stock_counts_all_lines_of_product() {
        let mut cart = Cart::new();
        let p = tracked(product(1, dec!(1), 0), dec!(30));
        cart.add_product_in_unit(&p, "box", dec!(2), &conversions()).unwrap();
        let before = cart.clone();

        // 24 + 7 > 30
        let err = cart.add_product(&p, dec!(7)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available, requested, .. }
                if available == dec!(30) && requested == dec!(31)
        ));
        assert_eq!(cart, before);

        cart.add_product(&p, dec!(6)).unwrap();
        assert_eq!(cart.quantity_of(1), dec!(30));
    }

    #[test]
    fn test_stock_not_enforced_when_disabled() {
        let mut cart = Cart::with_policy(CartPolicy {
            enforce_stock: false,
            ..CartPolicy::default()
        });
        let p = tracked(product(1, dec!(1), 0), dec!(1));
        let id = cart.add_product(&p, dec!(5)).unwrap();
        assert_eq!(
            cart.stock_status(&id).unwrap(),
            StockStatus::CheckedInsufficient
        );
    }

    #[test]
    fn test_update_quantity_reprices_and_rederives_display() {
        let mut cart = Cart::new();
        let conv = conversions();
        let id = cart
            .add_product_in_unit(&product(1, dec!(1), 500), "box", dec!(1), &conv)
            .unwrap();

        cart.update_quantity(&id, dec!(6), &conv).unwrap();
        let line = cart.line(&id).unwrap();
        assert_eq!(line.display_quantity(), dec!(0.5));
        assert_eq!(line.total_price.cents(), 630);

        cart.update_display_quantity(&id, dec!(3), &conv).unwrap();
        let line = cart.line(&id).unwrap();
        assert_eq!(line.quantity, dec!(36));
        assert_eq!(line.total_price.cents(), 3780);
    }

    #[test]
    fn test_update_quantity_zero_removes_and_negative_rejected() {
        let mut cart = Cart::new();
        let id = cart.add_product(&product(1, dec!(2), 0), dec!(2)).unwrap();

        let err = cart.update_quantity(&id, dec!(-1), &[]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuantity(_)));

        cart.update_quantity(&id, Decimal::ZERO, &[]).unwrap();
        assert!(cart.is_empty());
        assert!(matches!(
            cart.update_quantity(&id, dec!(1), &[]),
            Err(CoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_update_display_quantity_zero_removes() {
        let mut cart = Cart::new();
        let conv = conversions();
        let keep = cart.add_product(&product(2, dec!(1), 0), dec!(1)).unwrap();
        let id = cart
            .add_product_in_unit(&product(1, dec!(1), 0), "box", dec!(2), &conv)
            .unwrap();

        cart.update_display_quantity(&id, Decimal::ZERO, &conv).unwrap();
        assert_eq!(cart.len(), 1);
        assert!(cart.line(&keep).is_some());
    }

    #[test]
    fn test_single_piece_in_box_converts_back_exactly() {
        let mut cart = Cart::new();
        let conv = conversions();
        let id = cart
            .add_product_in_unit(&product(1, dec!(1), 0), "box", dec!(1), &conv)
            .unwrap();

        cart.update_quantity(&id, dec!(1), &conv).unwrap();
        let line = cart.line(&id).unwrap();
        assert_eq!(line.quantity, dec!(1));
        assert_eq!(line.display_quantity(), dec!(0.0833));

        let LineKind::UnitConverted {
            selected_unit,
            display_quantity,
        } = &line.kind
        else {
            panic!("expected a unit-converted line");
        };
        let back = round_quantity(to_base(selected_unit, *display_quantity, "piece", &conv));
        assert_eq!(back, line.quantity);

        cart.change_unit(&id, "piece", &conv).unwrap();
        cart.change_unit(&id, "box", &conv).unwrap();
        assert_eq!(cart.line(&id).unwrap().quantity, dec!(1));
        assert_eq!(cart.line(&id).unwrap().display_quantity(), dec!(0.0833));
    }

    #[test]
    fn test_lowering_quantity_allowed_past_stale_limit() {
        let mut cart = Cart::new();
        let p = tracked(product(1, dec!(1), 0), dec!(10));
        let id = cart.add_product(&p, dec!(8)).unwrap();
        cart.merge_stock(1, Some(dec!(2)));

        assert!(cart.update_quantity(&id, dec!(9), &[]).is_err());
        cart.update_quantity(&id, dec!(5), &[]).unwrap();
        assert_eq!(cart.line(&id).unwrap().quantity, dec!(5));
    }

    #[test]
    fn test_change_unit_keeps_base_quantity() {
        let mut cart = Cart::new();
        let conv = conversions();
        let id = cart.add_product(&product(1, dec!(1), 0), dec!(24)).unwrap();

        cart.change_unit(&id, "box", &conv).unwrap();
        let line = cart.line(&id).unwrap();
        assert_eq!(line.quantity, dec!(24));
        assert_eq!(line.display_quantity(), dec!(2));

        cart.change_unit(&id, "piece", &conv).unwrap();
        assert_eq!(cart.line(&id).unwrap().kind, LineKind::Simple);

        assert!(cart.change_unit(&id, "g", &conv).is_err());
    }

    #[test]
    fn test_override_unit_price() {
        let mut cart = Cart::new();
        let id = cart.add_product(&product(1, dec!(10), 500), dec!(2)).unwrap();

        cart.override_unit_price(&id, dec!(12)).unwrap();
        let line = cart.line(&id).unwrap();
        assert_eq!(line.unit_price, dec!(12));
        assert_eq!(line.total_price.cents(), 2400);
        assert_eq!(line.vat_amount.cents(), 114);
        assert!(line.price_overridden);

        assert!(matches!(
            cart.override_unit_price(&id, dec!(-1)),
            Err(CoreError::InvalidPrice(_))
        ));

        // an overridden line is not merged into
        let other = cart.add_product(&product(1, dec!(10), 500), dec!(1)).unwrap();
        assert_ne!(id, other);
    }

    #[test]
    fn test_weighed_product() {
        let mut cart = Cart::new();
        let mut p = product(4, dec!(8), 0);
        p.base_unit = "kg".to_string();
        p.has_weight = true;
        p.weight_unit = Some("g".to_string());

        let id = cart.add_weighed_product(&p, dec!(735), &conversions()).unwrap();
        let line = cart.line(&id).unwrap();
        assert_eq!(line.quantity, dec!(0.735));
        assert_eq!(line.total_price.cents(), 588);
        assert_eq!(
            line.kind,
            LineKind::WeightBased {
                weight_unit: "g".to_string()
            }
        );
    }

    #[test]
    fn test_discount_replaces_previous() {
        let mut cart = Cart::new();
        cart.add_product(&product(1, dec!(100), 0), dec!(1)).unwrap();

        cart.set_discount(DiscountKind::Fixed, dec!(5)).unwrap();
        cart.set_discount(DiscountKind::Percentage, dec!(10)).unwrap();
        assert_eq!(cart.totals().discount.cents(), 1000);

        let before = cart.clone();
        assert!(cart.set_discount(DiscountKind::Percentage, dec!(150)).is_err());
        assert_eq!(cart, before);
    }

    #[test]
    fn test_oversized_fixed_discount_rejected() {
        let mut cart = Cart::new();
        cart.add_product(&product(1, dec!(100), 0), dec!(1)).unwrap();
        let before = cart.clone();

        let huge = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        let err = cart.set_discount(DiscountKind::Fixed, huge).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscount(_)));
        assert_eq!(cart, before);

        // the largest accepted amount still caps at the subtotal
        cart.set_discount(DiscountKind::Fixed, dec!(999999999)).unwrap();
        let totals = cart.totals();
        assert_eq!(totals.discount.cents(), 10000);
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn test_max_lines() {
        let mut cart = Cart::with_policy(CartPolicy {
            max_lines: 2,
            ..CartPolicy::default()
        });
        cart.add_product(&product(1, dec!(1), 0), dec!(1)).unwrap();
        cart.add_product(&product(2, dec!(1), 0), dec!(1)).unwrap();
        assert!(matches!(
            cart.add_product(&product(3, dec!(1), 0), dec!(1)),
            Err(CoreError::CartTooLarge { max: 2 })
        ));
        // merging into an existing line still works
        cart.add_product(&product(1, dec!(1), 0), dec!(1)).unwrap();
    }

    #[test]
    fn test_checkout_validation_and_demand() {
        let mut cart = Cart::new();
        assert!(matches!(cart.validate_for_checkout(), Err(CoreError::EmptyCart)));

        let p = tracked(product(1, dec!(1), 0), dec!(30));
        cart.add_product_in_unit(&p, "box", dec!(2), &conversions()).unwrap();
        cart.add_product(&p, dec!(3)).unwrap();
        cart.add_product(&product(2, dec!(1), 0), dec!(1)).unwrap();

        let demand = cart.stock_demand();
        assert_eq!(demand.len(), 2);
        assert_eq!(demand[0].quantity, dec!(27));
        assert!(cart.validate_for_checkout().is_ok());

        assert_eq!(cart.merge_stock(1, Some(dec!(20))), 2);
        assert!(matches!(
            cart.validate_for_checkout(),
            Err(CoreError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn test_clear_keeps_sale_settings() {
        let mut cart = Cart::new();
        cart.set_sale_vat(TaxRate::from_bps(500)).unwrap();
        cart.add_product(&product(1, dec!(1), 0), dec!(1)).unwrap();
        cart.set_customer(Some(7));
        cart.set_notes(Some("  table 4 ".to_string()));
        assert_eq!(cart.notes(), Some("table 4"));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.customer_id(), None);
        assert_eq!(cart.sale_vat(), TaxRate::from_bps(500));
        assert!(cart.set_sale_vat(TaxRate::from_bps(10_001)).is_err());
    }
}

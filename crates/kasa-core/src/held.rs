//! # Held Sales
//!
//! Suspends a cart into a storable snapshot and rebuilds a cart from one.
//!
//! ## Snapshot Versions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  v1 (legacy, no "version" key)        v2 (current)                      │
//! │  ─────────────────────────────        ────────────                      │
//! │  unit_price = inclusive price         unit_price + base_unit_price      │
//! │  no base_unit_price                   quantity always present           │
//! │  quantity sometimes missing           discount_value present            │
//! │  cart_data sometimes a JSON string                                      │
//! │                                                                         │
//! │        │ migrate()                                                      │
//! │        ▼                                                                │
//! │  every line complete ──► into_cart() ──► priced CartLines               │
//! │  + Vec<Migration> describing each fix-up                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Migration is the only place that guesses. Pricing after it runs the
//! normal line pricer on complete inputs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::cart::{Cart, CartLine, LineKind};
use crate::discount::{Discount, DiscountKind, DEFAULT_PERCENT_CAP};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{base_from_inclusive, inclusive_unit_price, price_line};
use crate::serde_decimal;
use crate::types::{TaxRate, UnitConversion};
use crate::units::{from_base, round_quantity, to_base};
use crate::validation::{validate_discount_value, validate_quantity, validate_unit_price};

/// Snapshot format written by [`HeldSaleSnapshot::capture`].
pub const SNAPSHOT_VERSION: u32 = 2;

// =============================================================================
// Wire Types
// =============================================================================

/// A cart line as stored in `cart_data`. Every field is optional on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeldLine {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default, alias = "product_name")]
    pub name: String,
    #[serde(default)]
    pub base_unit: Option<String>,

    #[serde(with = "serde_decimal::option", default)]
    pub quantity: Option<Decimal>,
    #[serde(with = "serde_decimal::option", default)]
    pub unit_price: Option<Decimal>,
    #[serde(with = "serde_decimal::option", default)]
    pub base_unit_price: Option<Decimal>,
    #[serde(default)]
    pub vat_percentage: TaxRate,
    #[serde(default)]
    pub vat_amount: Option<Money>,
    #[serde(with = "serde_decimal::option", default)]
    pub total_price: Option<Decimal>,

    #[serde(default)]
    pub selected_unit: Option<String>,
    #[serde(with = "serde_decimal::option", default)]
    pub display_quantity: Option<Decimal>,
    #[serde(default)]
    pub has_weight: bool,
    #[serde(default)]
    pub weight_unit: Option<String>,

    #[serde(default)]
    pub track_stock: bool,
    #[serde(with = "serde_decimal::option", default)]
    pub stock_quantity: Option<Decimal>,
    #[serde(default)]
    pub price_overridden: bool,
}

impl From<&CartLine> for HeldLine {
    fn from(line: &CartLine) -> Self {
        let mut held = HeldLine {
            product_id: Some(line.product_id),
            name: line.name.clone(),
            base_unit: Some(line.base_unit.clone()),
            quantity: Some(line.quantity),
            unit_price: Some(line.unit_price),
            base_unit_price: Some(line.base_unit_price),
            vat_percentage: line.vat_percentage,
            vat_amount: Some(line.vat_amount),
            total_price: Some(line.total_price.to_decimal()),
            track_stock: line.stock_limit.is_some(),
            stock_quantity: line.stock_limit,
            price_overridden: line.price_overridden,
            ..HeldLine::default()
        };
        match &line.kind {
            LineKind::Simple => {}
            LineKind::WeightBased { weight_unit } => {
                held.has_weight = true;
                held.weight_unit = Some(weight_unit.clone());
            }
            LineKind::UnitConverted {
                selected_unit,
                display_quantity,
            } => {
                held.selected_unit = Some(selected_unit.clone());
                held.display_quantity = Some(round_quantity(*display_quantity));
            }
        }
        held
    }
}

/// Body of `POST /held-sales`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldSaleSnapshot {
    /// Absent on legacy snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_cart_data")]
    pub cart_data: Vec<HeldLine>,
    #[serde(default)]
    pub subtotal: Money,
    #[serde(default)]
    pub discount_amount: Money,
    #[serde(default)]
    pub discount_type: DiscountKind,
    #[serde(
        with = "serde_decimal::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_value: Option<Decimal>,
    #[serde(default)]
    pub vat_percentage: TaxRate,
    #[serde(default)]
    pub no_vat: bool,
    #[serde(default)]
    pub vat_amount: Money,
    #[serde(default)]
    pub total: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Legacy writers stored `cart_data` as a JSON-encoded string.
fn deserialize_cart_data<'de, D>(deserializer: D) -> Result<Vec<HeldLine>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Value::String(raw) => serde_json::from_str(&raw).map_err(D::Error::custom),
        value @ Value::Array(_) => serde_json::from_value(value).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!(
            "cart_data must be an array, got {other}"
        ))),
    }
}

/// A held sale as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldSale {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: HeldSaleSnapshot,
}

/// One row of the resume picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HeldSaleSummary {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub total: Money,
    pub line_count: usize,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl HeldSale {
    pub fn summary(&self) -> HeldSaleSummary {
        HeldSaleSummary {
            id: self.id,
            customer_id: self.snapshot.customer_id,
            total: self.snapshot.total,
            line_count: self.snapshot.cart_data.len(),
            notes: self.snapshot.notes.clone(),
            created_at: self.created_at,
        }
    }
}

// =============================================================================
// Migration Report
// =============================================================================

/// One fix-up applied while reading an older or incomplete snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum Migration {
    /// `base_unit_price` derived from the inclusive `unit_price`.
    DerivedBasePrice { line: usize },
    /// `unit_price` derived from `total_price / quantity`.
    DerivedUnitPriceFromTotal { line: usize },
    /// Base quantity derived from the display quantity.
    DerivedQuantityFromDisplay { line: usize },
    /// Quantity missing or not positive; set to 1.
    DefaultedQuantity { line: usize },
    /// A negative or out-of-range stored price was ignored.
    DiscardedInvalidPrice { line: usize },
    /// No way to price the line; dropped.
    DroppedUnpriceable { line: usize },
    /// No product reference; dropped.
    DroppedMissingProduct { line: usize },
    /// Stored discount value was out of range; re-derived from the amount.
    DiscardedInvalidDiscount,
    /// Discount value derived from the stored discount amount.
    DerivedDiscountValue,
    /// Recomputed total differs from the stored one.
    TotalChanged { stored: Money, recomputed: Money },
}

/// Result of resuming a held sale.
#[derive(Debug, Clone)]
pub struct ResumedCart {
    pub cart: Cart,
    pub migrations: Vec<Migration>,
    /// The snapshot had no version marker.
    pub legacy: bool,
}

// =============================================================================
// Hold
// =============================================================================

impl HeldSaleSnapshot {
    /// Captures the cart into a current-version snapshot.
    pub fn capture(cart: &Cart) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        let totals = cart.totals();
        let discount = cart.discount();

        Ok(HeldSaleSnapshot {
            version: Some(SNAPSHOT_VERSION),
            customer_id: cart.customer_id(),
            cart_data: cart.lines().iter().map(HeldLine::from).collect(),
            subtotal: totals.subtotal,
            discount_amount: totals.discount,
            discount_type: discount.kind,
            discount_value: Some(discount.value),
            vat_percentage: cart.sale_vat(),
            no_vat: cart.no_vat(),
            vat_amount: totals.vat,
            total: totals.total,
            notes: cart.notes().map(str::to_string),
        })
    }

    /// Parses a stored snapshot. Unreadable JSON is [`CoreError::HeldSaleCorrupt`].
    pub fn from_json(raw: &str) -> CoreResult<Self> {
        serde_json::from_str(raw).map_err(|e| CoreError::HeldSaleCorrupt {
            reason: e.to_string(),
        })
    }

    pub fn is_legacy(&self) -> bool {
        self.version.unwrap_or(1) < SNAPSHOT_VERSION
    }

    // =========================================================================
    // Resume
    // =========================================================================

    /// Rebuilds a cart, migrating older snapshots first.
    ///
    /// ## Errors
    /// `HeldSaleCorrupt` when no line survives migration.
    pub fn resume(&self, conversions: &[UnitConversion]) -> CoreResult<ResumedCart> {
        let legacy = self.is_legacy();
        let (migrated, mut migrations) = self.migrate(conversions);
        let cart = migrated.into_cart()?;

        let recomputed = cart.totals().total;
        if recomputed != self.total && !self.total.is_zero() {
            migrations.push(Migration::TotalChanged {
                stored: self.total,
                recomputed,
            });
        }

        Ok(ResumedCart {
            cart,
            migrations,
            legacy,
        })
    }

    /// Upgrades the snapshot so that every kept line is complete.
    fn migrate(&self, conversions: &[UnitConversion]) -> (HeldSaleSnapshot, Vec<Migration>) {
        let mut migrations = Vec::new();
        let mut lines = Vec::with_capacity(self.cart_data.len());

        for (idx, held) in self.cart_data.iter().enumerate() {
            if let Some(line) = migrate_line(idx, held, conversions, &mut migrations) {
                lines.push(line);
            }
        }

        let is_percentage = self.discount_type == DiscountKind::Percentage;
        let stored = self.discount_value.filter(|value| {
            let valid = validate_discount_value(*value, is_percentage, DEFAULT_PERCENT_CAP).is_ok();
            if !valid {
                migrations.push(Migration::DiscardedInvalidDiscount);
            }
            valid
        });
        let discount_value = match stored {
            Some(value) => value,
            None => {
                let value = legacy_discount_value(self, &lines);
                if !value.is_zero() {
                    migrations.push(Migration::DerivedDiscountValue);
                }
                value
            }
        };

        let snapshot = HeldSaleSnapshot {
            version: Some(SNAPSHOT_VERSION),
            cart_data: lines,
            discount_value: Some(discount_value),
            ..self.clone()
        };
        (snapshot, migrations)
    }

    /// Converts complete lines into priced cart lines.
    fn into_cart(self) -> CoreResult<Cart> {
        let mut lines = Vec::with_capacity(self.cart_data.len());
        for held in &self.cart_data {
            lines.push(complete_line(held)?);
        }
        if lines.is_empty() {
            return Err(CoreError::HeldSaleCorrupt {
                reason: "no resumable lines".to_string(),
            });
        }

        let discount = Discount {
            kind: self.discount_type,
            value: self.discount_value.unwrap_or_default(),
        };
        Ok(Cart::restore(
            lines,
            discount,
            self.vat_percentage,
            self.no_vat,
            self.customer_id,
            self.notes,
        ))
    }
}

/// Fills the gaps of one line, or drops it. Records every change.
fn migrate_line(
    idx: usize,
    held: &HeldLine,
    conversions: &[UnitConversion],
    migrations: &mut Vec<Migration>,
) -> Option<HeldLine> {
    if held.product_id.is_none() {
        migrations.push(Migration::DroppedMissingProduct { line: idx });
        return None;
    }

    let mut line = held.clone();
    let base_unit = line
        .base_unit
        .clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "unit".to_string());
    let selected_unit = line
        .selected_unit
        .clone()
        .filter(|u| !u.trim().is_empty() && *u != base_unit);
    let rate = line.vat_percentage;

    // Corrupt prices are treated as missing
    let mut discarded = false;
    let mut valid_price = |price: Option<Decimal>| {
        price.filter(|p| {
            let valid = validate_unit_price(*p).is_ok();
            discarded |= !valid;
            valid
        })
    };
    let stored_unit = valid_price(line.unit_price);
    let stored_base = valid_price(line.base_unit_price);
    let stored_total = valid_price(line.total_price);
    if discarded {
        migrations.push(Migration::DiscardedInvalidPrice { line: idx });
    }

    // Quantity
    let quantity = match (line.quantity, &selected_unit, line.display_quantity) {
        (Some(q), _, _) if validate_quantity(q).is_ok() => q,
        (_, Some(unit), Some(display)) if validate_quantity(display).is_ok() => {
            migrations.push(Migration::DerivedQuantityFromDisplay { line: idx });
            round_quantity(to_base(unit, display, &base_unit, conversions))
        }
        _ => {
            migrations.push(Migration::DefaultedQuantity { line: idx });
            Decimal::ONE
        }
    };

    // Inclusive unit price
    let unit_price = match (stored_unit, stored_base, stored_total) {
        (Some(unit), _, _) => unit,
        (None, Some(base), _) => inclusive_unit_price(base, rate),
        (None, None, Some(total)) => {
            migrations.push(Migration::DerivedUnitPriceFromTotal { line: idx });
            total / quantity
        }
        (None, None, None) => {
            migrations.push(Migration::DroppedUnpriceable { line: idx });
            return None;
        }
    };

    // Ex-VAT unit price. Overridden prices are re-derived from the entered
    // inclusive price so a round trip stays exact.
    let base_unit_price = match stored_base {
        Some(base) if !line.price_overridden => base,
        _ if rate.is_zero() => unit_price,
        Some(_) => base_from_inclusive(unit_price, rate),
        None => {
            migrations.push(Migration::DerivedBasePrice { line: idx });
            base_from_inclusive(unit_price, rate)
        }
    };

    let display_quantity = selected_unit.as_ref().map(|unit| {
        line.display_quantity
            .filter(|d| validate_quantity(*d).is_ok())
            .unwrap_or_else(|| round_quantity(from_base(unit, quantity, &base_unit, conversions)))
    });

    line.base_unit = Some(base_unit);
    line.selected_unit = selected_unit;
    line.display_quantity = display_quantity;
    line.quantity = Some(quantity);
    line.unit_price = Some(unit_price);
    line.base_unit_price = Some(base_unit_price);
    Some(line)
}

/// Legacy snapshots only kept the discount amount.
fn legacy_discount_value(snapshot: &HeldSaleSnapshot, lines: &[HeldLine]) -> Decimal {
    let amount = snapshot.discount_amount.to_decimal();
    match snapshot.discount_type {
        DiscountKind::Fixed => amount,
        DiscountKind::Percentage => {
            let base: Decimal = lines
                .iter()
                .map(|l| l.base_unit_price.unwrap_or_default() * l.quantity.unwrap_or_default())
                .sum();
            if base.is_zero() {
                Decimal::ZERO
            } else {
                (amount / base * Decimal::ONE_HUNDRED)
                    .round_dp(4)
                    .min(DEFAULT_PERCENT_CAP)
            }
        }
    }
}

/// Prices a line that [`migrate_line`] has completed.
fn complete_line(held: &HeldLine) -> CoreResult<CartLine> {
    let (Some(product_id), Some(quantity), Some(unit_price), Some(base_unit_price)) = (
        held.product_id,
        held.quantity,
        held.unit_price,
        held.base_unit_price,
    ) else {
        return Err(CoreError::HeldSaleCorrupt {
            reason: format!("line '{}' is incomplete after migration", held.name),
        });
    };
    let base_unit = held.base_unit.clone().unwrap_or_else(|| "unit".to_string());

    let kind = match (&held.selected_unit, held.display_quantity) {
        (Some(unit), Some(display)) => LineKind::UnitConverted {
            selected_unit: unit.clone(),
            display_quantity: display,
        },
        _ if held.has_weight => LineKind::WeightBased {
            weight_unit: held
                .weight_unit
                .clone()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| base_unit.clone()),
        },
        _ => LineKind::Simple,
    };

    let priced = price_line(base_unit_price, unit_price, held.vat_percentage, quantity);
    Ok(CartLine {
        id: uuid::Uuid::new_v4().to_string(),
        product_id,
        name: held.name.clone(),
        base_unit,
        quantity,
        kind,
        base_unit_price: priced.base_unit_price,
        unit_price: priced.unit_price,
        vat_percentage: priced.vat_percentage,
        vat_amount: priced.vat_amount,
        total_price: priced.total_price,
        stock_limit: if held.track_stock {
            held.stock_quantity
        } else {
            None
        },
        price_overridden: held.price_overridden,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConversionOperator, Product};
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
            track_stock: true,
            stock_quantity: Some(dec!(500)),
            has_weight: false,
            weight_unit: None,
        }
    }

    fn conversions() -> Vec<UnitConversion> {
        vec![UnitConversion {
            name: "box".to_string(),
            base_unit: "piece".to_string(),
            operator: ConversionOperator::Multiply,
            operation_value: dec!(12),
        }]
    }

    fn sample_cart() -> Cart {
        let conv = conversions();
        let mut cart = Cart::new();
        cart.add_product(&product(1, dec!(10), 500), dec!(3)).unwrap();
        cart.add_product_in_unit(&product(2, dec!(1.25), 1600), "box", dec!(2), &conv)
            .unwrap();
        let id = cart.add_product(&product(3, dec!(4), 750), dec!(1)).unwrap();
        cart.override_unit_price(&id, dec!(5)).unwrap();
        cart.set_discount(DiscountKind::Percentage, dec!(10)).unwrap();
        cart.set_sale_vat(TaxRate::from_bps(500)).unwrap();
        cart.set_customer(Some(42));
        cart.set_notes(Some("table 4".to_string()));
        cart
    }

    /// Serializes like a legacy client: no version, no base price, no discount value.
    fn to_legacy_json(snapshot: &HeldSaleSnapshot) -> String {
        let mut value = serde_json::to_value(snapshot).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("version");
        obj.remove("discount_value");
        for line in obj["cart_data"].as_array_mut().unwrap() {
            line.as_object_mut().unwrap().remove("base_unit_price");
        }
        value.to_string()
    }

    fn assert_same_lines(before: &Cart, after: &Cart) {
        assert_eq!(before.len(), after.len());
        for (a, b) in before.lines().iter().zip(after.lines()) {
            assert_eq!(a.product_id, b.product_id);
            assert_eq!(a.quantity, b.quantity);
            assert_eq!(a.unit_price, b.unit_price);
            assert_eq!(a.vat_amount, b.vat_amount);
            assert_eq!(a.total_price, b.total_price);
            assert_eq!(a.kind, b.kind);
        }
        assert_eq!(before.totals(), after.totals());
    }

    #[test]
    fn test_capture_records_totals() {
        let cart = sample_cart();
        let snapshot = HeldSaleSnapshot::capture(&cart).unwrap();
        assert_eq!(snapshot.version, Some(SNAPSHOT_VERSION));
        assert_eq!(snapshot.cart_data.len(), 3);
        assert_eq!(snapshot.total, cart.totals().total);
        assert_eq!(snapshot.customer_id, Some(42));

        assert!(matches!(
            HeldSaleSnapshot::capture(&Cart::new()),
            Err(CoreError::EmptyCart)
        ));
    }

    #[test]
    fn test_current_snapshot_round_trip() {
        let cart = sample_cart();
        let json = serde_json::to_string(&HeldSaleSnapshot::capture(&cart).unwrap()).unwrap();

        let resumed = HeldSaleSnapshot::from_json(&json)
            .unwrap()
            .resume(&conversions())
            .unwrap();
        assert!(!resumed.legacy);
        assert!(resumed.migrations.is_empty(), "{:?}", resumed.migrations);
        assert_same_lines(&cart, &resumed.cart);
        assert_eq!(resumed.cart.notes(), Some("table 4"));
        assert_eq!(resumed.cart.discount(), cart.discount());
    }

    #[test]
    fn test_legacy_snapshot_round_trip() {
        let cart = sample_cart();
        let legacy = to_legacy_json(&HeldSaleSnapshot::capture(&cart).unwrap());

        let resumed = HeldSaleSnapshot::from_json(&legacy)
            .unwrap()
            .resume(&conversions())
            .unwrap();
        assert!(resumed.legacy);
        assert_same_lines(&cart, &resumed.cart);

        let derived: Vec<_> = resumed
            .migrations
            .iter()
            .filter(|m| matches!(m, Migration::DerivedBasePrice { .. }))
            .collect();
        assert_eq!(derived.len(), 3);
        assert!(resumed.migrations.contains(&Migration::DerivedDiscountValue));
    }

    #[test]
    fn test_legacy_string_cart_data_and_gaps() {
        let raw = r#"{
            "customer_id": null,
            "cart_data": "[{\"product_id\": 5, \"name\": \"Tea\", \"unit_price\": \"2.10\", \"vat_percentage\": 5},{\"name\": \"ghost\", \"unit_price\": 1},{\"product_id\": 6, \"name\": \"Cake\", \"quantity\": 2, \"total_price\": 7},{\"product_id\": 7, \"name\": \"Nothing\", \"quantity\": 1}]",
            "subtotal": 5.5,
            "discount_amount": 0,
            "discount_type": "fixed",
            "vat_percentage": 0,
            "vat_amount": 0,
            "total": 0,
            "notes": null
        }"#;

        let resumed = HeldSaleSnapshot::from_json(raw)
            .unwrap()
            .resume(&[])
            .unwrap();
        let cart = &resumed.cart;
        assert_eq!(cart.len(), 2);

        let tea = &cart.lines()[0];
        assert_eq!(tea.quantity, dec!(1));
        assert_eq!(tea.unit_price, dec!(2.10));
        assert_eq!(tea.base_unit_price, dec!(2));
        assert_eq!(tea.vat_amount.cents(), 10);

        let cake = &cart.lines()[1];
        assert_eq!(cake.unit_price, dec!(3.5));
        assert_eq!(cake.total_price.cents(), 700);

        assert_eq!(
            resumed.migrations,
            vec![
                Migration::DefaultedQuantity { line: 0 },
                Migration::DerivedBasePrice { line: 0 },
                Migration::DroppedMissingProduct { line: 1 },
                Migration::DerivedUnitPriceFromTotal { line: 2 },
                Migration::DroppedUnpriceable { line: 3 },
            ]
        );
    }

    #[test]
    fn test_negative_prices_are_not_resumed() {
        let raw = r#"{
            "version": 2,
            "cart_data": [
                {"product_id": 1, "name": "Broken", "quantity": 2, "unit_price": -5, "base_unit_price": -5},
                {"product_id": 2, "name": "Bread", "quantity": 1, "unit_price": -3, "total_price": 4},
                {"product_id": 3, "name": "Milk", "quantity": 1, "unit_price": 2, "base_unit_price": 2}
            ],
            "discount_type": "fixed",
            "discount_value": -10
        }"#;

        let resumed = HeldSaleSnapshot::from_json(raw)
            .unwrap()
            .resume(&[])
            .unwrap();
        assert_eq!(
            resumed.migrations,
            vec![
                Migration::DiscardedInvalidPrice { line: 0 },
                Migration::DroppedUnpriceable { line: 0 },
                Migration::DiscardedInvalidPrice { line: 1 },
                Migration::DerivedUnitPriceFromTotal { line: 1 },
                Migration::DiscardedInvalidDiscount,
            ]
        );

        let cart = &resumed.cart;
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.lines()[0].unit_price, dec!(4));
        assert!(cart.discount().is_none());
        assert_eq!(cart.totals().total.cents(), 600);
    }

    #[test]
    fn test_unreadable_snapshots() {
        assert!(matches!(
            HeldSaleSnapshot::from_json("{\"cart_data\": 7}"),
            Err(CoreError::HeldSaleCorrupt { .. })
        ));

        let empty = HeldSaleSnapshot::from_json("{\"cart_data\": []}").unwrap();
        assert!(matches!(
            empty.resume(&[]),
            Err(CoreError::HeldSaleCorrupt { .. })
        ));
    }

    #[test]
    fn test_held_sale_listing_row() {
        let raw = r#"{
            "id": 12,
            "created_at": "2026-03-01T10:15:00Z",
            "version": 2,
            "customer_id": 3,
            "cart_data": [{"product_id": 1, "name": "Tea", "quantity": 2, "unit_price": 2.1, "base_unit_price": 2, "vat_percentage": 5}],
            "total": 4.2,
            "notes": "window seat"
        }"#;
        let held: HeldSale = serde_json::from_str(raw).unwrap();
        let summary = held.summary();
        assert_eq!(summary.id, 12);
        assert_eq!(summary.line_count, 1);
        assert_eq!(summary.total.cents(), 420);
        assert_eq!(summary.notes.as_deref(), Some("window seat"));
    }
}

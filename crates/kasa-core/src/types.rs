//! # Catalog Types
//!
//! Types the billing core reads from the backend catalog. The core never
//! mutates them; they are cached by the session and copied into cart lines
//! as snapshots.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Catalog Types                                   │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────────────┐      │
//! │  │      Product         │        │      UnitConversion          │      │
//! │  │  ──────────────────  │        │  ──────────────────────────  │      │
//! │  │  price (ex-VAT)      │        │  name        "box"           │      │
//! │  │  vat_percentage      │◄──────►│  base_unit   "piece"         │      │
//! │  │  base_unit "piece"   │        │  operator    *               │      │
//! │  │  sale_unit "box"     │        │  value       12              │      │
//! │  │  stock_quantity      │        └──────────────────────────────┘      │
//! │  └──────────────────────┘                                              │
//! │                                                                         │
//! │  ┌──────────────────────┐                                              │
//! │  │      TaxRate         │  bps (u32): 500 = 5%                         │
//! │  └──────────────────────┘  wire: percentage number (5)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ts_rs::TS;

use crate::serde_decimal;
use crate::validation::parse_tax_percentage;

// =============================================================================
// Tax Rate
// =============================================================================

/// VAT rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%, so 500 bps = 5% and 750 bps = 7.5%.
/// Comparisons and zero checks stay exact; the percentage form is only
/// used on the wire and in the pricing formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct TaxRate(#[ts(type = "number")] u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage, rounded to whole basis points.
    ///
    /// Negative percentages are treated as zero. Untrusted input goes
    /// through [`parse_tax_percentage`] instead, which rejects both.
    pub fn from_percentage(pct: Decimal) -> Self {
        let bps = (pct * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
            .unwrap_or(0);
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (5 for 5%).
    #[inline]
    pub fn percentage(&self) -> Decimal {
        Decimal::new(self.0 as i64, 2)
    }

    /// Returns `1 + rate`, the factor between ex-VAT and VAT-inclusive prices.
    #[inline]
    pub fn multiplier(&self) -> Decimal {
        Decimal::ONE + Decimal::new(self.0 as i64, 4)
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Serialize for TaxRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_decimal::serialize(&self.percentage(), serializer)
    }
}

impl<'de> Deserialize<'de> for TaxRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pct = serde_decimal::deserialize(deserializer)?;
        parse_tax_percentage(pct).map_err(D::Error::custom)
    }
}

// =============================================================================
// Product
// =============================================================================

fn default_base_unit() -> String {
    "unit".to_string()
}

/// A catalog product as returned by `GET /products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    #[serde(default)]
    pub barcode: Option<String>,

    #[serde(default)]
    pub category_id: Option<i64>,

    /// VAT-exclusive price per base unit.
    #[serde(with = "serde_decimal")]
    #[ts(type = "number")]
    pub price: Decimal,

    #[serde(default)]
    pub vat_percentage: TaxRate,

    /// Canonical unit of stock and pricing (e.g. "kg", "piece").
    #[serde(default = "default_base_unit")]
    pub base_unit: String,

    /// Unit the product is sold in by default, if not the base unit.
    #[serde(default)]
    pub sale_unit: Option<String>,

    #[serde(default)]
    pub track_stock: bool,

    /// Stock in base units. `None` means untracked / unlimited.
    #[serde(with = "serde_decimal::option", default)]
    #[ts(type = "number | null")]
    pub stock_quantity: Option<Decimal>,

    /// Sold by weight (scale input).
    #[serde(default)]
    pub has_weight: bool,

    #[serde(default)]
    pub weight_unit: Option<String>,
}

impl Product {
    /// Returns the stock limit in base units, if this product is limited.
    ///
    /// Tracking disabled or a null stock quantity both mean "no limit".
    pub fn stock_limit(&self) -> Option<Decimal> {
        if self.track_stock {
            self.stock_quantity
        } else {
            None
        }
    }

    /// Returns the unit a fresh scan of this product should be sold in.
    pub fn default_unit(&self) -> &str {
        self.sale_unit
            .as_deref()
            .filter(|unit| !unit.trim().is_empty())
            .unwrap_or(self.base_unit.as_str())
    }
}

// =============================================================================
// Unit Conversion
// =============================================================================

/// How a named unit relates to its base unit.
///
/// `*`: one named unit is `value` base units (box → 12 pieces).
/// `/`: one named unit is `1 / value` base units (gram → kg / 1000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionOperator {
    Multiply,
    Divide,
}

impl ConversionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionOperator::Multiply => "*",
            ConversionOperator::Divide => "/",
        }
    }
}

impl Serialize for ConversionOperator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Anything other than `*` is a divide, matching the catalog's convention.
impl<'de> Deserialize<'de> for ConversionOperator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let op = String::deserialize(deserializer)?;
        Ok(if op.trim() == "*" {
            ConversionOperator::Multiply
        } else {
            ConversionOperator::Divide
        })
    }
}

/// A row of the `GET /unit-conversions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnitConversion {
    /// The named unit ("box", "g").
    pub name: String,

    /// The base unit it converts into.
    pub base_unit: String,

    #[ts(type = "\"*\" | \"/\"")]
    pub operator: ConversionOperator,

    #[serde(with = "serde_decimal")]
    #[ts(type = "number")]
    pub operation_value: Decimal,
}

// =============================================================================
// Unit Tests
// =============================================================================

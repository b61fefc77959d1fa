//! Sale submission body (`POST /sales`).
//!
//! Built from the cart and the tendered payments in one step, so the
//! totals sent are exactly the ones the payments were reconciled against.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{Cart, CartLine, LineKind};
use crate::discount::DiscountKind;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::payment::{reconcile, Tender};
use crate::serde_decimal;
use crate::types::TaxRate;
use crate::units::round_quantity;

/// A normalized line item as the backend stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineItem {
    pub product_id: i64,
    pub name: String,

    /// Base-unit quantity.
    #[serde(with = "serde_decimal")]
    #[ts(type = "number")]
    pub quantity: Decimal,

    #[serde(with = "serde_decimal")]
    #[ts(type = "number")]
    pub unit_price: Decimal,

    #[serde(with = "serde_decimal")]
    #[ts(type = "number")]
    pub base_unit_price: Decimal,

    pub vat_percentage: TaxRate,
    pub vat_amount: Money,
    pub total_price: Money,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub selected_unit: Option<String>,

    #[serde(
        with = "serde_decimal::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    #[ts(type = "number | null")]
    pub display_quantity: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight_unit: Option<String>,
}

impl From<&CartLine> for SaleLineItem {
    fn from(line: &CartLine) -> Self {
        let (selected_unit, display_quantity, weight_unit) = match &line.kind {
            LineKind::Simple => (None, None, None),
            LineKind::WeightBased { weight_unit } => (None, None, Some(weight_unit.clone())),
            LineKind::UnitConverted {
                selected_unit,
                display_quantity,
            } => (
                Some(selected_unit.clone()),
                Some(round_quantity(*display_quantity)),
                None,
            ),
        };

        SaleLineItem {
            product_id: line.product_id,
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            base_unit_price: line.base_unit_price,
            vat_percentage: line.vat_percentage,
            vat_amount: line.vat_amount,
            total_price: line.total_price,
            selected_unit,
            display_quantity,
            weight_unit,
        }
    }
}

/// Body of `POST /sales`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequest {
    pub customer_id: Option<i64>,
    pub items: Vec<SaleLineItem>,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub discount_type: DiscountKind,
    #[serde(with = "serde_decimal")]
    #[ts(type = "number")]
    pub discount_value: Decimal,
    pub vat_percentage: TaxRate,
    pub vat_amount: Money,
    pub total: Money,
    /// Single method or composite `method:amount,...` encoding.
    pub payment_method: String,
    pub payment_amount: Money,
    pub change_amount: Money,
    pub payments: Vec<Tender>,
    pub notes: Option<String>,
}

impl SaleRequest {
    /// Reconciles `tenders` against the cart's totals and builds the body.
    pub fn prepare(cart: &Cart, tenders: Vec<Tender>) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        let totals = cart.totals();
        let settlement = reconcile(tenders, totals.total)?;
        let discount = cart.discount();

        Ok(SaleRequest {
            customer_id: cart.customer_id(),
            items: cart.lines().iter().map(SaleLineItem::from).collect(),
            subtotal: totals.subtotal,
            discount_amount: totals.discount,
            discount_type: discount.kind,
            discount_value: discount.value,
            vat_percentage: totals.vat_percentage,
            vat_amount: totals.vat,
            total: totals.total,
            payment_method: settlement.payment_method.to_string(),
            payment_amount: settlement.total_paid,
            change_amount: settlement.change,
            payments: settlement.tenders,
            notes: cart.notes().map(str::to_string),
        })
    }
}

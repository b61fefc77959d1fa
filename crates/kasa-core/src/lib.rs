//! # kasa-core: Pure Billing Engine for Kasa POS
//!
//! This crate is the pricing heart of the billing screen. Every function is
//! pure: no database, no network, no clock reads outside of timestamping a
//! held-sale snapshot.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasa POS Billing Flow                            │
//! │                                                                         │
//! │  UI event (scan, qty edit, unit switch, price edit)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ kasa-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   units ──► pricing ──► cart ──► totals ◄── discount            │   │
//! │  │                           │                                     │   │
//! │  │                           ├──► stock   (gates checkout)         │   │
//! │  │                           ├──► payment (split tender)           │   │
//! │  │                           ├──► sale    (POST /sales body)       │   │
//! │  │                           └──► held    (hold / resume)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  kasa-session (backend round-trips, config, logging)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`units`] - Base unit ⇄ display unit conversion
//! - [`pricing`] - Per-line VAT-inclusive pricing
//! - [`totals`] - Cart aggregation and sale-level VAT split
//! - [`discount`] - Fixed / percentage discounts
//! - [`stock`] - Local and authoritative stock checks
//! - [`held`] - Held-sale snapshots with legacy migration
//! - [`payment`] - Split tender reconciliation
//! - [`cart`] - The owned `Cart` aggregate
//! - [`sale`] - Sale submission body
//! - [`money`] - Money type in integer cents
//! - [`types`] - Catalog types (Product, UnitConversion, TaxRate)
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use kasa_core::money::Money;
//! use kasa_core::pricing::price_from_base;
//! use kasa_core::types::TaxRate;
//! use rust_decimal::Decimal;
//!
//! // Base price 10.00, VAT 5%, one unit
//! let line = price_from_base(Decimal::new(10, 0), TaxRate::from_bps(500), Decimal::ONE);
//!
//! assert_eq!(line.unit_price, Decimal::new(105, 1));
//! assert_eq!(line.total_price, Money::from_cents(1050));
//! assert_eq!(line.vat_amount, Money::from_cents(50));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod discount;
pub mod error;
pub mod held;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod sale;
pub mod serde_decimal;
pub mod stock;
pub mod totals;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartPolicy, LineKind};
pub use discount::{Discount, DiscountKind};
pub use error::{CoreError, CoreResult, ValidationError};
pub use held::{HeldSale, HeldSaleSnapshot, ResumedCart};
pub use money::Money;
pub use payment::{PaymentMethod, Settlement, Tender};
pub use sale::SaleRequest;
pub use stock::StockStatus;
pub use totals::Totals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart unless a policy says otherwise.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line, in base units.
///
/// Guards against scanner bursts and typos (10000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 99_999;

/// Largest single amount (price, fixed discount, tender) accepted as input,
/// in major units.
pub const MAX_MONEY_AMOUNT: i64 = 999_999_999;

/// Decimal places kept for quantities (base and display).
pub const QUANTITY_SCALE: u32 = 4;

/// Decimal places kept for monetary amounts.
pub const MONEY_SCALE: u32 = 2;

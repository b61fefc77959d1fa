//! # Payment Reconciliation
//!
//! Checks that the tendered payments cover the sale total and computes
//! the change.
//!
//! ```text
//!   tenders  [cash 40.00, card 60.00]
//!   total    90.00
//!   ──────────────────────────────────────
//!   paid     100.00    change 10.00
//!   method   "cash:40.00,card:60.00"
//! ```
//!
//! A single tender records its method as is ("cash"). Several tenders are
//! recorded as a composite string of `method:amount` pairs in tender order.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{validate_payment_amount, validate_payment_method};

/// One `(method, amount)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tender {
    pub method: String,
    pub amount: Money,
}

impl Tender {
    /// Validates and builds a tender. The method is trimmed and lowercased.
    pub fn new(method: &str, amount: Decimal) -> CoreResult<Self> {
        let method = validate_payment_method(method)?;
        validate_payment_amount(amount)?;
        Ok(Tender {
            method,
            amount: Money::from_decimal(amount),
        })
    }
}

/// The payment method recorded on the sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
    Single(String),
    Split(Vec<Tender>),
}

impl PaymentMethod {
    /// Single when exactly one tender, split otherwise.
    pub fn from_tenders(tenders: &[Tender]) -> Self {
        match tenders {
            [only] => PaymentMethod::Single(only.method.clone()),
            _ => PaymentMethod::Split(tenders.to_vec()),
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, PaymentMethod::Split(_))
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Single(method) => f.write_str(method),
            PaymentMethod::Split(tenders) => {
                for (i, tender) in tenders.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", tender.method, tender.amount)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    /// Parses either a plain method or the composite encoding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.contains(':') {
            return Ok(PaymentMethod::Single(validate_payment_method(s)?));
        }

        let mut tenders = Vec::new();
        for part in s.split(',') {
            let (method, amount) = part.split_once(':').ok_or_else(|| {
                CoreError::Validation(ValidationError::Required {
                    field: "payment amount".to_string(),
                })
            })?;
            let amount = Decimal::from_str(amount.trim()).map_err(|_| {
                CoreError::Validation(ValidationError::MustBePositive {
                    field: "payment amount".to_string(),
                })
            })?;
            tenders.push(Tender::new(method, amount)?);
        }
        Ok(PaymentMethod::Split(tenders))
    }
}

impl Serialize for PaymentMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PaymentMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A reconciled payment, ready to go on the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub tenders: Vec<Tender>,
    pub total: Money,
    pub total_paid: Money,
    pub change: Money,
    #[ts(type = "string")]
    pub payment_method: PaymentMethod,
}

/// Reconciles tenders against the sale total.
///
/// ## Errors
/// - `Validation` when no tender was given
/// - `PaymentShortfall` when the tenders add up to less than `total`
pub fn reconcile(tenders: Vec<Tender>, total: Money) -> CoreResult<Settlement> {
    if tenders.is_empty() {
        return Err(ValidationError::Required {
            field: "payments".to_string(),
        }
        .into());
    }

    let total_paid: Money = tenders.iter().map(|t| t.amount).sum();
    if total_paid < total {
        return Err(CoreError::PaymentShortfall {
            paid: total_paid,
            total,
            shortfall: total - total_paid,
        });
    }

    Ok(Settlement {
        payment_method: PaymentMethod::from_tenders(&tenders),
        tenders,
        total,
        total_paid,
        change: (total_paid - total).max(Money::zero()),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

//! Decimal wire helpers.
//!
//! Backends and older held-sale snapshots send amounts either as JSON
//! numbers (`10.5`) or as numeric strings (`"10.50"`). Everything decodes
//! through here; everything encodes as a JSON number.
//!
//! ```rust
//! use kasa_core::serde_decimal;
//! use rust_decimal::Decimal;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Row {
//!     #[serde(deserialize_with = "serde_decimal::deserialize")]
//!     price: Decimal,
//! }
//!
//! let a: Row = serde_json::from_str(r#"{"price": 10.5}"#).unwrap();
//! let b: Row = serde_json::from_str(r#"{"price": "10.5"}"#).unwrap();
//! assert_eq!(a.price, b.price);
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Serializes a `Decimal` as a JSON number.
pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    rust_decimal::serde::float::serialize(value, serializer)
}

/// Deserializes a `Decimal` from a JSON number, numeric string, or null (zero).
pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_value(&value)
        .map(|parsed| parsed.unwrap_or(Decimal::ZERO))
        .map_err(D::Error::custom)
}

/// Parses a JSON value into a decimal.
///
/// `Ok(None)` for null and empty strings.
pub fn parse_value(value: &Value) -> Result<Option<Decimal>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_str(s.trim()).map(Some),
        Value::Number(n) => parse_str(&n.to_string()).map(Some),
        other => Err(format!("expected decimal string, number, or null, got {other}")),
    }
}

fn parse_str(s: &str) -> Result<Decimal, String> {
    // serde_json prints very small/large floats in scientific notation
    if s.contains('e') || s.contains('E') {
        Decimal::from_scientific(s).map_err(|e| e.to_string())
    } else {
        Decimal::from_str(s).map_err(|e| e.to_string())
    }
}

/// `Option<Decimal>` variant: null and empty strings become `None`.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(decimal) => super::serialize(decimal, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        parse_value(&value).map_err(D::Error::custom)
    }
}

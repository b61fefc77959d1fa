//! # Session Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KASA_SALE_VAT=5                                                    │
//! │     KASA_ENFORCE_STOCK=false                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kasapos/kasa.toml (Linux)                                │
//! │     ~/Library/Application Support/com.kasa.pos/kasa.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [pricing]
//! sale_vat_percentage = 5.0
//! no_vat = false
//! percentage_discount_cap = 100.0
//!
//! [cart]
//! max_lines = 100
//! enforce_stock = true
//!
//! [display]
//! currency_symbol = "Rs "
//! currency_decimals = 2
//! ```

use std::path::PathBuf;

use kasa_core::discount::DEFAULT_PERCENT_CAP;
use kasa_core::validation::parse_tax_percentage;
use kasa_core::{serde_decimal, CartPolicy, Money, TaxRate, MAX_CART_LINES};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};

// =============================================================================
// Sections
// =============================================================================

/// Sale-level VAT and discount settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// VAT split out of the sale total on the receipt, in percent.
    #[serde(with = "serde_decimal", default)]
    pub sale_vat_percentage: Decimal,

    /// Skip the sale-level VAT split.
    #[serde(default)]
    pub no_vat: bool,

    /// Largest accepted percentage discount.
    #[serde(with = "serde_decimal", default = "default_discount_cap")]
    pub percentage_discount_cap: Decimal,
}

fn default_discount_cap() -> Decimal {
    DEFAULT_PERCENT_CAP
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            sale_vat_percentage: Decimal::ZERO,
            no_vat: false,
            percentage_discount_cap: default_discount_cap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSettings {
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// Reject adds beyond the local stock snapshot.
    #[serde(default = "default_true")]
    pub enforce_stock: bool,
}

fn default_max_lines() -> usize {
    MAX_CART_LINES
}

fn default_true() -> bool {
    true
}

impl Default for CartSettings {
    fn default() -> Self {
        CartSettings {
            max_lines: default_max_lines(),
            enforce_stock: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    #[serde(default = "default_currency_decimals")]
    pub currency_decimals: u8,
}

fn default_currency_symbol() -> String {
    "Rs ".to_string()
}

fn default_currency_decimals() -> u8 {
    2
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            currency_symbol: default_currency_symbol(),
            currency_decimals: default_currency_decimals(),
        }
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub cart: CartSettings,

    #[serde(default)]
    pub display: DisplaySettings,
}

impl SessionConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (kasa.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading session config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load session config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> SessionResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SessionError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Session config saved");
        Ok(())
    }

    pub fn validate(&self) -> SessionResult<()> {
        let vat = self.pricing.sale_vat_percentage;
        parse_tax_percentage(vat).map_err(|e| {
            SessionError::InvalidConfig(format!("sale_vat_percentage {vat}: {e}"))
        })?;

        let cap = self.pricing.percentage_discount_cap;
        if cap <= Decimal::ZERO || cap > Decimal::ONE_HUNDRED {
            return Err(SessionError::InvalidConfig(format!(
                "percentage_discount_cap must be in (0, 100], got {cap}"
            )));
        }

        if self.cart.max_lines == 0 {
            return Err(SessionError::InvalidConfig(
                "max_lines must be greater than 0".into(),
            ));
        }

        if self.display.currency_decimals > 4 {
            return Err(SessionError::InvalidConfig(
                "currency_decimals must be at most 4".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(vat) = std::env::var("KASA_SALE_VAT") {
            match vat.trim().parse::<Decimal>() {
                Ok(v) => {
                    debug!(vat = %v, "Overriding sale VAT from environment");
                    self.pricing.sale_vat_percentage = v;
                }
                Err(_) => warn!(value = %vat, "Ignoring unparsable KASA_SALE_VAT"),
            }
        }

        if let Some(flag) = env_flag("KASA_NO_VAT") {
            self.pricing.no_vat = flag;
        }

        if let Ok(lines) = std::env::var("KASA_MAX_CART_LINES") {
            if let Ok(n) = lines.trim().parse::<usize>() {
                self.cart.max_lines = n;
            }
        }

        if let Some(flag) = env_flag("KASA_ENFORCE_STOCK") {
            debug!(enforce_stock = flag, "Overriding stock enforcement from environment");
            self.cart.enforce_stock = flag;
        }

        if let Ok(symbol) = std::env::var("KASA_CURRENCY_SYMBOL") {
            self.display.currency_symbol = symbol;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "kasa", "pos")
            .map(|dirs| dirs.config_dir().join("kasa.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn sale_vat(&self) -> TaxRate {
        TaxRate::from_percentage(self.pricing.sale_vat_percentage)
    }

    /// Cart policy derived from the `[cart]` and `[pricing]` sections.
    pub fn cart_policy(&self) -> CartPolicy {
        CartPolicy {
            max_lines: self.cart.max_lines,
            enforce_stock: self.cart.enforce_stock,
            percent_cap: self.pricing.percentage_discount_cap,
        }
    }

    /// Formats an amount for the receipt and billing screen.
    ///
    /// ## Example
    /// ```rust
    /// use kasa_core::Money;
    /// use kasa_session::config::SessionConfig;
    ///
    /// let config = SessionConfig::default();
    /// assert_eq!(config.format_currency(Money::from_cents(123456)), "Rs 1234.56");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        let decimals = u32::from(self.display.currency_decimals);
        let value = amount
            .to_decimal()
            .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
            .abs();
        format!(
            "{}{}{:.prec$}",
            if amount.is_negative() { "-" } else { "" },
            self.display.currency_symbol,
            value,
            prec = decimals as usize
        )
    }
}

/// Reads a boolean flag: 1/true/yes/on or 0/false/no/off.
fn env_flag(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(var = name, value = %raw, "Ignoring unparsable boolean");
            None
        }
    }
}

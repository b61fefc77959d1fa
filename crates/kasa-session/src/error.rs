//! # Session Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Session Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Cart rules    │  │    Backend      │  │     Workflow            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Core(..)       │  │  Backend(..)    │  │  HeldSaleNotFound       │ │
//! │  │  (kasa-core)    │  │  SaleSubmission │  │  ProductNotFound        │ │
//! │  │                 │  │  Failure        │  │  CartNotEmpty           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  Configuration  │                                                   │
//! │  │  InvalidConfig  │                                                   │
//! │  │  ConfigLoad/Save│                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No variant is fatal. Every failure leaves the live cart as it was.

use kasa_core::CoreError;
use thiserror::Error;

use crate::backend::BackendError;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    // =========================================================================
    // Cart Rules
    // =========================================================================
    /// A cart, pricing or tender rule rejected the input.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// A read or held-sale call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// `POST /sales` failed. The cart is kept for a retry.
    #[error("Sale submission failed: {source}")]
    SaleSubmissionFailure {
        #[source]
        source: BackendError,
    },

    // =========================================================================
    // Workflow Errors
    // =========================================================================
    #[error("Held sale {0} not found")]
    HeldSaleNotFound(i64),

    #[error("Product {0} not found")]
    ProductNotFound(i64),

    #[error("No product with barcode '{0}'")]
    BarcodeNotFound(String),

    /// Resume needs an empty cart; hold or clear the current one first.
    #[error("Cart is not empty")]
    CartNotEmpty,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SessionError {
    fn from(err: toml::ser::Error) -> Self {
        SessionError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SessionError {
    /// True when repeating the same call may succeed.
    ///
    /// The session never retries on its own; the caller's request layer
    /// owns retry and timeout policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Backend(err) | SessionError::SaleSubmissionFailure { source: err } => {
                err.is_retryable()
            }
            _ => false,
        }
    }

    /// True when the cashier can fix the input and try again.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SessionError::Core(
                CoreError::InvalidQuantity(_)
                    | CoreError::InvalidPrice(_)
                    | CoreError::InvalidDiscount(_)
                    | CoreError::Validation(_)
                    | CoreError::UnitNotAvailable { .. }
                    | CoreError::PaymentShortfall { .. }
            )
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidConfig(_)
                | SessionError::ConfigLoadFailed(_)
                | SessionError::ConfigSaveFailed(_)
        )
    }
}

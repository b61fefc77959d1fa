//! # kasa-session: Billing Session Shell
//!
//! Wraps the pure [`kasa_core`] cart with everything that needs I/O.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        kasa-session                                     │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌───────────────────┐   │
//! │  │  BillingSession  │──►│     Catalog      │   │   SessionConfig   │   │
//! │  │  (session.rs)    │   │  (catalog.rs)    │   │   (config.rs)     │   │
//! │  │                  │   └────────┬─────────┘   └───────────────────┘   │
//! │  │  Arc<Mutex<Cart>>│            │                                      │
//! │  └────────┬─────────┘            │                                      │
//! │           │                      │                                      │
//! │           ▼                      ▼                                      │
//! │  ┌─────────────────────────────────────────────┐                       │
//! │  │          dyn Backend (backend.rs)           │                       │
//! │  │   InMemoryBackend (memory.rs) for tests     │                       │
//! │  └─────────────────────────────────────────────┘                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let config = SessionConfig::load_or_default(None);
//! let session = BillingSession::new(backend, config);
//! session.load_catalog().await?;
//!
//! session.add_product_in_unit(42, "box", dec!(2)).await?;
//! let outcome = session.checkout(vec![Tender::new("cash", dec!(50))?]).await?;
//! ```

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod memory;
pub mod session;
pub mod telemetry;

pub use backend::{Backend, BackendError, BackendResult, ProductQuery, SaleReceipt};
pub use catalog::Catalog;
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use memory::InMemoryBackend;
pub use session::{BillingSession, CheckoutOutcome, ResumeOutcome};

//! # Offline Quote Tool
//!
//! Prices a cart scenario without a backend and prints the result as JSON.
//!
//! ## Usage
//! ```bash
//! # Read the scenario from a file
//! cargo run -p kasa-session --bin kasa-quote -- --scenario ./cart.json
//!
//! # Read it from stdin, with a config file
//! cat cart.json | cargo run -p kasa-session --bin kasa-quote -- --config ./kasa.toml
//! ```
//!
//! ## Scenario Format
//! ```json
//! {
//!   "products": [{"id": 1, "name": "Water", "price": 1, "base_unit": "bottle"}],
//!   "conversions": [{"name": "pack", "base_unit": "bottle", "operator": "*", "operation_value": 6}],
//!   "operations": [
//!     {"op": "add_in_unit", "product_id": 1, "unit": "pack", "quantity": 15}
//!   ],
//!   "discount": {"kind": "percentage", "value": 10},
//!   "sale_vat_percentage": 5,
//!   "tenders": [{"method": "cash", "amount": 40}, {"method": "card", "amount": 60}]
//! }
//! ```

use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use kasa_core::{
    serde_decimal, CartLine, DiscountKind, Product, SaleRequest, TaxRate, Tender, Totals,
    UnitConversion,
};
use kasa_session::telemetry::init_tracing;
use kasa_session::{BillingSession, InMemoryBackend, SessionConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Add {
        product_id: i64,
        #[serde(with = "serde_decimal")]
        quantity: Decimal,
    },
    AddInUnit {
        product_id: i64,
        unit: String,
        #[serde(with = "serde_decimal")]
        quantity: Decimal,
    },
    Weigh {
        product_id: i64,
        #[serde(with = "serde_decimal")]
        weight: Decimal,
    },
    /// Line indexes refer to cart order at the time the step runs.
    SetQuantity {
        line: usize,
        #[serde(with = "serde_decimal")]
        quantity: Decimal,
    },
    ChangeUnit {
        line: usize,
        unit: String,
    },
    OverridePrice {
        line: usize,
        #[serde(with = "serde_decimal")]
        unit_price: Decimal,
    },
    Remove {
        line: usize,
    },
}

#[derive(Debug, Deserialize)]
struct DiscountInput {
    kind: DiscountKind,
    #[serde(with = "serde_decimal")]
    value: Decimal,
}

#[derive(Debug, Deserialize)]
struct TenderInput {
    method: String,
    #[serde(with = "serde_decimal")]
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    conversions: Vec<UnitConversion>,
    #[serde(default)]
    operations: Vec<Step>,
    #[serde(default)]
    discount: Option<DiscountInput>,
    #[serde(default)]
    sale_vat_percentage: Option<TaxRate>,
    #[serde(default)]
    no_vat: Option<bool>,
    #[serde(default)]
    tenders: Vec<TenderInput>,
}

#[derive(Debug, Serialize)]
struct Quote {
    lines: Vec<CartLine>,
    totals: Totals,
    total_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sale: Option<SaleRequest>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut scenario_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-s" | "--scenario" => {
                if i + 1 < args.len() {
                    scenario_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "-c" | "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "-h" | "--help" => {
                println!("Kasa POS offline quote");
                println!();
                println!("Usage: kasa-quote [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --scenario <PATH>  Scenario JSON (default: stdin)");
                println!("  -c, --config <PATH>    Config file (default: platform config dir)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            other => {
                return Err(format!("unknown argument '{other}'").into());
            }
        }
        i += 1;
    }

    let raw = match &scenario_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let scenario: Scenario = serde_json::from_str(&raw)?;

    let config = SessionConfig::load_or_default(config_path);
    let backend = Arc::new(InMemoryBackend::new(scenario.products, scenario.conversions));
    let session = BillingSession::new(backend, config);
    session.load_catalog().await?;

    if let Some(rate) = scenario.sale_vat_percentage {
        session.set_sale_vat(rate)?;
    }
    if let Some(no_vat) = scenario.no_vat {
        session.set_no_vat(no_vat);
    }

    for step in scenario.operations {
        run_step(&session, step).await?;
    }

    if let Some(discount) = scenario.discount {
        session.set_discount(discount.kind, discount.value)?;
    }

    let sale = if scenario.tenders.is_empty() {
        None
    } else {
        let tenders = scenario
            .tenders
            .iter()
            .map(|t| Tender::new(&t.method, t.amount))
            .collect::<Result<Vec<_>, _>>()?;
        Some(session.with_cart(|cart| SaleRequest::prepare(cart, tenders))?)
    };

    let totals = session.totals();
    let quote = Quote {
        lines: session.lines(),
        total_display: session.config().format_currency(totals.total),
        totals,
        sale,
    };
    info!(lines = quote.lines.len(), total = %quote.totals.total, "Quote ready");

    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

async fn run_step(session: &BillingSession, step: Step) -> Result<(), Box<dyn std::error::Error>> {
    let line_id = |line: usize| -> Result<String, Box<dyn std::error::Error>> {
        session
            .lines()
            .get(line)
            .map(|l| l.id.clone())
            .ok_or_else(|| format!("no cart line at index {line}").into())
    };

    match step {
        Step::Add {
            product_id,
            quantity,
        } => {
            session.add_product(product_id, quantity).await?;
        }
        Step::AddInUnit {
            product_id,
            unit,
            quantity,
        } => {
            session.add_product_in_unit(product_id, &unit, quantity).await?;
        }
        Step::Weigh { product_id, weight } => {
            session.add_weighed_product(product_id, weight).await?;
        }
        Step::SetQuantity { line, quantity } => {
            session.update_display_quantity(&line_id(line)?, quantity)?;
        }
        Step::ChangeUnit { line, unit } => {
            session.change_unit(&line_id(line)?, &unit)?;
        }
        Step::OverridePrice { line, unit_price } => {
            session.override_unit_price(&line_id(line)?, unit_price)?;
        }
        Step::Remove { line } => {
            session.remove_line(&line_id(line)?)?;
        }
    }
    Ok(())
}

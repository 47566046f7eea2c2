//! Chart of accounts seeder for Tally.
//!
//! Creates every account of the canonical chart that is missing. Safe to run
//! repeatedly. With `--demo`, also posts an opening capital transaction for
//! local development.
//!
//! Usage: cargo run --bin seeder [-- --demo]

use anyhow::Context;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use tally_core::GeneralLedger;
use tally_core::accounts::CANONICAL_CHART;
use tally_core::accounts::chart::BANK_OPERATING;
use tally_core::ledger::{EntryInput, NewTransactionInput, SourceModule};
use tally_db::{connect, general_ledger};
use tally_shared::AppConfig;

/// Owner's capital, credited by the demo opening balance.
const OWNERS_CAPITAL: &str = "3010";
const DEMO_SOURCE_ID: &str = "DEMO-OPENING-BALANCE";
const SEEDER: &str = "system:seeder";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seeder=info,tally_core=info".into()),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let demo = std::env::args().any(|arg| arg == "--demo");

    info!("Connecting to database...");
    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let gl = general_ledger(&db);

    let summary = gl.ensure_required_accounts_exist(CANONICAL_CHART).await?;
    info!(
        created = summary.created,
        existing = summary.existing,
        "Seeded chart of accounts"
    );

    if demo {
        seed_opening_balance(&gl).await?;
    }

    info!("Seeding complete!");
    Ok(())
}

/// Dr Bank Operating / Cr Owner's Capital, once.
async fn seed_opening_balance(gl: &GeneralLedger) -> anyhow::Result<()> {
    let amount = Decimal::new(10_000, 0);
    let input = NewTransactionInput {
        date: Utc::now().date_naive(),
        source_module: SourceModule::Manual,
        source_transaction_id: DEMO_SOURCE_ID.to_string(),
        source_transaction_type: "opening-balance".to_string(),
        description: "Opening capital".to_string(),
        entries: vec![
            EntryInput::debit(BANK_OPERATING, amount),
            EntryInput::credit(OWNERS_CAPITAL, amount),
        ],
        created_by: SEEDER.to_string(),
        branch_id: None,
        metadata: serde_json::json!({ "seed": true }),
    };

    match gl.create_transaction(input).await {
        Ok(tx) => {
            gl.post_transaction(tx.id, SEEDER).await?;
            info!(transaction_id = %tx.id, %amount, "Posted opening balance");
        }
        Err(err) if err.is_benign() => info!("Opening balance already present, skipping..."),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

//! Tally sync worker.
//!
//! Pulls completed transactions from every enabled upstream module on a fixed
//! interval and posts them into the general ledger.
//!
//! Usage:
//!   tally-syncd        - Run until interrupted
//!   tally-syncd once   - Run a single round and exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Utc;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tally_core::GeneralLedger;
use tally_core::accounts::CANONICAL_CHART;
use tally_core::ledger::SourceModule;
use tally_core::sync::{FeedFilter, SyncCoordinator, SyncScheduler};
use tally_db::migration::Migrator;
use tally_db::{HttpSourceFeed, connect, general_ledger};
use tally_shared::AppConfig;
use tally_shared::config::SyncConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let once = std::env::args().nth(1).is_some_and(|arg| arg == "once");

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    Migrator::up(&db, None).await.context("Failed to apply migrations")?;

    let gl = general_ledger(&db);
    let seeded = gl.ensure_required_accounts_exist(CANONICAL_CHART).await?;
    info!(
        created = seeded.created,
        existing = seeded.existing,
        "Chart of accounts ready"
    );

    let coordinators = build_coordinators(&gl, &config.sync)?;
    if coordinators.is_empty() {
        warn!("No upstream feeds enabled, nothing to sync");
        return Ok(());
    }

    let scheduler = SyncScheduler::new(coordinators);
    info!(
        modules = ?scheduler.modules(),
        interval_secs = config.sync.interval_secs,
        lookback_days = config.sync.lookback_days,
        "Sync worker starting"
    );

    if once {
        let filter = FeedFilter::lookback(Utc::now().date_naive(), config.sync.lookback_days);
        let mut failed = false;
        for (module, outcome) in scheduler.run_once(&filter).await {
            match outcome {
                Ok(report) => info!(
                    module = %module,
                    status = %report.status,
                    processed = report.records_processed,
                    succeeded = report.records_succeeded,
                    failed = report.records_failed,
                    "Sync run complete"
                ),
                Err(err) => {
                    failed = true;
                    error!(module = %module, error = %err, "Sync run failed");
                }
            }
        }
        if failed {
            bail!("One or more sync runs failed");
        }
        return Ok(());
    }

    scheduler
        .run_every(
            Duration::from_secs(config.sync.interval_secs),
            config.sync.lookback_days,
            shutdown_signal(),
        )
        .await;

    db.close().await.ok();
    info!("Sync worker stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tally_syncd=info,tally_core=info,tally_db=info,sea_orm=warn".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// One coordinator per enabled feed.
fn build_coordinators(
    gl: &GeneralLedger,
    config: &SyncConfig,
) -> anyhow::Result<Vec<SyncCoordinator>> {
    let feeds = [
        (SourceModule::Momo, &config.feeds.momo),
        (SourceModule::AgencyBanking, &config.feeds.agency_banking),
        (SourceModule::Commissions, &config.feeds.commissions),
        (SourceModule::Expenses, &config.feeds.expenses),
    ];

    let mut coordinators = Vec::new();
    for (module, feed) in feeds {
        if !feed.enabled {
            continue;
        }
        if feed.base_url.trim().is_empty() {
            bail!("Feed for {module} is enabled but has no base_url");
        }

        let client = HttpSourceFeed::new(feed).with_context(|| format!("Invalid feed for {module}"))?;
        coordinators.push(gl.coordinator(module, Arc::new(client), config.actor.clone())?);
        info!(module = %module, base_url = %feed.base_url, "Feed enabled");
    }
    Ok(coordinators)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
        // Without a signal handler the worker runs until killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

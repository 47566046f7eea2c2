//! PostgreSQL storage for the Tally general ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories implementing the `tally-core` storage traits
//! - Database migrations
//! - The HTTP client for upstream module feeds

pub mod entities;
pub mod feed;
pub mod migration;
pub mod repositories;

mod error;

pub use feed::HttpSourceFeed;
pub use repositories::{
    AccountRepository, BalanceRepository, SyncLogRepository, TransactionRepository,
};

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_core::GeneralLedger;
use tally_shared::config::DatabaseConfig;

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}

/// The general ledger over PostgreSQL repositories sharing one pool.
#[must_use]
pub fn general_ledger(db: &DatabaseConnection) -> GeneralLedger {
    GeneralLedger::from_parts(
        Arc::new(AccountRepository::new(db.clone())),
        Arc::new(TransactionRepository::new(db.clone())),
        Arc::new(BalanceRepository::new(db.clone())),
        Arc::new(SyncLogRepository::new(db.clone())),
    )
}

//! Core general ledger logic for Tally.
//!
//! Domain types, validation rules and services live here. Persistence is
//! reached only through the traits in [`store`], so the crate carries no
//! database or web dependencies.
//!
//! # Modules
//!
//! - `accounts` - Chart of accounts and the account registry
//! - `ledger` - Double-entry transactions and the transaction engine
//! - `balance` - Running and per-period account balances
//! - `sync` - Upstream feeds, mappings, coordinators and the sync log
//! - `reports` - Trial balance
//! - `store` - Storage traits and the in-memory store

pub mod accounts;
pub mod balance;
pub mod general_ledger;
pub mod ledger;
pub mod reports;
pub mod store;
pub mod sync;

pub use general_ledger::GeneralLedger;
pub use ledger::{LedgerError, ValidationError};
pub use store::{MemoryStore, StoreError};

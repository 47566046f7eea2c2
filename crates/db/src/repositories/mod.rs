//! Repository implementations of the ledger storage traits.
//!
//! Each repository owns a pooled connection and maps `SeaORM` models to the
//! domain types in `tally-core`.

pub mod account;
pub mod balance;
pub mod sync_log;
pub mod transaction;

pub use account::AccountRepository;
pub use balance::BalanceRepository;
pub use sync_log::SyncLogRepository;
pub use transaction::TransactionRepository;

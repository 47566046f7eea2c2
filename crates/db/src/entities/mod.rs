//! `SeaORM` entities for the general ledger tables.

pub mod account_period_balances;
pub mod chart_of_accounts;
pub mod ledger_entries;
pub mod sea_orm_active_enums;
pub mod sync_logs;
pub mod transactions;

//! Financial report generation.
//!
//! Trial balance over the chart of accounts, from current balances or
//! reconstructed as of a date.

pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use service::{BALANCE_EPSILON, ReportService, TrialBalanceReporter};
pub use types::*;

//! Double-entry bookkeeping.
//!
//! - Domain types for transactions and entries
//! - Entry validation rules
//! - Reversal mirrors
//! - The transaction engine
//! - Error types for ledger operations

pub mod error;
pub mod reversal;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_tests;
#[cfg(test)]
mod validation_props;

pub use error::{LedgerError, ValidationError};
pub use reversal::ReversalService;
pub use service::LedgerEngine;
pub use types::{
    Entry, EntryInput, NewTransactionInput, Reversal, SourceModule, Transaction,
    TransactionFilter, TransactionStatus, TransactionTotals, UnknownSourceModule,
};
pub use validation::{resolve_entries, validate_entries};

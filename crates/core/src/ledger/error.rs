//! Ledger error types.
//!
//! [`ValidationError`] covers input that can never succeed as given.
//! [`LedgerError`] is what every engine, registry and coordinator call returns.

use rust_decimal::Decimal;
use tally_shared::AppError;
use tally_shared::types::TransactionId;
use thiserror::Error;

use super::types::{SourceModule, TransactionStatus};
use crate::store::StoreError;

/// Input rejected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Fewer than two entries.
    #[error("Transaction must have at least 2 entries, got {count}")]
    InsufficientEntries {
        /// Entries supplied.
        count: usize,
    },

    /// A debit or credit below zero.
    #[error("Entry for account {account_code} has a negative amount")]
    NegativeAmount {
        /// Offending account code.
        account_code: String,
    },

    /// Both sides set, or neither.
    #[error("Entry for account {account_code} must have exactly one of debit or credit")]
    AmbiguousEntry {
        /// Offending account code.
        account_code: String,
    },

    /// Σdebit != Σcredit.
    #[error("Transaction is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debits.
        debit: Decimal,
        /// Total credits.
        credit: Decimal,
    },

    /// Account code not in the chart.
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// Account exists but was deactivated.
    #[error("Account {0} is inactive")]
    InactiveAccount(String),

    /// Account type string outside the closed set.
    #[error("Unknown account type: {0}")]
    UnknownAccountType(String),

    /// Parent code does not resolve.
    #[error("Parent account not found: {0}")]
    ParentNotFound(String),

    /// Required text field left blank.
    #[error("Field {0} must not be empty")]
    EmptyField(&'static str),
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ========== Idempotency ==========
    /// A non-reversed transaction already holds this source key.
    #[error("Source transaction {module}/{source_transaction_id} is already recorded")]
    DuplicateSource {
        /// Source module.
        module: SourceModule,
        /// Upstream ID.
        source_transaction_id: String,
        /// Existing transaction, when known.
        existing: Option<TransactionId>,
    },

    // ========== Transaction State Errors ==========
    /// Operation not allowed in the current status.
    #[error("Transaction {id} is {actual}, expected {expected}")]
    InvalidState {
        /// Transaction ID.
        id: TransactionId,
        /// Status the operation required.
        expected: TransactionStatus,
        /// Status found.
        actual: TransactionStatus,
    },

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    // ========== Sync Errors ==========
    /// No mapping rule for an upstream transaction type.
    #[error("No account mapping for {module} transaction type '{transaction_type}'")]
    Mapping {
        /// Source module.
        module: SourceModule,
        /// Upstream type as received.
        transaction_type: String,
    },

    // ========== Storage Errors ==========
    /// Backend failure.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses and sync log details.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(v) => match v {
                ValidationError::InsufficientEntries { .. } => "INSUFFICIENT_ENTRIES",
                ValidationError::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
                ValidationError::AmbiguousEntry { .. } => "AMBIGUOUS_ENTRY",
                ValidationError::Unbalanced { .. } => "UNBALANCED_TRANSACTION",
                ValidationError::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
                ValidationError::InactiveAccount(_) => "ACCOUNT_INACTIVE",
                ValidationError::UnknownAccountType(_) => "UNKNOWN_ACCOUNT_TYPE",
                ValidationError::ParentNotFound(_) => "PARENT_NOT_FOUND",
                ValidationError::EmptyField(_) => "EMPTY_FIELD",
            },
            Self::DuplicateSource { .. } => "DUPLICATE_SOURCE",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Mapping { .. } => "MAPPING_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Duplicates mean "already processed"; callers treat them as success.
    #[must_use]
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::DuplicateSource { .. })
    }

    /// True when retrying the next record cannot succeed either.
    #[must_use]
    pub const fn is_systemic(&self) -> bool {
        match self {
            Self::Storage(err) => err.is_systemic(),
            _ => false,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Validation(_) | LedgerError::Mapping { .. } => Self::Validation(message),
            LedgerError::DuplicateSource { .. } => Self::Conflict(message),
            LedgerError::InvalidState { .. } => Self::BusinessRule(message),
            LedgerError::TransactionNotFound(_) | LedgerError::AccountNotFound(_) => {
                Self::NotFound(message)
            }
            LedgerError::Storage(_) => Self::Database(message),
        }
    }
}

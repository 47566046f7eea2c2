//! Storage seams.
//!
//! Services depend on these traits through `Arc<dyn ...>` so the same engine
//! runs against PostgreSQL (`tally-db`) or the in-memory [`MemoryStore`].
//! Every method is one unit of work: implementations must apply all of it or
//! none of it.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tally_shared::types::{AccountId, TransactionId};

use crate::accounts::Account;
use crate::balance::{AccountBalance, BalanceDelta, BalanceQuery, PeriodBalance};
use crate::ledger::{SourceModule, Transaction, TransactionFilter, TransactionStatus};
use crate::sync::{SyncLogEntry, SyncLogFilter};

pub use memory::MemoryStore;

/// Errors surfaced by storage implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Constraint or index name.
        constraint: String,
    },

    /// A compare-and-set found the row in a different state.
    #[error("Stale state: {0}")]
    StaleState(String),

    /// A row the write depends on does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backing store is unreachable.
    #[error("Storage connection failed: {0}")]
    Connection(String),

    /// Any other storage failure.
    #[error("Storage query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// True when the store itself is unavailable, as opposed to one bad row.
    #[must_use]
    pub const fn is_systemic(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Result alias for storage calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Status transition pending → posted, applied with its balance deltas.
#[derive(Debug, Clone)]
pub struct Posting {
    /// Transaction being posted. Must currently be pending.
    pub transaction_id: TransactionId,
    /// Who posted it.
    pub posted_by: String,
    /// When it was posted.
    pub posted_at: DateTime<Utc>,
    /// Deltas produced by the balance ledger.
    pub deltas: Vec<BalanceDelta>,
}

/// Reversal of a transaction, optionally with a posted mirror.
#[derive(Debug, Clone)]
pub struct ReversalCommit {
    /// Transaction being reversed.
    pub original_id: TransactionId,
    /// Status the original must still have.
    pub expected_status: TransactionStatus,
    /// Who reversed it.
    pub reversed_by: String,
    /// When it was reversed.
    pub reversed_at: DateTime<Utc>,
    /// Mirror transaction, already in posted state. `None` for pending originals.
    pub mirror: Option<Transaction>,
    /// Deltas of the mirror. Empty when there is no mirror.
    pub deltas: Vec<BalanceDelta>,
}

/// Chart of accounts persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Looks up by code. Prefers the active account; falls back to the most
    /// recently updated inactive one.
    async fn find_account_by_code(&self, code: &str) -> StoreResult<Option<Account>>;

    /// Looks up by ID.
    async fn find_account_by_id(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// Batch variant of [`Self::find_account_by_code`]. Missing codes are omitted.
    async fn find_accounts_by_codes(&self, codes: &[String]) -> StoreResult<Vec<Account>>;

    /// Inserts unless an active account with the same code exists.
    ///
    /// Returns the stored account and whether this call created it.
    async fn insert_account_if_absent(&self, account: Account) -> StoreResult<(Account, bool)>;

    /// Marks an account inactive and returns it.
    async fn deactivate_account(&self, id: AccountId) -> StoreResult<Account>;

    /// All accounts ordered by code.
    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;
}

/// Transaction persistence.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts header and entries together.
    ///
    /// Fails with [`StoreError::UniqueViolation`] when a non-reversed
    /// transaction already holds the same `(source_module, source_transaction_id)`.
    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()>;

    /// Looks up by ID, entries included.
    async fn find_transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>>;

    /// The non-reversed transaction holding a source key, if any.
    async fn find_active_by_source(
        &self,
        module: SourceModule,
        source_transaction_id: &str,
    ) -> StoreResult<Option<Transaction>>;

    /// Every transaction with this source ID, across modules and statuses.
    async fn find_by_source_id(&self, source_transaction_id: &str) -> StoreResult<Vec<Transaction>>;

    /// Filtered listing, newest date first.
    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>>;

    /// Compare-and-set pending → posted plus the balance deltas.
    ///
    /// Fails with [`StoreError::StaleState`] if the transaction is no longer pending.
    async fn commit_posting(&self, posting: &Posting) -> StoreResult<()>;

    /// Marks the original reversed, inserts the mirror and applies its deltas.
    ///
    /// Fails with [`StoreError::StaleState`] if the original left `expected_status`.
    async fn commit_reversal(&self, reversal: &ReversalCommit) -> StoreResult<()>;
}

/// Balance reads.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Running balances, optionally for a single account.
    async fn current_balances(&self, account_id: Option<AccountId>) -> StoreResult<Vec<AccountBalance>>;

    /// Per-period deltas matching the query.
    async fn period_balances(&self, query: &BalanceQuery) -> StoreResult<Vec<PeriodBalance>>;
}

/// Append-only sync log persistence.
#[async_trait]
pub trait SyncLogStore: Send + Sync {
    /// Appends one entry.
    async fn append_sync_log(&self, entry: &SyncLogEntry) -> StoreResult<()>;

    /// Newest first.
    async fn list_sync_logs(&self, filter: &SyncLogFilter) -> StoreResult<Vec<SyncLogEntry>>;
}

/// Everything the general ledger needs from one backend.
pub trait Store: AccountStore + LedgerStore + BalanceStore + SyncLogStore {}

impl<T> Store for T where T: AccountStore + LedgerStore + BalanceStore + SyncLogStore {}

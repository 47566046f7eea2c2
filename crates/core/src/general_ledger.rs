//! The general ledger facade.
//!
//! Wires every service to one backend and exposes the operations callers
//! need: posting, queries, chart management, reporting and sync.

use std::sync::Arc;

use chrono::NaiveDate;
use tally_shared::types::TransactionId;

use crate::accounts::{Account, AccountRegistry, AccountTree, ChartAccount, SeedSummary};
use crate::balance::BalanceLedger;
use crate::ledger::{
    LedgerEngine, LedgerError, NewTransactionInput, Reversal, SourceModule, Transaction,
    TransactionFilter,
};
use crate::reports::{TrialBalanceReport, TrialBalanceReporter};
use crate::store::{AccountStore, BalanceStore, LedgerStore, Store, SyncLogStore};
use crate::sync::{MappingTable, SourceFeed, SyncCoordinator, SyncLog, SyncLogEntry, SyncStatus};

/// Every general ledger service over a single store.
#[derive(Clone)]
pub struct GeneralLedger {
    accounts: AccountRegistry,
    engine: LedgerEngine,
    balances: BalanceLedger,
    reporter: TrialBalanceReporter,
    sync_log: SyncLog,
}

impl GeneralLedger {
    /// Builds the services over `store`.
    #[must_use]
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: Store + 'static,
    {
        Self::from_parts(store.clone(), store.clone(), store.clone(), store)
    }

    /// Builds the services over one backend per concern.
    #[must_use]
    pub fn from_parts(
        accounts: Arc<dyn AccountStore>,
        transactions: Arc<dyn LedgerStore>,
        balances: Arc<dyn BalanceStore>,
        sync_logs: Arc<dyn SyncLogStore>,
    ) -> Self {
        let balances = BalanceLedger::new(balances);
        Self {
            accounts: AccountRegistry::new(accounts.clone()),
            engine: LedgerEngine::new(accounts.clone(), transactions),
            reporter: TrialBalanceReporter::new(accounts, balances.clone()),
            balances,
            sync_log: SyncLog::new(sync_logs),
        }
    }

    /// Account registry.
    #[must_use]
    pub const fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    /// Transaction engine.
    #[must_use]
    pub const fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Balance ledger.
    #[must_use]
    pub const fn balances(&self) -> &BalanceLedger {
        &self.balances
    }

    /// Sync log.
    #[must_use]
    pub const fn sync_log(&self) -> &SyncLog {
        &self.sync_log
    }

    /// Builds a coordinator for a synced module.
    ///
    /// # Errors
    ///
    /// `Mapping` for a module without a mapping table (`manual`).
    pub fn coordinator(
        &self,
        module: SourceModule,
        feed: Arc<dyn SourceFeed>,
        actor: impl Into<String>,
    ) -> Result<SyncCoordinator, LedgerError> {
        let table = MappingTable::for_module(module).ok_or_else(|| LedgerError::Mapping {
            module,
            transaction_type: "*".to_string(),
        })?;
        Ok(SyncCoordinator::new(
            table,
            feed,
            self.engine.clone(),
            self.sync_log.clone(),
            actor,
        ))
    }

    // ========== Transactions ==========

    /// See [`LedgerEngine::create_transaction`].
    ///
    /// # Errors
    ///
    /// Validation, duplicate and storage errors.
    pub async fn create_transaction(
        &self,
        input: NewTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        self.engine.create_transaction(input).await
    }

    /// See [`LedgerEngine::post_transaction`].
    ///
    /// # Errors
    ///
    /// Not found, invalid state and storage errors.
    pub async fn post_transaction(
        &self,
        id: TransactionId,
        posted_by: &str,
    ) -> Result<Transaction, LedgerError> {
        self.engine.post_transaction(id, posted_by).await
    }

    /// See [`LedgerEngine::reverse_transaction`].
    ///
    /// # Errors
    ///
    /// Not found, invalid state and storage errors.
    pub async fn reverse_transaction(
        &self,
        id: TransactionId,
        reversed_by: &str,
    ) -> Result<Reversal, LedgerError> {
        self.engine.reverse_transaction(id, reversed_by).await
    }

    /// See [`LedgerEngine::get_transaction_by_id`].
    ///
    /// # Errors
    ///
    /// `TransactionNotFound` or storage errors.
    pub async fn get_transaction_by_id(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.engine.get_transaction_by_id(id).await
    }

    /// See [`LedgerEngine::get_transactions_by_source_id`].
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub async fn get_transactions_by_source_id(
        &self,
        source_transaction_id: &str,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.engine.get_transactions_by_source_id(source_transaction_id).await
    }

    /// See [`LedgerEngine::list_transactions`].
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.engine.list_transactions(filter).await
    }

    // ========== Accounts ==========

    /// Seeds a chart of accounts.
    ///
    /// # Errors
    ///
    /// Validation and storage errors.
    pub async fn ensure_required_accounts_exist(
        &self,
        chart: &[ChartAccount],
    ) -> Result<SeedSummary, LedgerError> {
        self.accounts.ensure_required_accounts_exist(chart).await
    }

    /// All accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.accounts.list_accounts().await
    }

    /// Accounts grouped by type as trees.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub async fn get_account_tree(&self) -> Result<AccountTree, LedgerError> {
        self.accounts.get_account_tree().await
    }

    // ========== Reporting ==========

    /// Trial balance, current or as of a date.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub async fn get_trial_balance(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<TrialBalanceReport, LedgerError> {
        self.reporter.get_trial_balance(as_of).await
    }

    /// Sync log entries, newest first.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub async fn list_sync_logs(
        &self,
        limit: u64,
        module: Option<SourceModule>,
        status: Option<SyncStatus>,
    ) -> Result<Vec<SyncLogEntry>, LedgerError> {
        self.sync_log.list_sync_logs(limit, module, status).await
    }
}

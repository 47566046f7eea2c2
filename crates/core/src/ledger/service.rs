//! Ledger transaction engine.
//!
//! Orchestrates validation, account resolution, persistence and the balance
//! ledger for create, post and reverse. All writes go through the injected
//! stores, each call being one unit of work.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tally_shared::types::TransactionId;
use tracing::{debug, info, instrument};

use super::error::{LedgerError, ValidationError};
use super::reversal::ReversalService;
use super::types::{
    NewTransactionInput, Reversal, Transaction, TransactionFilter, TransactionStatus,
};
use super::validation::{resolve_entries, validate_entries};
use crate::accounts::Account;
use crate::balance::BalanceLedger;
use crate::store::{AccountStore, LedgerStore, Posting, ReversalCommit, StoreError};

/// Creates, posts and reverses journal transactions.
#[derive(Clone)]
pub struct LedgerEngine {
    accounts: Arc<dyn AccountStore>,
    transactions: Arc<dyn LedgerStore>,
}

impl LedgerEngine {
    /// Creates an engine over the given stores.
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>, transactions: Arc<dyn LedgerStore>) -> Self {
        Self {
            accounts,
            transactions,
        }
    }

    /// Validates and stores a new pending transaction.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed entries or unknown/inactive accounts
    /// - `DuplicateSource` if a non-reversed transaction holds the same source key
    /// - `Storage` for backend failures
    #[instrument(
        skip(self, input),
        fields(module = %input.source_module, source_id = %input.source_transaction_id)
    )]
    pub async fn create_transaction(
        &self,
        input: NewTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        if input.source_transaction_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("source_transaction_id").into());
        }
        validate_entries(&input.entries)?;

        let mut codes: Vec<String> = input.entries.iter().map(|e| e.account_code.clone()).collect();
        codes.sort();
        codes.dedup();
        let accounts = self.accounts.find_accounts_by_codes(&codes).await?;
        let by_code: HashMap<&str, &Account> =
            accounts.iter().map(|a| (a.code.as_str(), a)).collect();

        let id = TransactionId::new();
        let entries = resolve_entries(id, &input.entries, |code| by_code.get(code).copied())?;

        if let Some(existing) = self
            .transactions
            .find_active_by_source(input.source_module, &input.source_transaction_id)
            .await?
        {
            return Err(LedgerError::DuplicateSource {
                module: input.source_module,
                source_transaction_id: input.source_transaction_id,
                existing: Some(existing.id),
            });
        }

        let transaction = Transaction {
            id,
            date: input.date,
            source_module: input.source_module,
            source_transaction_id: input.source_transaction_id,
            source_transaction_type: input.source_transaction_type,
            description: input.description,
            entries,
            status: TransactionStatus::Pending,
            created_by: input.created_by,
            created_at: Utc::now(),
            posted_by: None,
            posted_at: None,
            reversed_by: None,
            reversed_at: None,
            reverses_transaction_id: None,
            reversed_by_transaction_id: None,
            branch_id: input.branch_id,
            metadata: input.metadata,
        };

        match self.transactions.insert_transaction(&transaction).await {
            Ok(()) => {}
            // Lost a race with a concurrent writer; same outcome as the pre-check.
            Err(StoreError::UniqueViolation { .. }) => {
                let existing = self
                    .transactions
                    .find_active_by_source(transaction.source_module, &transaction.source_transaction_id)
                    .await?
                    .map(|t| t.id);
                return Err(LedgerError::DuplicateSource {
                    module: transaction.source_module,
                    source_transaction_id: transaction.source_transaction_id,
                    existing,
                });
            }
            Err(err) => return Err(err.into()),
        }

        debug!(transaction_id = %transaction.id, "transaction created");
        Ok(transaction)
    }

    /// Posts a pending transaction and applies its balance deltas atomically.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the ID is unknown
    /// - `InvalidState` unless the transaction is pending, including when a
    ///   concurrent caller posted it first
    #[instrument(skip(self))]
    pub async fn post_transaction(
        &self,
        id: TransactionId,
        posted_by: &str,
    ) -> Result<Transaction, LedgerError> {
        let mut transaction = self.require(id).await?;
        if !transaction.status.can_post() {
            return Err(LedgerError::InvalidState {
                id,
                expected: TransactionStatus::Pending,
                actual: transaction.status,
            });
        }

        let posting = Posting {
            transaction_id: id,
            posted_by: posted_by.to_string(),
            posted_at: Utc::now(),
            deltas: BalanceLedger::apply_entries(&transaction.entries, transaction.date),
        };

        if let Err(err) = self.transactions.commit_posting(&posting).await {
            return Err(self.stale_to_invalid_state(id, TransactionStatus::Pending, err).await);
        }

        transaction.status = TransactionStatus::Posted;
        transaction.posted_by = Some(posting.posted_by);
        transaction.posted_at = Some(posting.posted_at);
        debug!(transaction_id = %id, deltas = posting.deltas.len(), "transaction posted");
        Ok(transaction)
    }

    /// Reverses a transaction.
    ///
    /// A posted original gets a posted mirror with debits and credits swapped;
    /// a pending original is simply marked reversed.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the ID is unknown
    /// - `InvalidState` if it is already reversed
    #[instrument(skip(self))]
    pub async fn reverse_transaction(
        &self,
        id: TransactionId,
        reversed_by: &str,
    ) -> Result<Reversal, LedgerError> {
        let mut original = self.require(id).await?;
        if !original.status.can_reverse() {
            return Err(LedgerError::InvalidState {
                id,
                expected: TransactionStatus::Posted,
                actual: original.status,
            });
        }

        let reversed_at = Utc::now();
        let mirror = (original.status == TransactionStatus::Posted)
            .then(|| ReversalService::create_mirror(&original, reversed_by, reversed_at));
        let deltas = mirror
            .as_ref()
            .map(|m| BalanceLedger::apply_entries(&m.entries, m.date))
            .unwrap_or_default();

        let commit = ReversalCommit {
            original_id: id,
            expected_status: original.status,
            reversed_by: reversed_by.to_string(),
            reversed_at,
            mirror,
            deltas,
        };

        if let Err(err) = self.transactions.commit_reversal(&commit).await {
            return Err(self.stale_to_invalid_state(id, original.status, err).await);
        }

        original.status = TransactionStatus::Reversed;
        original.reversed_by = Some(commit.reversed_by);
        original.reversed_at = Some(reversed_at);
        original.reversed_by_transaction_id = commit.mirror.as_ref().map(|m| m.id);

        info!(
            transaction_id = %id,
            mirror_id = ?original.reversed_by_transaction_id,
            "transaction reversed"
        );
        Ok(Reversal {
            original,
            mirror: commit.mirror,
        })
    }

    /// Looks up a transaction by ID.
    ///
    /// # Errors
    ///
    /// `TransactionNotFound` if the ID is unknown.
    pub async fn get_transaction_by_id(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.require(id).await
    }

    /// Every transaction recorded for an upstream ID, across modules and statuses.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn get_transactions_by_source_id(
        &self,
        source_transaction_id: &str,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.transactions.find_by_source_id(source_transaction_id).await?)
    }

    /// Filtered listing, newest date first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.transactions.list_transactions(filter).await?)
    }

    async fn require(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.transactions
            .find_transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// Maps a lost compare-and-set onto the status that won.
    async fn stale_to_invalid_state(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
        err: StoreError,
    ) -> LedgerError {
        if !matches!(err, StoreError::StaleState(_)) {
            return err.into();
        }
        match self.transactions.find_transaction(id).await {
            Ok(Some(current)) => LedgerError::InvalidState {
                id,
                expected,
                actual: current.status,
            },
            Ok(None) => LedgerError::TransactionNotFound(id),
            Err(read_err) => read_err.into(),
        }
    }
}

//! In-memory store.
//!
//! All state sits behind one async mutex, so every trait call is serialized
//! and atomic. Enforces the same constraints as the PostgreSQL schema: active
//! account codes and non-reversed source keys are unique, entries reference
//! existing accounts, and sync log entries are never modified.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TransactionId};
use tokio::sync::Mutex;

use super::{
    AccountStore, BalanceStore, LedgerStore, Posting, ReversalCommit, StoreError, StoreResult,
    SyncLogStore,
};
use crate::accounts::Account;
use crate::balance::{AccountBalance, BalanceDelta, BalanceQuery, PeriodBalance, PeriodKey};
use crate::ledger::{SourceModule, Transaction, TransactionFilter, TransactionStatus};
use crate::sync::{SyncLogEntry, SyncLogFilter};

const UQ_SOURCE_KEY: &str = "uq_transactions_active_source";

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    transactions: HashMap<TransactionId, Transaction>,
    period_balances: BTreeMap<(AccountId, PeriodKey), Decimal>,
    sync_logs: Vec<SyncLogEntry>,
}

impl State {
    fn source_key_taken(&self, module: SourceModule, source_id: &str) -> bool {
        self.transactions.values().any(|t| {
            t.source_module == module
                && t.source_transaction_id == source_id
                && t.status != TransactionStatus::Reversed
        })
    }

    fn check_new_transaction(&self, tx: &Transaction) -> StoreResult<()> {
        if self.transactions.contains_key(&tx.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "transactions_pkey".to_string(),
            });
        }
        if self.source_key_taken(tx.source_module, &tx.source_transaction_id) {
            return Err(StoreError::UniqueViolation {
                constraint: UQ_SOURCE_KEY.to_string(),
            });
        }
        if let Some(entry) = tx.entries.iter().find(|e| !self.accounts.contains_key(&e.account_id)) {
            return Err(StoreError::NotFound(format!("account {}", entry.account_id)));
        }
        Ok(())
    }

    fn check_deltas(&self, deltas: &[BalanceDelta]) -> StoreResult<()> {
        match deltas.iter().find(|d| !self.accounts.contains_key(&d.account_id)) {
            Some(d) => Err(StoreError::NotFound(format!("account {}", d.account_id))),
            None => Ok(()),
        }
    }

    fn apply_deltas(&mut self, deltas: &[BalanceDelta]) {
        let now = Utc::now();
        for delta in deltas {
            if let Some(account) = self.accounts.get_mut(&delta.account_id) {
                account.balance += delta.amount;
                account.updated_at = now;
            }
            *self
                .period_balances
                .entry((delta.account_id, delta.period))
                .or_insert(Decimal::ZERO) += delta.amount;
        }
    }

    fn find_by_code(&self, code: &str) -> Option<&Account> {
        self.accounts
            .values()
            .filter(|a| a.code == code)
            .max_by_key(|a| (a.is_active, a.updated_at))
    }
}

/// Store backed by process memory. Used by tests and local tooling.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account_by_code(&self, code: &str) -> StoreResult<Option<Account>> {
        Ok(self.state.lock().await.find_by_code(code).cloned())
    }

    async fn find_account_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(&id).cloned())
    }

    async fn find_accounts_by_codes(&self, codes: &[String]) -> StoreResult<Vec<Account>> {
        let state = self.state.lock().await;
        Ok(codes
            .iter()
            .filter_map(|code| state.find_by_code(code).cloned())
            .collect())
    }

    async fn insert_account_if_absent(&self, account: Account) -> StoreResult<(Account, bool)> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .accounts
            .values()
            .find(|a| a.is_active && a.code == account.code)
        {
            return Ok((existing.clone(), false));
        }
        if let Some(parent) = account.parent_id
            && !state.accounts.contains_key(&parent)
        {
            return Err(StoreError::NotFound(format!("parent account {parent}")));
        }
        if state.accounts.contains_key(&account.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "chart_of_accounts_pkey".to_string(),
            });
        }
        state.accounts.insert(account.id, account.clone());
        Ok((account, true))
    }

    async fn deactivate_account(&self, id: AccountId) -> StoreResult<Account> {
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")))?;
        if account.is_active {
            account.is_active = false;
            account.updated_at = Utc::now();
        }
        Ok(account.clone())
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let state = self.state.lock().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code).then(a.created_at.cmp(&b.created_at)));
        Ok(accounts)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check_new_transaction(transaction)?;
        state.transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn find_transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        Ok(self.state.lock().await.transactions.get(&id).cloned())
    }

    async fn find_active_by_source(
        &self,
        module: SourceModule,
        source_transaction_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .values()
            .find(|t| {
                t.source_module == module
                    && t.source_transaction_id == source_transaction_id
                    && t.status != TransactionStatus::Reversed
            })
            .cloned())
    }

    async fn find_by_source_id(&self, source_transaction_id: &str) -> StoreResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        let mut found: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| t.source_transaction_id == source_transaction_id)
            .cloned()
            .collect();
        found.sort_by_key(|t| t.created_at);
        Ok(found)
    }

    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        let mut found: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(found)
    }

    async fn commit_posting(&self, posting: &Posting) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let status = state
            .transactions
            .get(&posting.transaction_id)
            .map(|t| t.status)
            .ok_or_else(|| StoreError::NotFound(format!("transaction {}", posting.transaction_id)))?;
        if status != TransactionStatus::Pending {
            return Err(StoreError::StaleState(format!(
                "transaction {} is {status}",
                posting.transaction_id
            )));
        }
        state.check_deltas(&posting.deltas)?;

        if let Some(tx) = state.transactions.get_mut(&posting.transaction_id) {
            tx.status = TransactionStatus::Posted;
            tx.posted_by = Some(posting.posted_by.clone());
            tx.posted_at = Some(posting.posted_at);
        }
        state.apply_deltas(&posting.deltas);
        Ok(())
    }

    async fn commit_reversal(&self, reversal: &ReversalCommit) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let status = state
            .transactions
            .get(&reversal.original_id)
            .map(|t| t.status)
            .ok_or_else(|| StoreError::NotFound(format!("transaction {}", reversal.original_id)))?;
        if status != reversal.expected_status {
            return Err(StoreError::StaleState(format!(
                "transaction {} is {status}",
                reversal.original_id
            )));
        }
        state.check_deltas(&reversal.deltas)?;
        if let Some(mirror) = &reversal.mirror {
            state.check_new_transaction(mirror)?;
        }

        if let Some(original) = state.transactions.get_mut(&reversal.original_id) {
            original.status = TransactionStatus::Reversed;
            original.reversed_by = Some(reversal.reversed_by.clone());
            original.reversed_at = Some(reversal.reversed_at);
            original.reversed_by_transaction_id = reversal.mirror.as_ref().map(|m| m.id);
        }
        if let Some(mirror) = &reversal.mirror {
            state.transactions.insert(mirror.id, mirror.clone());
        }
        state.apply_deltas(&reversal.deltas);
        Ok(())
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn current_balances(&self, account_id: Option<AccountId>) -> StoreResult<Vec<AccountBalance>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .filter(|a| account_id.is_none_or(|id| a.id == id))
            .map(|a| AccountBalance {
                account_id: a.id,
                balance: a.balance,
            })
            .collect())
    }

    async fn period_balances(&self, query: &BalanceQuery) -> StoreResult<Vec<PeriodBalance>> {
        let state = self.state.lock().await;
        Ok(state
            .period_balances
            .iter()
            .filter(|((account_id, period), _)| {
                query.account_id.is_none_or(|id| *account_id == id)
                    && query.through.is_none_or(|through| *period <= through)
            })
            .map(|(&(account_id, period), &delta)| PeriodBalance {
                account_id,
                period,
                delta,
            })
            .collect())
    }
}

#[async_trait]
impl SyncLogStore for MemoryStore {
    async fn append_sync_log(&self, entry: &SyncLogEntry) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.sync_logs.iter().any(|e| e.id == entry.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "sync_logs_pkey".to_string(),
            });
        }
        state.sync_logs.push(entry.clone());
        Ok(())
    }

    async fn list_sync_logs(&self, filter: &SyncLogFilter) -> StoreResult<Vec<SyncLogEntry>> {
        let state = self.state.lock().await;
        let limit = usize::try_from(filter.limit).unwrap_or(usize::MAX);
        Ok(state
            .sync_logs
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountType;
    use crate::ledger::Entry;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tally_shared::types::EntryId;

    fn pending(module: SourceModule, source_id: &str, accounts: &[&Account]) -> Transaction {
        let id = TransactionId::new();
        let entries = accounts
            .iter()
            .enumerate()
            .map(|(i, a)| Entry {
                id: EntryId::new(),
                transaction_id: id,
                account_id: a.id,
                account_code: a.code.clone(),
                debit: if i == 0 { dec!(10) } else { Decimal::ZERO },
                credit: if i == 0 { Decimal::ZERO } else { dec!(10) },
                description: None,
            })
            .collect();
        Transaction {
            id,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            source_module: module,
            source_transaction_id: source_id.to_string(),
            source_transaction_type: "cash-in".to_string(),
            description: String::new(),
            entries,
            status: TransactionStatus::Pending,
            created_by: "test".to_string(),
            created_at: Utc::now(),
            posted_by: None,
            posted_at: None,
            reversed_by: None,
            reversed_at: None,
            reverses_transaction_id: None,
            reversed_by_transaction_id: None,
            branch_id: None,
            metadata: serde_json::Value::Null,
        }
    }

    async fn seeded() -> (MemoryStore, Account, Account) {
        let store = MemoryStore::new();
        let (cash, _) = store
            .insert_account_if_absent(Account::new("1010", "Cash", AccountType::Asset, None))
            .await
            .unwrap();
        let (wallets, _) = store
            .insert_account_if_absent(Account::new("2010", "Wallets", AccountType::Liability, None))
            .await
            .unwrap();
        (store, cash, wallets)
    }

    #[tokio::test]
    async fn test_source_key_unique_among_non_reversed() {
        let (store, cash, wallets) = seeded().await;
        let first = pending(SourceModule::Momo, "M-1", &[&cash, &wallets]);
        store.insert_transaction(&first).await.unwrap();

        let again = pending(SourceModule::Momo, "M-1", &[&cash, &wallets]);
        let err = store.insert_transaction(&again).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref constraint } if constraint == UQ_SOURCE_KEY));

        // Same ID in another module is a different key.
        let other_module = pending(SourceModule::Expenses, "M-1", &[&cash, &wallets]);
        store.insert_transaction(&other_module).await.unwrap();

        // Reversal frees the key.
        store
            .commit_reversal(&ReversalCommit {
                original_id: first.id,
                expected_status: TransactionStatus::Pending,
                reversed_by: "test".to_string(),
                reversed_at: Utc::now(),
                mirror: None,
                deltas: vec![],
            })
            .await
            .unwrap();
        store.insert_transaction(&again).await.unwrap();
    }

    #[tokio::test]
    async fn test_posting_is_compare_and_set() {
        let (store, cash, wallets) = seeded().await;
        let tx = pending(SourceModule::Momo, "M-2", &[&cash, &wallets]);
        store.insert_transaction(&tx).await.unwrap();

        let posting = Posting {
            transaction_id: tx.id,
            posted_by: "test".to_string(),
            posted_at: Utc::now(),
            deltas: crate::balance::BalanceLedger::apply_entries(&tx.entries, tx.date),
        };
        store.commit_posting(&posting).await.unwrap();
        let err = store.commit_posting(&posting).await.unwrap_err();
        assert!(matches!(err, StoreError::StaleState(_)));

        let cash_now = store.find_account_by_id(cash.id).await.unwrap().unwrap();
        assert_eq!(cash_now.balance, dec!(10));
    }

    #[tokio::test]
    async fn test_insert_account_if_absent_is_idempotent() {
        let store = MemoryStore::new();
        let (first, created) = store
            .insert_account_if_absent(Account::new("1010", "Cash", AccountType::Asset, None))
            .await
            .unwrap();
        assert!(created);
        let (second, created) = store
            .insert_account_if_absent(Account::new("1010", "Cash again", AccountType::Asset, None))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Cash");
    }

    #[tokio::test]
    async fn test_reused_account_id_is_a_key_violation() {
        let store = MemoryStore::new();
        let (cash, _) = store
            .insert_account_if_absent(Account::new("1010", "Cash", AccountType::Asset, None))
            .await
            .unwrap();
        let mut clash = Account::new("1020", "Petty cash", AccountType::Asset, None);
        clash.id = cash.id;

        let err = store.insert_account_if_absent(clash).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation {
                constraint: "chart_of_accounts_pkey".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_entries_must_reference_known_accounts() {
        let (store, cash, _) = seeded().await;
        let ghost = Account::new("9999", "Ghost", AccountType::Asset, None);
        let tx = pending(SourceModule::Manual, "J-1", &[&cash, &ghost]);
        let err = store.insert_transaction(&tx).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}

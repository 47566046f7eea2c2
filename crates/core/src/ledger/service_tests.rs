//! Engine tests against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::types::TransactionId;

use super::error::{LedgerError, ValidationError};
use super::types::{EntryInput, NewTransactionInput, SourceModule, Transaction, TransactionFilter, TransactionStatus};
use super::LedgerEngine;
use crate::accounts::{AccountRegistry, CANONICAL_CHART};
use crate::accounts::chart::{BANK_OPERATING, CASH_ON_HAND, MOMO_FEE_INCOME, SALARIES};
use crate::balance::BalanceLedger;
use crate::store::{
    AccountStore, LedgerStore, MemoryStore, Posting, ReversalCommit, StoreResult,
};

// ============================================================================
// Fixtures
// ============================================================================

struct Harness {
    store: Arc<MemoryStore>,
    engine: LedgerEngine,
    registry: AccountRegistry,
    balances: BalanceLedger,
}

impl Harness {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let registry = AccountRegistry::new(store.clone());
        registry
            .ensure_required_accounts_exist(CANONICAL_CHART)
            .await
            .unwrap();
        Self {
            engine: LedgerEngine::new(store.clone(), store.clone()),
            balances: BalanceLedger::new(store.clone()),
            registry,
            store,
        }
    }

    async fn balance(&self, code: &str) -> Decimal {
        let account = self.registry.get_by_code(code).await.unwrap();
        self.balances.current_balance(account.id).await.unwrap()
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn input(source_id: &str, amount: Decimal) -> NewTransactionInput {
    NewTransactionInput {
        date: date(2024, 3, 15),
        source_module: SourceModule::Manual,
        source_transaction_id: source_id.to_string(),
        source_transaction_type: "journal".to_string(),
        description: "cash sale".to_string(),
        entries: vec![
            EntryInput::debit(CASH_ON_HAND, amount),
            EntryInput::credit(MOMO_FEE_INCOME, amount),
        ],
        created_by: "accountant".to_string(),
        branch_id: None,
        metadata: serde_json::Value::Null,
    }
}

/// Hides existing source keys from the pre-check, as a concurrent writer would.
struct RacingStore(Arc<MemoryStore>);

#[async_trait]
impl LedgerStore for RacingStore {
    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        self.0.insert_transaction(transaction).await
    }
    async fn find_transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        self.0.find_transaction(id).await
    }
    async fn find_active_by_source(
        &self,
        _module: SourceModule,
        _source_transaction_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        Ok(None)
    }
    async fn find_by_source_id(&self, source_transaction_id: &str) -> StoreResult<Vec<Transaction>> {
        self.0.find_by_source_id(source_transaction_id).await
    }
    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        self.0.list_transactions(filter).await
    }
    async fn commit_posting(&self, posting: &Posting) -> StoreResult<()> {
        self.0.commit_posting(posting).await
    }
    async fn commit_reversal(&self, reversal: &ReversalCommit) -> StoreResult<()> {
        self.0.commit_reversal(reversal).await
    }
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_stores_pending_without_balance_effect() {
    let h = Harness::new().await;
    let tx = h.engine.create_transaction(input("J-1", dec!(100))).await.unwrap();

    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.entries.len(), 2);
    assert!(tx.is_balanced());
    assert_eq!(h.balance(CASH_ON_HAND).await, Decimal::ZERO);

    let stored = h.engine.get_transaction_by_id(tx.id).await.unwrap();
    assert_eq!(stored, tx);
}

#[tokio::test]
async fn test_create_rejects_unbalanced_and_writes_nothing() {
    let h = Harness::new().await;
    let mut bad = input("J-2", dec!(100));
    bad.entries[1].credit = dec!(90);

    let err = h.engine.create_transaction(bad).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Validation(ValidationError::Unbalanced { .. })
    ));
    assert!(h.engine.get_transactions_by_source_id("J-2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_unknown_and_inactive_accounts() {
    let h = Harness::new().await;

    let mut unknown = input("J-3", dec!(10));
    unknown.entries[0].account_code = "9999".to_string();
    let err = h.engine.create_transaction(unknown).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Validation(ValidationError::UnknownAccount(ref c)) if c == "9999"
    ));

    h.registry.deactivate(MOMO_FEE_INCOME).await.unwrap();
    let err = h.engine.create_transaction(input("J-4", dec!(10))).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Validation(ValidationError::InactiveAccount(_))
    ));
}

#[tokio::test]
async fn test_duplicate_source_rejected_without_side_effects() {
    let h = Harness::new().await;
    let first = h.engine.create_transaction(input("J-5", dec!(100))).await.unwrap();
    h.engine.post_transaction(first.id, "accountant").await.unwrap();

    let err = h
        .engine
        .create_transaction(input("J-5", dec!(100)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::DuplicateSource { existing: Some(id), .. } if id == first.id
    ));
    assert!(err.is_benign());

    assert_eq!(h.engine.get_transactions_by_source_id("J-5").await.unwrap().len(), 1);
    assert_eq!(h.balance(CASH_ON_HAND).await, dec!(100));
}

#[tokio::test]
async fn test_storage_constraint_maps_to_duplicate() {
    let h = Harness::new().await;
    let racing = LedgerEngine::new(h.store.clone(), Arc::new(RacingStore(h.store.clone())));

    racing.create_transaction(input("J-6", dec!(5))).await.unwrap();
    let err = racing
        .create_transaction(input("J-6", dec!(5)))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::DuplicateSource { .. }));
    assert_eq!(h.engine.get_transactions_by_source_id("J-6").await.unwrap().len(), 1);
}

// ============================================================================
// Post
// ============================================================================

#[tokio::test]
async fn test_post_moves_cash_and_revenue() {
    let h = Harness::new().await;
    let tx = h.engine.create_transaction(input("J-7", dec!(100))).await.unwrap();
    let posted = h.engine.post_transaction(tx.id, "controller").await.unwrap();

    assert_eq!(posted.status, TransactionStatus::Posted);
    assert_eq!(posted.posted_by.as_deref(), Some("controller"));
    assert!(posted.posted_at.is_some());
    assert_eq!(h.balance(CASH_ON_HAND).await, dec!(100));
    assert_eq!(h.balance(MOMO_FEE_INCOME).await, dec!(-100));
}

#[tokio::test]
async fn test_post_twice_is_invalid_state() {
    let h = Harness::new().await;
    let tx = h.engine.create_transaction(input("J-8", dec!(40))).await.unwrap();
    h.engine.post_transaction(tx.id, "a").await.unwrap();

    let err = h.engine.post_transaction(tx.id, "b").await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidState {
            expected: TransactionStatus::Pending,
            actual: TransactionStatus::Posted,
            ..
        }
    ));
    assert_eq!(h.balance(CASH_ON_HAND).await, dec!(40));
}

#[tokio::test]
async fn test_concurrent_posts_apply_once() {
    let h = Harness::new().await;
    let tx = h.engine.create_transaction(input("J-9", dec!(75))).await.unwrap();

    let (a, b) = tokio::join!(
        h.engine.post_transaction(tx.id, "a"),
        h.engine.post_transaction(tx.id, "b"),
    );
    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser, Err(LedgerError::InvalidState { .. })));
    assert_eq!(h.balance(CASH_ON_HAND).await, dec!(75));
}

#[tokio::test]
async fn test_post_unknown_transaction() {
    let h = Harness::new().await;
    let err = h
        .engine
        .post_transaction(TransactionId::new(), "a")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::TransactionNotFound(_)));
}

#[tokio::test]
async fn test_posted_ledger_stays_balanced() {
    let h = Harness::new().await;
    let amounts = [dec!(10.50), dec!(99.99), dec!(0.01), dec!(12345.67)];
    for (i, amount) in amounts.iter().enumerate() {
        let mut multi = input(&format!("J-M{i}"), *amount * dec!(2));
        multi.entries = vec![
            EntryInput::debit(CASH_ON_HAND, *amount),
            EntryInput::debit(SALARIES, *amount),
            EntryInput::credit(BANK_OPERATING, *amount * dec!(2)),
        ];
        let tx = h.engine.create_transaction(multi).await.unwrap();
        h.engine.post_transaction(tx.id, "a").await.unwrap();
    }

    let posted = h
        .engine
        .list_transactions(&TransactionFilter {
            status: Some(TransactionStatus::Posted),
            ..TransactionFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(posted.len(), amounts.len());
    assert!(posted.iter().all(Transaction::is_balanced));

    let net: Decimal = h.balances.snapshot(None).await.unwrap().values().copied().sum();
    assert_eq!(net, Decimal::ZERO);
}

// ============================================================================
// Reverse
// ============================================================================

#[tokio::test]
async fn test_reverse_posted_creates_mirror_and_restores_balances() {
    let h = Harness::new().await;
    let tx = h.engine.create_transaction(input("J-10", dec!(60))).await.unwrap();
    h.engine.post_transaction(tx.id, "a").await.unwrap();

    let reversal = h.engine.reverse_transaction(tx.id, "auditor").await.unwrap();
    let mirror = reversal.mirror.unwrap();

    assert_eq!(reversal.original.status, TransactionStatus::Reversed);
    assert_eq!(reversal.original.reversed_by.as_deref(), Some("auditor"));
    assert_eq!(reversal.original.reversed_by_transaction_id, Some(mirror.id));
    assert_eq!(mirror.status, TransactionStatus::Posted);
    assert_eq!(mirror.reverses_transaction_id, Some(tx.id));
    assert_eq!(h.balance(CASH_ON_HAND).await, Decimal::ZERO);
    assert_eq!(h.balance(MOMO_FEE_INCOME).await, Decimal::ZERO);

    let stored = h.engine.get_transaction_by_id(tx.id).await.unwrap();
    assert_eq!(stored.status, TransactionStatus::Reversed);
    assert_eq!(stored.reversed_by_transaction_id, Some(mirror.id));

    let err = h.engine.reverse_transaction(tx.id, "auditor").await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidState { actual: TransactionStatus::Reversed, .. }
    ));
}

#[tokio::test]
async fn test_reverse_pending_has_no_mirror() {
    let h = Harness::new().await;
    let tx = h.engine.create_transaction(input("J-11", dec!(30))).await.unwrap();

    let reversal = h.engine.reverse_transaction(tx.id, "auditor").await.unwrap();
    assert!(reversal.mirror.is_none());
    assert_eq!(reversal.original.status, TransactionStatus::Reversed);
    assert_eq!(h.balance(CASH_ON_HAND).await, Decimal::ZERO);

    let err = h.engine.post_transaction(tx.id, "a").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState { .. }));
}

#[tokio::test]
async fn test_reversal_frees_source_key() {
    let h = Harness::new().await;
    let first = h.engine.create_transaction(input("J-12", dec!(20))).await.unwrap();
    h.engine.post_transaction(first.id, "a").await.unwrap();
    h.engine.reverse_transaction(first.id, "a").await.unwrap();

    let second = h.engine.create_transaction(input("J-12", dec!(20))).await.unwrap();
    h.engine.post_transaction(second.id, "a").await.unwrap();
    h.engine.reverse_transaction(second.id, "a").await.unwrap();

    // Two originals and two mirrors, keyed apart.
    let all = h.engine.get_transactions_by_source_id("J-12").await.unwrap();
    assert_eq!(all.len(), 2);
    let mirrors = h
        .engine
        .list_transactions(&TransactionFilter {
            source_module: Some(SourceModule::Manual),
            status: Some(TransactionStatus::Posted),
            ..TransactionFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(mirrors.len(), 2);
    assert_eq!(h.balance(CASH_ON_HAND).await, Decimal::ZERO);
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_list_filters_and_orders_by_date_desc() {
    let h = Harness::new().await;
    for (i, day) in [5u32, 20, 12].iter().enumerate() {
        let mut tx = input(&format!("J-L{i}"), dec!(1));
        tx.date = date(2024, 4, *day);
        tx.branch_id = Some(if i == 0 { "BR-1" } else { "BR-2" }.to_string());
        h.engine.create_transaction(tx).await.unwrap();
    }

    let all = h.engine.list_transactions(&TransactionFilter::default()).await.unwrap();
    let days: Vec<_> = all.iter().map(|t| t.date).collect();
    assert_eq!(days, vec![date(2024, 4, 20), date(2024, 4, 12), date(2024, 4, 5)]);

    let ranged = h
        .engine
        .list_transactions(&TransactionFilter {
            date_from: Some(date(2024, 4, 10)),
            date_to: Some(date(2024, 4, 15)),
            ..TransactionFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(ranged.len(), 1);

    let branch = h
        .engine
        .list_transactions(&TransactionFilter {
            branch_id: Some("BR-2".to_string()),
            ..TransactionFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(branch.len(), 2);

    let by_type = h
        .engine
        .list_transactions(&TransactionFilter {
            transaction_type: Some("cash-in".to_string()),
            ..TransactionFilter::default()
        })
        .await
        .unwrap();
    assert!(by_type.is_empty());
}

#[tokio::test]
async fn test_source_id_lookup_spans_modules() {
    let h = Harness::new().await;
    h.engine.create_transaction(input("X-1", dec!(1))).await.unwrap();
    let mut other = input("X-1", dec!(2));
    other.source_module = SourceModule::Expenses;
    h.engine.create_transaction(other).await.unwrap();

    let found = h.engine.get_transactions_by_source_id("X-1").await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_balance_as_of_uses_periods() {
    let h = Harness::new().await;
    for (i, (month, amount)) in [(1u32, dec!(100)), (2, dec!(50)), (3, dec!(25))].iter().enumerate() {
        let mut tx = input(&format!("J-P{i}"), *amount);
        tx.date = date(2024, *month, 10);
        let created = h.engine.create_transaction(tx).await.unwrap();
        h.engine.post_transaction(created.id, "a").await.unwrap();
    }
    let cash = h.registry.get_by_code(CASH_ON_HAND).await.unwrap();

    assert_eq!(h.balances.balance_as_of(cash.id, date(2023, 12, 31)).await.unwrap(), Decimal::ZERO);
    assert_eq!(h.balances.balance_as_of(cash.id, date(2024, 1, 1)).await.unwrap(), dec!(100));
    assert_eq!(h.balances.balance_as_of(cash.id, date(2024, 2, 28)).await.unwrap(), dec!(150));
    assert_eq!(h.balances.current_balance(cash.id).await.unwrap(), dec!(175));
    assert_eq!(
        h.store.find_account_by_id(cash.id).await.unwrap().unwrap().balance,
        dec!(175)
    );
}

//! Tests for trial balance generation.

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::service::{BALANCE_EPSILON, ReportService};
use crate::GeneralLedger;
use crate::accounts::chart::{CASH_ON_HAND, MOMO_FEE_INCOME};
use crate::accounts::{Account, AccountType, CANONICAL_CHART, NormalBalance};
use crate::balance::BalanceSnapshot;
use crate::ledger::{EntryInput, NewTransactionInput, SourceModule};
use crate::store::MemoryStore;

fn account(code: &str, account_type: AccountType) -> Account {
    Account::new(code, format!("Account {code}"), account_type, None)
}

fn account_type_strategy() -> impl Strategy<Value = AccountType> {
    prop_oneof![
        Just(AccountType::Asset),
        Just(AccountType::Liability),
        Just(AccountType::Equity),
        Just(AccountType::Revenue),
        Just(AccountType::Expense),
    ]
}

/// Signed balances that sum to zero, like any posted ledger produces.
fn zero_sum_balances() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec((-1_000_000i64..1_000_000i64).prop_map(|c| Decimal::new(c, 2)), 1..12)
        .prop_map(|mut balances| {
            let sum: Decimal = balances.iter().copied().sum();
            balances.push(-sum);
            balances
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A ledger whose balances net to zero always yields a balanced report.
    #[test]
    fn prop_zero_sum_ledger_is_balanced(
        balances in zero_sum_balances(),
        types in prop::collection::vec(account_type_strategy(), 13),
    ) {
        let accounts: Vec<Account> = balances
            .iter()
            .enumerate()
            .map(|(i, _)| account(&format!("{:04}", 1000 + i), types[i]))
            .collect();
        let snapshot: BalanceSnapshot = accounts
            .iter()
            .zip(&balances)
            .map(|(a, b)| (a.id, *b))
            .collect();

        let report = ReportService::generate_trial_balance(&accounts, &snapshot, None);
        prop_assert!(report.totals.is_balanced);
        prop_assert_eq!(report.totals.total_debit, report.totals.total_credit);
    }

    /// Each line puts its balance in exactly one column.
    #[test]
    fn prop_line_columns_are_one_sided(balances in zero_sum_balances()) {
        let accounts: Vec<Account> = (0..balances.len())
            .map(|i| account(&format!("{:04}", 2000 + i), AccountType::Liability))
            .collect();
        let snapshot: BalanceSnapshot = accounts
            .iter()
            .zip(&balances)
            .map(|(a, b)| (a.id, *b))
            .collect();

        let report = ReportService::generate_trial_balance(&accounts, &snapshot, None);
        for line in &report.lines {
            prop_assert!(line.debit >= Decimal::ZERO && line.credit >= Decimal::ZERO);
            prop_assert!(line.debit == Decimal::ZERO || line.credit == Decimal::ZERO);
            prop_assert_eq!(line.debit - line.credit, line.balance);
        }
    }
}

#[test]
fn test_cash_and_revenue_columns() {
    let cash = account("1010", AccountType::Asset);
    let revenue = account("4010", AccountType::Revenue);
    let snapshot: BalanceSnapshot = [(cash.id, dec!(100)), (revenue.id, dec!(-100))]
        .into_iter()
        .collect();

    let report =
        ReportService::generate_trial_balance(&[revenue.clone(), cash.clone()], &snapshot, None);

    assert_eq!(report.lines[0].code, "1010");
    assert_eq!(report.lines[0].debit, dec!(100));
    assert_eq!(report.lines[0].credit, Decimal::ZERO);
    assert_eq!(report.lines[0].normal_balance, NormalBalance::Debit);
    assert_eq!(report.lines[0].natural_balance, dec!(100));

    assert_eq!(report.lines[1].code, "4010");
    assert_eq!(report.lines[1].debit, Decimal::ZERO);
    assert_eq!(report.lines[1].credit, dec!(100));
    assert_eq!(report.lines[1].normal_balance, NormalBalance::Credit);
    assert_eq!(report.lines[1].natural_balance, dec!(100));

    assert!(report.totals.is_balanced);
    assert_eq!(report.totals.difference, Decimal::ZERO);
}

#[test]
fn test_imbalance_is_reported_not_raised() {
    let cash = account("1010", AccountType::Asset);
    let snapshot: BalanceSnapshot = [(cash.id, dec!(25))].into_iter().collect();
    let report = ReportService::generate_trial_balance(&[cash], &snapshot, None);
    assert!(!report.totals.is_balanced);
    assert_eq!(report.totals.difference, dec!(25));
}

#[test]
fn test_sub_epsilon_difference_is_balanced() {
    let a = account("1010", AccountType::Asset);
    let b = account("2010", AccountType::Liability);
    let snapshot: BalanceSnapshot = [(a.id, dec!(10.00005)), (b.id, dec!(-10))]
        .into_iter()
        .collect();
    let report = ReportService::generate_trial_balance(&[a, b], &snapshot, None);
    assert!(report.totals.difference < BALANCE_EPSILON);
    assert!(report.totals.is_balanced);
}

#[test]
fn test_inactive_accounts_and_missing_balances() {
    let active = account("1010", AccountType::Asset);
    let mut inactive = account("1099", AccountType::Asset);
    inactive.is_active = false;
    let report = ReportService::generate_trial_balance(
        &[active, inactive],
        &BalanceSnapshot::new(),
        NaiveDate::from_ymd_opt(2024, 1, 31),
    );
    assert_eq!(report.lines.len(), 1);
    assert_eq!(report.lines[0].balance, Decimal::ZERO);
    assert_eq!(report.as_of, NaiveDate::from_ymd_opt(2024, 1, 31));
}

#[test]
fn test_inactive_account_with_balance_still_listed() {
    let cash = account("1010", AccountType::Asset);
    let mut retired = account("2099", AccountType::Liability);
    retired.is_active = false;
    let snapshot: BalanceSnapshot = [(cash.id, dec!(40)), (retired.id, dec!(-40))]
        .into_iter()
        .collect();
    let report = ReportService::generate_trial_balance(&[cash, retired], &snapshot, None);
    assert_eq!(report.lines.len(), 2);
    assert!(report.totals.is_balanced);
}

#[tokio::test]
async fn test_trial_balance_as_of_month_end_ignores_later_postings() {
    let gl = GeneralLedger::new(Arc::new(MemoryStore::new()));
    gl.ensure_required_accounts_exist(CANONICAL_CHART).await.unwrap();

    for (source_id, date, amount) in [
        ("J-0120", NaiveDate::from_ymd_opt(2024, 1, 20), dec!(100)),
        ("J-0203", NaiveDate::from_ymd_opt(2024, 2, 3), dec!(40)),
    ] {
        let tx = gl
            .create_transaction(NewTransactionInput {
                date: date.unwrap(),
                source_module: SourceModule::Manual,
                source_transaction_id: source_id.to_string(),
                source_transaction_type: "journal".to_string(),
                description: "fee collection".to_string(),
                entries: vec![
                    EntryInput::debit(CASH_ON_HAND, amount),
                    EntryInput::credit(MOMO_FEE_INCOME, amount),
                ],
                created_by: "accountant".to_string(),
                branch_id: None,
                metadata: serde_json::Value::Null,
            })
            .await
            .unwrap();
        gl.post_transaction(tx.id, "accountant").await.unwrap();
    }

    let january = gl
        .get_trial_balance(NaiveDate::from_ymd_opt(2024, 1, 31))
        .await
        .unwrap();
    assert!(january.totals.is_balanced);
    assert_eq!(january.totals.total_debit, dec!(100));
    assert_eq!(january.totals.total_credit, dec!(100));
    let cash = january.lines.iter().find(|l| l.code == CASH_ON_HAND).unwrap();
    assert_eq!(cash.debit, dec!(100));
    let fees = january.lines.iter().find(|l| l.code == MOMO_FEE_INCOME).unwrap();
    assert_eq!(fees.credit, dec!(100));
    assert_eq!(fees.natural_balance, dec!(100));

    let current = gl.get_trial_balance(None).await.unwrap();
    assert!(current.totals.is_balanced);
    assert_eq!(current.totals.total_debit, dec!(140));
}

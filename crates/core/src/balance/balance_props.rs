//! Property-based tests for balance deltas.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, EntryId, TransactionId};

use super::BalanceLedger;
use crate::ledger::Entry;

fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A balanced entry set over a small pool of accounts, so lines collide.
fn balanced_entries() -> impl Strategy<Value = Vec<Entry>> {
    let pool: Vec<AccountId> = (0..4).map(|_| AccountId::new()).collect();
    prop::collection::vec((positive_amount(), 0usize..4, 0usize..4), 1..10).prop_map(
        move |lines| {
            let tx = TransactionId::new();
            let line = |account_id, debit, credit| Entry {
                id: EntryId::new(),
                transaction_id: tx,
                account_id,
                account_code: String::new(),
                debit,
                credit,
                description: None,
            };
            lines
                .into_iter()
                .flat_map(|(amount, dr, cr)| {
                    [
                        line(pool[dr], amount, Decimal::ZERO),
                        line(pool[cr], Decimal::ZERO, amount),
                    ]
                })
                .collect()
        },
    )
}

fn any_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Balanced entries produce deltas that net to zero.
    #[test]
    fn prop_balanced_entries_net_to_zero(entries in balanced_entries(), date in any_date()) {
        let deltas = BalanceLedger::apply_entries(&entries, date);
        let net: Decimal = deltas.iter().map(|d| d.amount).sum();
        prop_assert_eq!(net, Decimal::ZERO);
    }

    /// Aggregation never changes an account's total effect.
    #[test]
    fn prop_deltas_match_per_account_sums(entries in balanced_entries(), date in any_date()) {
        let deltas = BalanceLedger::apply_entries(&entries, date);
        for delta in &deltas {
            let expected: Decimal = entries
                .iter()
                .filter(|e| e.account_id == delta.account_id)
                .map(Entry::signed_amount)
                .sum();
            prop_assert_eq!(delta.amount, expected);
        }
    }

    /// One delta per account, strictly ordered.
    #[test]
    fn prop_deltas_sorted_and_unique(entries in balanced_entries(), date in any_date()) {
        let deltas = BalanceLedger::apply_entries(&entries, date);
        for pair in deltas.windows(2) {
            prop_assert!(pair[0].account_id < pair[1].account_id);
        }
    }
}

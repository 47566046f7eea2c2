//! Balance ledger.
//!
//! Single authority for per-account running balances and their per-period
//! deltas. Balances are debit-positive: every entry contributes
//! `debit − credit` to its account, whatever the account type.
//!
//! [`BalanceLedger::apply_entries`] is the only producer of balance deltas;
//! stores persist what it returns inside the posting or reversal unit of work.

mod period;

#[cfg(test)]
mod balance_props;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::AccountId;

use crate::ledger::{Entry, LedgerError};
use crate::store::BalanceStore;

pub use period::{InvalidPeriodKey, PeriodKey};

/// Change to one account's balance in one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    /// Account affected.
    pub account_id: AccountId,
    /// Period the change is booked in.
    pub period: PeriodKey,
    /// Signed change, debit-positive.
    pub amount: Decimal,
}

/// Running balance of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Account.
    pub account_id: AccountId,
    /// Debit-positive balance.
    pub balance: Decimal,
}

/// Accumulated delta of one account in one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBalance {
    /// Account.
    pub account_id: AccountId,
    /// Period.
    pub period: PeriodKey,
    /// Net change in the period.
    pub delta: Decimal,
}

/// Selects period balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceQuery {
    /// Restrict to one account.
    pub account_id: Option<AccountId>,
    /// Include periods up to and including this one.
    pub through: Option<PeriodKey>,
}

/// Balances for every account with activity, keyed by account.
pub type BalanceSnapshot = HashMap<AccountId, Decimal>;

/// Reads and computes balances.
#[derive(Clone)]
pub struct BalanceLedger {
    store: Arc<dyn BalanceStore>,
}

impl BalanceLedger {
    /// Creates a balance ledger over a store.
    #[must_use]
    pub fn new(store: Arc<dyn BalanceStore>) -> Self {
        Self { store }
    }

    /// Computes the deltas a set of entries makes, booked in `date`'s period.
    ///
    /// Lines on the same account are summed. Output is ordered by account ID
    /// so concurrent writers touch rows in the same order.
    #[must_use]
    pub fn apply_entries(entries: &[Entry], date: NaiveDate) -> Vec<BalanceDelta> {
        let period = PeriodKey::from_date(date);
        let mut per_account: BTreeMap<AccountId, Decimal> = BTreeMap::new();
        for entry in entries {
            *per_account.entry(entry.account_id).or_insert(Decimal::ZERO) += entry.signed_amount();
        }
        per_account
            .into_iter()
            .map(|(account_id, amount)| BalanceDelta {
                account_id,
                period,
                amount,
            })
            .collect()
    }

    /// Current running balance; zero for an account with no activity.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn current_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        let balances = self.store.current_balances(Some(account_id)).await?;
        Ok(balances
            .into_iter()
            .find(|b| b.account_id == account_id)
            .map_or(Decimal::ZERO, |b| b.balance))
    }

    /// Balance at the end of `date`'s period, summed from period deltas.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn balance_as_of(
        &self,
        account_id: AccountId,
        date: NaiveDate,
    ) -> Result<Decimal, LedgerError> {
        let query = BalanceQuery {
            account_id: Some(account_id),
            through: Some(PeriodKey::from_date(date)),
        };
        let periods = self.store.period_balances(&query).await?;
        Ok(periods.iter().map(|p| p.delta).sum())
    }

    /// Balances of all accounts, current or as of a date.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn snapshot(&self, as_of: Option<NaiveDate>) -> Result<BalanceSnapshot, LedgerError> {
        match as_of {
            None => {
                let balances = self.store.current_balances(None).await?;
                Ok(balances.into_iter().map(|b| (b.account_id, b.balance)).collect())
            }
            Some(date) => {
                let query = BalanceQuery {
                    account_id: None,
                    through: Some(PeriodKey::from_date(date)),
                };
                let periods = self.store.period_balances(&query).await?;
                Ok(sum_periods(&periods))
            }
        }
    }
}

/// Folds period rows into one balance per account.
#[must_use]
pub fn sum_periods(periods: &[PeriodBalance]) -> BalanceSnapshot {
    let mut totals = BalanceSnapshot::new();
    for p in periods {
        *totals.entry(p.account_id).or_insert(Decimal::ZERO) += p.delta;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_shared::types::{EntryId, TransactionId};

    fn entry(account_id: AccountId, debit: Decimal, credit: Decimal) -> Entry {
        Entry {
            id: EntryId::new(),
            transaction_id: TransactionId::new(),
            account_id,
            account_code: String::new(),
            debit,
            credit,
            description: None,
        }
    }

    #[test]
    fn test_debit_positive_credit_negative() {
        let cash = AccountId::new();
        let revenue = AccountId::new();
        let deltas = BalanceLedger::apply_entries(
            &[
                entry(cash, dec!(100), Decimal::ZERO),
                entry(revenue, Decimal::ZERO, dec!(100)),
            ],
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        );

        let cash_delta = deltas.iter().find(|d| d.account_id == cash).unwrap();
        let revenue_delta = deltas.iter().find(|d| d.account_id == revenue).unwrap();
        assert_eq!(cash_delta.amount, dec!(100));
        assert_eq!(revenue_delta.amount, dec!(-100));
        assert_eq!(cash_delta.period.to_string(), "2024-03");
    }

    #[test]
    fn test_same_account_lines_are_aggregated_and_sorted() {
        let a = AccountId::new();
        let b = AccountId::new();
        let deltas = BalanceLedger::apply_entries(
            &[
                entry(b, Decimal::ZERO, dec!(30)),
                entry(a, dec!(10), Decimal::ZERO),
                entry(a, dec!(20), Decimal::ZERO),
            ],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert_eq!(deltas.len(), 2);
        assert!(deltas[0].account_id < deltas[1].account_id);
        assert_eq!(deltas.iter().find(|d| d.account_id == a).unwrap().amount, dec!(30));
    }

    #[test]
    fn test_sum_periods() {
        let a = AccountId::new();
        let jan: PeriodKey = "2024-01".parse().unwrap();
        let feb: PeriodKey = "2024-02".parse().unwrap();
        let totals = sum_periods(&[
            PeriodBalance { account_id: a, period: jan, delta: dec!(50) },
            PeriodBalance { account_id: a, period: feb, delta: dec!(-20) },
        ]);
        assert_eq!(totals[&a], dec!(30));
    }
}

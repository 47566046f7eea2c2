//! Report generation service.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{instrument, warn};

use super::types::{TrialBalanceLine, TrialBalanceReport, TrialBalanceTotals};
use crate::accounts::Account;
use crate::balance::{BalanceLedger, BalanceSnapshot};
use crate::ledger::LedgerError;
use crate::store::AccountStore;

/// Largest column difference still reported as balanced (0.0001).
pub const BALANCE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Stateless report builders.
pub struct ReportService;

impl ReportService {
    /// Builds a trial balance from accounts and their balances.
    ///
    /// Inactive accounts are skipped unless they still carry a balance, so
    /// deactivation never unbalances the report. Accounts missing from
    /// `balances` report zero. Imbalance is reported, never raised.
    #[must_use]
    pub fn generate_trial_balance(
        accounts: &[Account],
        balances: &BalanceSnapshot,
        as_of: Option<NaiveDate>,
    ) -> TrialBalanceReport {
        let mut lines: Vec<TrialBalanceLine> = accounts
            .iter()
            .map(|account| {
                let balance = balances.get(&account.id).copied().unwrap_or(Decimal::ZERO);
                (account, balance)
            })
            .filter(|(account, balance)| account.is_active || !balance.is_zero())
            .map(|(account, balance)| {
                let normal_balance = account.normal_balance();
                TrialBalanceLine {
                    account_id: account.id,
                    code: account.code.clone(),
                    name: account.name.clone(),
                    account_type: account.account_type,
                    normal_balance,
                    balance,
                    natural_balance: normal_balance.natural(balance),
                    debit: balance.max(Decimal::ZERO),
                    credit: (-balance).max(Decimal::ZERO),
                }
            })
            .collect();
        lines.sort_by(|a, b| a.code.cmp(&b.code));

        let total_debit: Decimal = lines.iter().map(|l| l.debit).sum();
        let total_credit: Decimal = lines.iter().map(|l| l.credit).sum();
        let difference = total_debit - total_credit;

        TrialBalanceReport {
            as_of,
            lines,
            totals: TrialBalanceTotals {
                total_debit,
                total_credit,
                difference,
                is_balanced: difference.abs() < BALANCE_EPSILON,
            },
        }
    }
}

/// Reads balances and accounts to produce trial balances on demand.
#[derive(Clone)]
pub struct TrialBalanceReporter {
    accounts: Arc<dyn AccountStore>,
    balances: BalanceLedger,
}

impl TrialBalanceReporter {
    /// Creates a reporter.
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>, balances: BalanceLedger) -> Self {
        Self { accounts, balances }
    }

    /// Trial balance over active accounts, current or as of a date.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a read fails.
    #[instrument(skip(self))]
    pub async fn get_trial_balance(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<TrialBalanceReport, LedgerError> {
        let accounts = self.accounts.list_accounts().await?;
        let balances = self.balances.snapshot(as_of).await?;
        let report = ReportService::generate_trial_balance(&accounts, &balances, as_of);
        if !report.totals.is_balanced {
            warn!(
                total_debit = %report.totals.total_debit,
                total_credit = %report.totals.total_credit,
                "trial balance does not balance"
            );
        }
        Ok(report)
    }
}

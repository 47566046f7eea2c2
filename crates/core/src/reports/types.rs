//! Report types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::AccountId;

use crate::accounts::{AccountType, NormalBalance};

/// One account row of a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialBalanceLine {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Normal side of the account.
    pub normal_balance: NormalBalance,
    /// Debit-positive balance.
    pub balance: Decimal,
    /// Balance with the normal side positive.
    pub natural_balance: Decimal,
    /// Debit column: the balance when positive, else zero.
    pub debit: Decimal,
    /// Credit column: the negated balance when negative, else zero.
    pub credit: Decimal,
}

/// Trial balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialBalanceReport {
    /// Report date. `None` for current balances.
    pub as_of: Option<NaiveDate>,
    /// Lines ordered by account code.
    pub lines: Vec<TrialBalanceLine>,
    /// Column totals.
    pub totals: TrialBalanceTotals,
}

/// Trial balance totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrialBalanceTotals {
    /// Sum of the debit column.
    pub total_debit: Decimal,
    /// Sum of the credit column.
    pub total_credit: Decimal,
    /// `total_debit − total_credit`.
    pub difference: Decimal,
    /// Columns agree within tolerance.
    pub is_balanced: bool,
}

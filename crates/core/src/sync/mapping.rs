//! Static account mappings per upstream module.
//!
//! Each upstream transaction type maps to a debit/credit account pair, plus an
//! optional pair for the fee charged on it.

use rust_decimal::Decimal;

use super::types::SourceRecord;
use crate::accounts::chart::{
    AGENCY_DEPOSITS, AGENCY_FEE_INCOME, AGENCY_FLOAT, AGENT_COMMISSION_EXPENSE, BANK_OPERATING,
    CASH_ON_HAND, COMMISSION_INCOME, COMMISSIONS_PAYABLE, CUSTOMER_WALLETS, MERCHANT_PAYABLE,
    MOMO_FEE_INCOME, MOMO_FLOAT, OFFICE_ADMIN, OTHER_EXPENSES, RENT_AND_UTILITIES, SALARIES,
    TRANSPORT,
};
use crate::ledger::{EntryInput, LedgerError, SourceModule};

/// Account pair for the fee on a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRule {
    /// Account debited with the fee.
    pub debit_code: &'static str,
    /// Account credited with the fee.
    pub credit_code: &'static str,
}

/// Account pair for one upstream transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingRule {
    /// Account debited with the principal.
    pub debit_code: &'static str,
    /// Account credited with the principal.
    pub credit_code: &'static str,
    /// Fee booking, when the type carries fees.
    pub fee: Option<FeeRule>,
}

const fn rule(debit_code: &'static str, credit_code: &'static str) -> MappingRule {
    MappingRule {
        debit_code,
        credit_code,
        fee: None,
    }
}

const fn with_fee(
    debit_code: &'static str,
    credit_code: &'static str,
    fee_debit: &'static str,
    fee_credit: &'static str,
) -> MappingRule {
    MappingRule {
        debit_code,
        credit_code,
        fee: Some(FeeRule {
            debit_code: fee_debit,
            credit_code: fee_credit,
        }),
    }
}

/// Type → rule table for one module.
#[derive(Debug)]
pub struct MappingTable {
    module: SourceModule,
    rules: &'static [(&'static str, MappingRule)],
}

static MOMO: MappingTable = MappingTable {
    module: SourceModule::Momo,
    rules: &[
        ("cash-in", with_fee(CASH_ON_HAND, CUSTOMER_WALLETS, CASH_ON_HAND, MOMO_FEE_INCOME)),
        ("cash-out", with_fee(CUSTOMER_WALLETS, CASH_ON_HAND, CUSTOMER_WALLETS, MOMO_FEE_INCOME)),
        ("bill-payment", with_fee(CUSTOMER_WALLETS, MERCHANT_PAYABLE, CUSTOMER_WALLETS, MOMO_FEE_INCOME)),
        ("merchant-payment", with_fee(CUSTOMER_WALLETS, MERCHANT_PAYABLE, CUSTOMER_WALLETS, MOMO_FEE_INCOME)),
        ("float-topup", rule(MOMO_FLOAT, BANK_OPERATING)),
    ],
};

static AGENCY_BANKING: MappingTable = MappingTable {
    module: SourceModule::AgencyBanking,
    rules: &[
        ("deposit", with_fee(CASH_ON_HAND, AGENCY_DEPOSITS, CASH_ON_HAND, AGENCY_FEE_INCOME)),
        ("withdrawal", with_fee(AGENCY_DEPOSITS, CASH_ON_HAND, AGENCY_DEPOSITS, AGENCY_FEE_INCOME)),
        ("bill-payment", with_fee(CASH_ON_HAND, MERCHANT_PAYABLE, CASH_ON_HAND, AGENCY_FEE_INCOME)),
        ("float-topup", rule(AGENCY_FLOAT, BANK_OPERATING)),
    ],
};

static COMMISSIONS: MappingTable = MappingTable {
    module: SourceModule::Commissions,
    rules: &[
        ("agent-commission", rule(AGENT_COMMISSION_EXPENSE, COMMISSIONS_PAYABLE)),
        ("commission-payout", rule(COMMISSIONS_PAYABLE, BANK_OPERATING)),
        ("partner-commission", rule(BANK_OPERATING, COMMISSION_INCOME)),
    ],
};

static EXPENSES: MappingTable = MappingTable {
    module: SourceModule::Expenses,
    rules: &[
        ("salaries", rule(SALARIES, BANK_OPERATING)),
        ("rent", rule(RENT_AND_UTILITIES, BANK_OPERATING)),
        ("utilities", rule(RENT_AND_UTILITIES, BANK_OPERATING)),
        ("office", rule(OFFICE_ADMIN, BANK_OPERATING)),
        ("transport", rule(TRANSPORT, BANK_OPERATING)),
        ("other", rule(OTHER_EXPENSES, BANK_OPERATING)),
    ],
};

/// Canonical form of an upstream type: trimmed, lowercase, `_` and spaces as `-`.
#[must_use]
pub fn normalize_type(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

impl MappingTable {
    /// Table for a synced module. `Manual` has none.
    #[must_use]
    pub fn for_module(module: SourceModule) -> Option<&'static Self> {
        match module {
            SourceModule::Momo => Some(&MOMO),
            SourceModule::AgencyBanking => Some(&AGENCY_BANKING),
            SourceModule::Commissions => Some(&COMMISSIONS),
            SourceModule::Expenses => Some(&EXPENSES),
            SourceModule::Manual => None,
        }
    }

    /// Module this table belongs to.
    #[must_use]
    pub const fn module(&self) -> SourceModule {
        self.module
    }

    /// Rule for an upstream type, matched after normalization.
    #[must_use]
    pub fn rule(&self, transaction_type: &str) -> Option<&MappingRule> {
        let normalized = normalize_type(transaction_type);
        self.rules
            .iter()
            .find(|(kind, _)| *kind == normalized)
            .map(|(_, rule)| rule)
    }

    /// Every account code the table references.
    pub fn account_codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().flat_map(|(_, rule)| {
            let fee = rule
                .fee
                .map(|f| [f.debit_code, f.credit_code])
                .into_iter()
                .flatten();
            [rule.debit_code, rule.credit_code].into_iter().chain(fee)
        })
    }

    /// Builds journal lines for a record: the principal pair, plus the fee
    /// pair when the record carries a positive fee and the rule books fees.
    ///
    /// # Errors
    ///
    /// `Mapping` if the record's type has no rule.
    pub fn entries_for(&self, record: &SourceRecord) -> Result<Vec<EntryInput>, LedgerError> {
        let rule = self
            .rule(&record.transaction_type)
            .ok_or_else(|| LedgerError::Mapping {
                module: self.module,
                transaction_type: record.transaction_type.clone(),
            })?;

        let mut entries = vec![
            EntryInput::debit(rule.debit_code, record.amount),
            EntryInput::credit(rule.credit_code, record.amount),
        ];

        if let (Some(fee_rule), Some(fee)) = (rule.fee, record.fee)
            && fee > Decimal::ZERO
        {
            entries.push(EntryInput::debit(fee_rule.debit_code, fee).with_description("fee"));
            entries.push(EntryInput::credit(fee_rule.credit_code, fee).with_description("fee"));
        }

        Ok(entries)
    }
}

//! Business rule validation for journal entries.

use rust_decimal::Decimal;
use tally_shared::types::{EntryId, TransactionId};

use super::error::ValidationError;
use super::types::{Entry, EntryInput, TransactionTotals};
use crate::accounts::Account;

/// Checks the shape of a set of entries.
///
/// At least two lines, no negative amounts, exactly one side nonzero per
/// line, and Σdebit == Σcredit.
///
/// # Errors
///
/// Returns the first rule violated.
pub fn validate_entries(entries: &[EntryInput]) -> Result<TransactionTotals, ValidationError> {
    if entries.len() < 2 {
        return Err(ValidationError::InsufficientEntries {
            count: entries.len(),
        });
    }

    for entry in entries {
        if entry.debit < Decimal::ZERO || entry.credit < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount {
                account_code: entry.account_code.clone(),
            });
        }
        let has_debit = entry.debit > Decimal::ZERO;
        let has_credit = entry.credit > Decimal::ZERO;
        if has_debit == has_credit {
            return Err(ValidationError::AmbiguousEntry {
                account_code: entry.account_code.clone(),
            });
        }
    }

    let totals = TransactionTotals::from_amounts(entries.iter().map(|e| (e.debit, e.credit)));
    if !totals.is_balanced {
        return Err(ValidationError::Unbalanced {
            debit: totals.debit,
            credit: totals.credit,
        });
    }

    Ok(totals)
}

/// Resolves account codes and builds stored entries.
///
/// `lookup` returns the account for a code, active or not.
///
/// # Errors
///
/// `UnknownAccount` or `InactiveAccount` for the first bad line.
pub fn resolve_entries<'a, F>(
    transaction_id: TransactionId,
    entries: &[EntryInput],
    lookup: F,
) -> Result<Vec<Entry>, ValidationError>
where
    F: Fn(&str) -> Option<&'a Account>,
{
    entries
        .iter()
        .map(|input| {
            let account = lookup(&input.account_code)
                .ok_or_else(|| ValidationError::UnknownAccount(input.account_code.clone()))?;
            if !account.is_active {
                return Err(ValidationError::InactiveAccount(input.account_code.clone()));
            }
            Ok(Entry {
                id: EntryId::new(),
                transaction_id,
                account_id: account.id,
                account_code: account.code.clone(),
                debit: input.debit,
                credit: input.credit,
                description: input.description.clone(),
            })
        })
        .collect()
}

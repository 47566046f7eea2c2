//! Mirror transactions for reversing posted entries.

use chrono::{DateTime, Utc};
use tally_shared::types::{EntryId, TransactionId};

use super::types::{Entry, Transaction, TransactionStatus};

/// Suffix marker placed in a mirror's source transaction ID.
pub const REVERSAL_MARKER: &str = "reversal";

/// Stateless builder for reversing transactions.
pub struct ReversalService;

impl ReversalService {
    /// Source ID given to the mirror of `original`.
    ///
    /// Includes the original's ID so repeated reversals of a re-synced
    /// source record never share a key.
    #[must_use]
    pub fn mirror_source_id(original: &Transaction) -> String {
        format!(
            "{}:{REVERSAL_MARKER}:{}",
            original.source_transaction_id, original.id
        )
    }

    /// Builds the posted mirror of `original`.
    ///
    /// Every line keeps its account with debit and credit swapped. The mirror
    /// carries the original's date, module, type and branch so it lands in
    /// the same period and filters.
    #[must_use]
    pub fn create_mirror(
        original: &Transaction,
        reversed_by: &str,
        reversed_at: DateTime<Utc>,
    ) -> Transaction {
        let id = TransactionId::new();
        let entries = original
            .entries
            .iter()
            .map(|entry| Entry {
                id: EntryId::new(),
                transaction_id: id,
                account_id: entry.account_id,
                account_code: entry.account_code.clone(),
                debit: entry.credit,
                credit: entry.debit,
                description: Some(match &entry.description {
                    Some(memo) => format!("Reversal: {memo}"),
                    None => "Reversal".to_string(),
                }),
            })
            .collect();

        Transaction {
            id,
            date: original.date,
            source_module: original.source_module,
            source_transaction_id: Self::mirror_source_id(original),
            source_transaction_type: original.source_transaction_type.clone(),
            description: format!("Reversal of transaction {}", original.id),
            entries,
            status: TransactionStatus::Posted,
            created_by: reversed_by.to_string(),
            created_at: reversed_at,
            posted_by: Some(reversed_by.to_string()),
            posted_at: Some(reversed_at),
            reversed_by: None,
            reversed_at: None,
            reverses_transaction_id: Some(original.id),
            reversed_by_transaction_id: None,
            branch_id: original.branch_id.clone(),
            metadata: original.metadata.clone(),
        }
    }
}

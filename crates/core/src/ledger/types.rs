//! Ledger domain types.
//!
//! Amounts are `Decimal`; entries carry non-negative debit and credit columns
//! with exactly one side nonzero.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, EntryId, TransactionId};

/// Upstream system a transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceModule {
    /// Mobile money.
    Momo,
    /// Agency banking.
    AgencyBanking,
    /// Agent and partner commissions.
    Commissions,
    /// Operating expenses.
    Expenses,
    /// Journal entries created directly, not by sync.
    Manual,
}

impl SourceModule {
    /// Modules fed by an upstream service.
    pub const SYNCED: [Self; 4] = [Self::Momo, Self::AgencyBanking, Self::Commissions, Self::Expenses];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Momo => "momo",
            Self::AgencyBanking => "agency-banking",
            Self::Commissions => "commissions",
            Self::Expenses => "expenses",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for SourceModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown module name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown source module: {0}")]
pub struct UnknownSourceModule(pub String);

impl FromStr for SourceModule {
    type Err = UnknownSourceModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "momo" | "mobile-money" => Ok(Self::Momo),
            "agency-banking" | "agency" => Ok(Self::AgencyBanking),
            "commissions" | "commission" => Ok(Self::Commissions),
            "expenses" | "expense" => Ok(Self::Expenses),
            "manual" => Ok(Self::Manual),
            _ => Err(UnknownSourceModule(s.to_string())),
        }
    }
}

/// Transaction lifecycle state.
///
/// `pending → posted → reversed` or `pending → reversed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Created, entries fixed, no balance effect yet.
    Pending,
    /// Balances updated.
    Posted,
    /// Cancelled; a posted original has a mirror.
    Reversed,
}

impl TransactionStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
        }
    }

    /// Returns true if the transaction can be posted.
    #[must_use]
    pub const fn can_post(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if the transaction can be reversed.
    #[must_use]
    pub const fn can_reverse(self) -> bool {
        matches!(self, Self::Pending | Self::Posted)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "posted" => Ok(Self::Posted),
            "reversed" => Ok(Self::Reversed),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

/// One line of a journal transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry ID.
    pub id: EntryId,
    /// Owning transaction.
    pub transaction_id: TransactionId,
    /// Account the line hits.
    pub account_id: AccountId,
    /// Code of that account at creation time.
    pub account_code: String,
    /// Debit amount (0 if credit).
    pub debit: Decimal,
    /// Credit amount (0 if debit).
    pub credit: Decimal,
    /// Optional line memo.
    pub description: Option<String>,
}

impl Entry {
    /// Debit-positive effect of this line on its account.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// A journal transaction with its entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Accounting date.
    pub date: NaiveDate,
    /// Originating module.
    pub source_module: SourceModule,
    /// ID of the record in the originating module.
    pub source_transaction_id: String,
    /// Upstream transaction type, e.g. `cash-in`.
    pub source_transaction_type: String,
    /// Human-readable description.
    pub description: String,
    /// Journal lines, immutable once created.
    pub entries: Vec<Entry>,
    /// Lifecycle state.
    pub status: TransactionStatus,
    /// Creator.
    pub created_by: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Who posted it.
    pub posted_by: Option<String>,
    /// When it was posted.
    pub posted_at: Option<DateTime<Utc>>,
    /// Who reversed it.
    pub reversed_by: Option<String>,
    /// When it was reversed.
    pub reversed_at: Option<DateTime<Utc>>,
    /// Set on a mirror: the transaction it reverses.
    pub reverses_transaction_id: Option<TransactionId>,
    /// Set on a reversed original: its mirror.
    pub reversed_by_transaction_id: Option<TransactionId>,
    /// Branch the upstream record belongs to.
    pub branch_id: Option<String>,
    /// Free-form upstream data.
    pub metadata: serde_json::Value,
}

impl Transaction {
    /// Debit and credit totals.
    #[must_use]
    pub fn totals(&self) -> TransactionTotals {
        TransactionTotals::from_amounts(self.entries.iter().map(|e| (e.debit, e.credit)))
    }

    /// Returns true if the entries balance.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.totals().is_balanced
    }
}

/// Totals of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTotals {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
    /// Debits equal credits.
    pub is_balanced: bool,
}

impl TransactionTotals {
    /// Sums `(debit, credit)` pairs.
    pub fn from_amounts(amounts: impl IntoIterator<Item = (Decimal, Decimal)>) -> Self {
        let (debit, credit) = amounts
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(d, c), (debit, credit)| {
                (d + debit, c + credit)
            });
        Self {
            debit,
            credit,
            is_balanced: debit == credit,
        }
    }
}

/// A journal line as supplied by a caller, addressed by account code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInput {
    /// Account code.
    pub account_code: String,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Optional line memo.
    pub description: Option<String>,
}

impl EntryInput {
    /// A debit line.
    #[must_use]
    pub fn debit(account_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// A credit line.
    #[must_use]
    pub fn credit(account_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// Attaches a memo.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Input for creating a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransactionInput {
    /// Accounting date.
    pub date: NaiveDate,
    /// Originating module.
    pub source_module: SourceModule,
    /// ID of the record in the originating module.
    pub source_transaction_id: String,
    /// Upstream transaction type.
    pub source_transaction_type: String,
    /// Human-readable description.
    pub description: String,
    /// Journal lines.
    pub entries: Vec<EntryInput>,
    /// Creator.
    pub created_by: String,
    /// Optional branch.
    #[serde(default)]
    pub branch_id: Option<String>,
    /// Free-form upstream data.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Filters for [`list_transactions`](crate::ledger::LedgerEngine::list_transactions).
///
/// Unset fields match everything. Date bounds are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Status.
    pub status: Option<TransactionStatus>,
    /// Source module.
    pub source_module: Option<SourceModule>,
    /// Upstream transaction type.
    pub transaction_type: Option<String>,
    /// Earliest date.
    pub date_from: Option<NaiveDate>,
    /// Latest date.
    pub date_to: Option<NaiveDate>,
    /// Branch.
    pub branch_id: Option<String>,
}

impl TransactionFilter {
    /// Returns true if the transaction passes every set filter.
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.status.is_none_or(|s| tx.status == s)
            && self.source_module.is_none_or(|m| tx.source_module == m)
            && self
                .transaction_type
                .as_deref()
                .is_none_or(|t| tx.source_transaction_type == t)
            && self.date_from.is_none_or(|d| tx.date >= d)
            && self.date_to.is_none_or(|d| tx.date <= d)
            && self
                .branch_id
                .as_deref()
                .is_none_or(|b| tx.branch_id.as_deref() == Some(b))
    }
}

/// Result of reversing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reversal {
    /// The original, now `reversed`.
    pub original: Transaction,
    /// The posted mirror. `None` when the original was still pending.
    pub mirror: Option<Transaction>,
}

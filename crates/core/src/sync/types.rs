//! Sync domain types.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::SyncLogId;

use crate::ledger::SourceModule;

/// A completed transaction as reported by an upstream module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    /// Upstream ID; becomes the ledger's source transaction ID.
    pub id: String,
    /// Principal amount.
    pub amount: Decimal,
    /// Upstream transaction type, e.g. `cash-in`.
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// Accounting date.
    pub date: NaiveDate,
    /// User who initiated it upstream.
    pub user_id: String,
    /// Fee charged on top of the principal.
    #[serde(default)]
    pub fee: Option<Decimal>,
    /// Branch the record belongs to.
    #[serde(default)]
    pub branch_id: Option<String>,
    /// Anything else the upstream sent.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Window of completed records to fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFilter {
    /// Earliest date, inclusive.
    pub since: Option<NaiveDate>,
    /// Latest date, inclusive.
    pub until: Option<NaiveDate>,
}

impl FeedFilter {
    /// Upstream status feeds are asked for. Only completed records are synced.
    pub const STATUS: &'static str = "completed";

    /// Filter covering `lookback_days` days up to and including `today`.
    #[must_use]
    pub fn lookback(today: NaiveDate, lookback_days: i64) -> Self {
        Self {
            since: today.checked_sub_signed(chrono::Duration::days(lookback_days.max(0))),
            until: Some(today),
        }
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// No record failed.
    Success,
    /// No record succeeded, or the run aborted.
    Failed,
    /// Some succeeded, some failed.
    Partial,
}

impl SyncStatus {
    /// Status for the given counts.
    ///
    /// An empty batch is a success; an aborted run is always failed.
    #[must_use]
    pub const fn from_counts(succeeded: usize, failed: usize, aborted: bool) -> Self {
        if aborted {
            Self::Failed
        } else if failed == 0 {
            Self::Success
        } else if succeeded == 0 {
            Self::Failed
        } else {
            Self::Partial
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "partial" => Ok(Self::Partial),
            other => Err(format!("unknown sync status: {other}")),
        }
    }
}

/// A record the run could not book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    /// Upstream ID. `None` when the feed itself failed.
    pub source_transaction_id: Option<String>,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Summary returned by a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Module synced.
    pub module: SourceModule,
    /// Records attempted.
    pub records_processed: usize,
    /// Records booked or found already booked.
    pub records_succeeded: usize,
    /// Records that failed.
    pub records_failed: usize,
    /// Subset of succeeded that were already in the ledger.
    pub already_synced: usize,
    /// Per-record failures.
    pub failures: Vec<RecordFailure>,
    /// Overall outcome.
    pub status: SyncStatus,
    /// Log entry written for this run.
    pub log_id: SyncLogId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, false, SyncStatus::Success)]
    #[case(5, 0, false, SyncStatus::Success)]
    #[case(4, 1, false, SyncStatus::Partial)]
    #[case(0, 3, false, SyncStatus::Failed)]
    #[case(2, 1, true, SyncStatus::Failed)]
    #[case(0, 0, true, SyncStatus::Failed)]
    fn test_status_from_counts(
        #[case] succeeded: usize,
        #[case] failed: usize,
        #[case] aborted: bool,
        #[case] expected: SyncStatus,
    ) {
        assert_eq!(SyncStatus::from_counts(succeeded, failed, aborted), expected);
    }

    #[test]
    fn test_source_record_wire_shape() {
        let json = r#"{
            "id": "MM-9",
            "amount": "125.50",
            "type": "cash-in",
            "date": "2024-04-02",
            "userId": "U-3",
            "fee": "1.25",
            "branchId": "BR-2"
        }"#;
        let record: SourceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.transaction_type, "cash-in");
        assert_eq!(record.amount, Decimal::new(12550, 2));
        assert_eq!(record.fee, Some(Decimal::new(125, 2)));
        assert_eq!(record.branch_id.as_deref(), Some("BR-2"));
        assert!(record.metadata.is_null());
    }

    #[test]
    fn test_lookback_window() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let filter = FeedFilter::lookback(today, 7);
        assert_eq!(filter.since, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(filter.until, Some(today));
    }
}

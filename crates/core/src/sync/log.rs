//! Append-only sync log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::SyncLogId;

use super::types::SyncStatus;
use crate::ledger::{LedgerError, SourceModule};
use crate::store::SyncLogStore;

/// Operation name recorded for coordinator runs.
pub const SYNC_OPERATION: &str = "sync_transactions";

/// Default and maximum page sizes for [`SyncLog::list_sync_logs`].
pub const DEFAULT_LOG_LIMIT: u64 = 50;
const MAX_LOG_LIMIT: u64 = 500;

/// One sync run, as recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    /// Entry ID.
    pub id: SyncLogId,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Module synced.
    pub module: SourceModule,
    /// Operation name.
    pub operation: String,
    /// Outcome.
    pub status: SyncStatus,
    /// Counts and per-record failures.
    pub details: serde_json::Value,
    /// Records booked or found already booked.
    pub affected_records: i64,
    /// Failure messages joined with `; `.
    pub error: Option<String>,
}

/// Selects log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncLogFilter {
    /// Maximum entries returned.
    pub limit: u64,
    /// Restrict to one module.
    pub module: Option<SourceModule>,
    /// Restrict to one outcome.
    pub status: Option<SyncStatus>,
}

impl Default for SyncLogFilter {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LOG_LIMIT,
            module: None,
            status: None,
        }
    }
}

impl SyncLogFilter {
    /// Returns true if the entry passes the module and status filters.
    #[must_use]
    pub fn matches(&self, entry: &SyncLogEntry) -> bool {
        self.module.is_none_or(|m| entry.module == m)
            && self.status.is_none_or(|s| entry.status == s)
    }
}

/// Writes and reads the sync log.
#[derive(Clone)]
pub struct SyncLog {
    store: Arc<dyn SyncLogStore>,
}

impl SyncLog {
    /// Creates a log over a store.
    #[must_use]
    pub fn new(store: Arc<dyn SyncLogStore>) -> Self {
        Self { store }
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub async fn append(&self, entry: &SyncLogEntry) -> Result<(), LedgerError> {
        Ok(self.store.append_sync_log(entry).await?)
    }

    /// Entries newest first. `limit` is clamped to 1..=500.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn list_sync_logs(
        &self,
        limit: u64,
        module: Option<SourceModule>,
        status: Option<SyncStatus>,
    ) -> Result<Vec<SyncLogEntry>, LedgerError> {
        let filter = SyncLogFilter {
            limit: limit.clamp(1, MAX_LOG_LIMIT),
            module,
            status,
        };
        Ok(self.store.list_sync_logs(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn entry(module: SourceModule, status: SyncStatus) -> SyncLogEntry {
        SyncLogEntry {
            id: SyncLogId::new(),
            timestamp: Utc::now(),
            module,
            operation: SYNC_OPERATION.to_string(),
            status,
            details: serde_json::json!({}),
            affected_records: 0,
            error: None,
        }
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filters() {
        let log = SyncLog::new(Arc::new(MemoryStore::new()));
        let first = entry(SourceModule::Momo, SyncStatus::Success);
        let second = entry(SourceModule::Expenses, SyncStatus::Failed);
        let third = entry(SourceModule::Momo, SyncStatus::Partial);
        for e in [&first, &second, &third] {
            log.append(e).await.unwrap();
        }

        let all = log.list_sync_logs(DEFAULT_LOG_LIMIT, None, None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);

        let momo = log
            .list_sync_logs(DEFAULT_LOG_LIMIT, Some(SourceModule::Momo), None)
            .await
            .unwrap();
        assert_eq!(momo.len(), 2);

        let failed = log
            .list_sync_logs(DEFAULT_LOG_LIMIT, None, Some(SyncStatus::Failed))
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, second.id);

        let one = log.list_sync_logs(0, None, None).await.unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_entries_are_never_overwritten() {
        let log = SyncLog::new(Arc::new(MemoryStore::new()));
        let e = entry(SourceModule::Commissions, SyncStatus::Success);
        log.append(&e).await.unwrap();
        assert!(log.append(&e).await.is_err());
    }
}

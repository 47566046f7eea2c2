//! Sync coordinator: one per upstream module.
//!
//! Pulls completed records, maps each to journal lines, creates and posts it
//! through the engine, and records exactly one log entry per run. Records are
//! processed sequentially; one bad record never stops the batch, but a feed
//! failure or a lost storage connection does.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tally_shared::types::{SyncLogId, TransactionId};
use tracing::{debug, error, info, instrument, warn};

use super::feed::SourceFeed;
use super::log::{SYNC_OPERATION, SyncLog, SyncLogEntry};
use super::mapping::{MappingTable, normalize_type};
use super::types::{FeedFilter, RecordFailure, SourceRecord, SyncReport, SyncStatus};
use crate::ledger::{
    LedgerEngine, LedgerError, NewTransactionInput, SourceModule, TransactionStatus,
};

enum RecordOutcome {
    Posted(TransactionId),
    AlreadySynced,
}

#[derive(Default)]
struct RunTally {
    processed: usize,
    succeeded: usize,
    failed: usize,
    already_synced: usize,
    failures: Vec<RecordFailure>,
    aborted: bool,
}

/// Drives one module's records into the ledger.
#[derive(Clone)]
pub struct SyncCoordinator {
    table: &'static MappingTable,
    feed: Arc<dyn SourceFeed>,
    engine: LedgerEngine,
    log: SyncLog,
    actor: String,
}

impl SyncCoordinator {
    /// Creates a coordinator for the module `table` belongs to.
    #[must_use]
    pub fn new(
        table: &'static MappingTable,
        feed: Arc<dyn SourceFeed>,
        engine: LedgerEngine,
        log: SyncLog,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            table,
            feed,
            engine,
            log,
            actor: actor.into(),
        }
    }

    /// Module this coordinator syncs.
    #[must_use]
    pub const fn module(&self) -> SourceModule {
        self.table.module()
    }

    /// Runs one sync pass over the filter window.
    ///
    /// Per-record failures are reported, not returned.
    ///
    /// # Errors
    ///
    /// Only if the log entry for the run cannot be written.
    #[instrument(skip(self), fields(module = %self.module()))]
    pub async fn run(&self, filter: &FeedFilter) -> Result<SyncReport, LedgerError> {
        let mut tally = RunTally::default();

        match self.feed.completed_transactions(filter).await {
            Ok(records) => {
                debug!(records = records.len(), "fetched source records");
                for record in &records {
                    tally.processed += 1;
                    match self.sync_record(record).await {
                        Ok(RecordOutcome::Posted(id)) => {
                            tally.succeeded += 1;
                            debug!(source_id = %record.id, transaction_id = %id, "record posted");
                        }
                        Ok(RecordOutcome::AlreadySynced) => {
                            tally.succeeded += 1;
                            tally.already_synced += 1;
                        }
                        Err(err) => {
                            warn!(
                                source_id = %record.id,
                                code = err.error_code(),
                                error = %err,
                                "record failed"
                            );
                            tally.failed += 1;
                            tally.failures.push(RecordFailure {
                                source_transaction_id: Some(record.id.clone()),
                                code: err.error_code().to_string(),
                                message: err.to_string(),
                            });
                            if err.is_systemic() {
                                error!(error = %err, "storage unavailable, aborting run");
                                tally.aborted = true;
                                break;
                            }
                        }
                    }
                }
            }
            Err(err) => {
                error!(error = %err, "feed failed, aborting run");
                tally.aborted = true;
                tally.failures.push(RecordFailure {
                    source_transaction_id: None,
                    code: err.error_code().to_string(),
                    message: err.to_string(),
                });
            }
        }

        self.finish(tally).await
    }

    async fn sync_record(&self, record: &SourceRecord) -> Result<RecordOutcome, LedgerError> {
        let module = self.module();
        let entries = self.table.entries_for(record)?;
        let transaction_type = normalize_type(&record.transaction_type);

        let input = NewTransactionInput {
            date: record.date,
            source_module: module,
            source_transaction_id: record.id.clone(),
            description: format!("{module} {transaction_type} {}", record.id),
            source_transaction_type: transaction_type,
            entries,
            created_by: self.actor.clone(),
            branch_id: record.branch_id.clone(),
            metadata: json!({
                "userId": record.user_id,
                "amount": record.amount,
                "fee": record.fee,
                "source": record.metadata,
            }),
        };

        match self.engine.create_transaction(input).await {
            Ok(created) => self.post(created.id).await,
            // The holder may still be pending if an earlier post failed
            Err(LedgerError::DuplicateSource {
                existing: Some(id), ..
            }) => self.post(id).await,
            Err(err) if err.is_benign() => Ok(RecordOutcome::AlreadySynced),
            Err(err) => Err(err),
        }
    }

    /// Posts `id`; a transaction someone else already posted counts as synced.
    async fn post(&self, id: TransactionId) -> Result<RecordOutcome, LedgerError> {
        match self.engine.post_transaction(id, &self.actor).await {
            Ok(posted) => Ok(RecordOutcome::Posted(posted.id)),
            Err(LedgerError::InvalidState {
                actual: TransactionStatus::Posted,
                ..
            }) => Ok(RecordOutcome::AlreadySynced),
            Err(err) => Err(err),
        }
    }

    async fn finish(&self, tally: RunTally) -> Result<SyncReport, LedgerError> {
        let status = SyncStatus::from_counts(tally.succeeded, tally.failed, tally.aborted);
        let error = (!tally.failures.is_empty()).then(|| {
            tally
                .failures
                .iter()
                .map(|f| match &f.source_transaction_id {
                    Some(id) => format!("{id}: {}", f.message),
                    None => f.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ")
        });

        let entry = SyncLogEntry {
            id: SyncLogId::new(),
            timestamp: Utc::now(),
            module: self.module(),
            operation: SYNC_OPERATION.to_string(),
            status,
            details: json!({
                "recordsProcessed": tally.processed,
                "recordsSucceeded": tally.succeeded,
                "recordsFailed": tally.failed,
                "alreadySynced": tally.already_synced,
                "aborted": tally.aborted,
                "failures": tally.failures,
            }),
            affected_records: i64::try_from(tally.succeeded).unwrap_or(i64::MAX),
            error,
        };
        self.log.append(&entry).await?;

        info!(
            status = %status,
            processed = tally.processed,
            succeeded = tally.succeeded,
            failed = tally.failed,
            already_synced = tally.already_synced,
            "sync run finished"
        );

        Ok(SyncReport {
            module: self.module(),
            records_processed: tally.processed,
            records_succeeded: tally.succeeded,
            records_failed: tally.failed,
            already_synced: tally.already_synced,
            failures: tally.failures,
            status,
            log_id: entry.id,
        })
    }
}

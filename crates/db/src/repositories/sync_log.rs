//! Sync log repository. Inserts and reads only.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use tally_core::store::{StoreResult, SyncLogStore};
use tally_core::sync::{SyncLogEntry, SyncLogFilter};
use tally_shared::types::SyncLogId;

use crate::entities::{sea_orm_active_enums as db_enums, sync_logs};
use crate::error::store_error;

/// PostgreSQL-backed [`SyncLogStore`].
#[derive(Debug, Clone)]
pub struct SyncLogRepository {
    db: DatabaseConnection,
}

impl SyncLogRepository {
    /// Creates a new sync log repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_entry(row: sync_logs::Model) -> SyncLogEntry {
    SyncLogEntry {
        id: SyncLogId::from(row.id),
        timestamp: row.logged_at.with_timezone(&Utc),
        module: row.module.into(),
        operation: row.operation,
        status: row.status.into(),
        details: row.details,
        affected_records: row.affected_records,
        error: row.error,
    }
}

#[async_trait]
impl SyncLogStore for SyncLogRepository {
    async fn append_sync_log(&self, entry: &SyncLogEntry) -> StoreResult<()> {
        let model = sync_logs::ActiveModel {
            id: Set(entry.id.into_inner()),
            logged_at: Set(entry.timestamp.into()),
            module: Set(entry.module.into()),
            operation: Set(entry.operation.clone()),
            status: Set(entry.status.into()),
            details: Set(entry.details.clone()),
            affected_records: Set(entry.affected_records),
            error: Set(entry.error.clone()),
        };

        sync_logs::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn list_sync_logs(&self, filter: &SyncLogFilter) -> StoreResult<Vec<SyncLogEntry>> {
        let mut query = sync_logs::Entity::find();
        if let Some(module) = filter.module {
            query = query.filter(sync_logs::Column::Module.eq(db_enums::SourceModule::from(module)));
        }
        if let Some(status) = filter.status {
            query = query.filter(sync_logs::Column::Status.eq(db_enums::SyncStatus::from(status)));
        }

        let rows = query
            .order_by_desc(sync_logs::Column::LoggedAt)
            .order_by_desc(sync_logs::Column::Id)
            .limit(filter.limit)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(to_entry).collect())
    }
}

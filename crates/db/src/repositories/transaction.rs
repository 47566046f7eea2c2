//! Transaction repository for ledger transactions and their entries.
//!
//! Every write runs inside one database transaction. Posting and reversal
//! use a compare-and-set on `status` so two callers racing on the same
//! transaction cannot both apply its balance effect.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use tally_core::balance::BalanceDelta;
use tally_core::ledger::{Entry, SourceModule, Transaction, TransactionFilter, TransactionStatus};
use tally_core::store::{LedgerStore, Posting, ReversalCommit, StoreError, StoreResult};
use tally_shared::types::{AccountId, EntryId, TransactionId};
use uuid::Uuid;

use crate::entities::{
    chart_of_accounts, ledger_entries, sea_orm_active_enums as db_enums, transactions,
};
use crate::error::store_error;

const UPSERT_PERIOD_BALANCE_SQL: &str = r"
INSERT INTO account_period_balances (account_id, period_start, delta, updated_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (account_id, period_start)
DO UPDATE SET delta = account_period_balances.delta + EXCLUDED.delta,
              updated_at = EXCLUDED.updated_at
";

/// PostgreSQL-backed [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Attaches entries, in line order, to each header.
    async fn with_entries(
        conn: &DatabaseConnection,
        headers: Vec<transactions::Model>,
    ) -> StoreResult<Vec<Transaction>> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let rows = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.is_in(ids))
            .order_by_asc(ledger_entries::Column::TransactionId)
            .order_by_asc(ledger_entries::Column::LineNumber)
            .all(conn)
            .await
            .map_err(store_error)?;

        let mut by_transaction: HashMap<Uuid, Vec<Entry>> = HashMap::new();
        for row in rows {
            by_transaction
                .entry(row.transaction_id)
                .or_default()
                .push(to_entry(row));
        }

        Ok(headers
            .into_iter()
            .map(|header| {
                let entries = by_transaction.remove(&header.id).unwrap_or_default();
                to_transaction(header, entries)
            })
            .collect())
    }

    async fn insert_with_entries(txn: &DatabaseTransaction, tx: &Transaction) -> StoreResult<()> {
        transactions::Entity::insert(to_active_header(tx))
            .exec_without_returning(txn)
            .await
            .map_err(store_error)?;

        if tx.entries.is_empty() {
            return Ok(());
        }

        let now = Utc::now().into();
        let mut lines = Vec::with_capacity(tx.entries.len());
        for (index, entry) in tx.entries.iter().enumerate() {
            let line_number = i32::try_from(index + 1)
                .map_err(|_| StoreError::Query(format!("transaction {} has too many entries", tx.id)))?;
            lines.push(ledger_entries::ActiveModel {
                id: Set(entry.id.into_inner()),
                transaction_id: Set(tx.id.into_inner()),
                line_number: Set(line_number),
                account_id: Set(entry.account_id.into_inner()),
                account_code: Set(entry.account_code.clone()),
                debit: Set(entry.debit),
                credit: Set(entry.credit),
                description: Set(entry.description.clone()),
                created_at: Set(now),
            });
        }

        ledger_entries::Entity::insert_many(lines)
            .exec_without_returning(txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    /// Adds each delta to the running balance and to its month's row.
    async fn apply_deltas(txn: &DatabaseTransaction, deltas: &[BalanceDelta]) -> StoreResult<()> {
        let now = Utc::now();
        for delta in deltas {
            let updated = chart_of_accounts::Entity::update_many()
                .col_expr(
                    chart_of_accounts::Column::Balance,
                    Expr::col(chart_of_accounts::Column::Balance).add(delta.amount),
                )
                .col_expr(chart_of_accounts::Column::UpdatedAt, Expr::value(now))
                .filter(chart_of_accounts::Column::Id.eq(delta.account_id.into_inner()))
                .exec(txn)
                .await
                .map_err(store_error)?;
            if updated.rows_affected == 0 {
                return Err(StoreError::NotFound(format!("account {}", delta.account_id)));
            }

            let period_start = delta
                .period
                .first_day()
                .ok_or_else(|| StoreError::Query(format!("period {} out of range", delta.period)))?;
            txn.execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                UPSERT_PERIOD_BALANCE_SQL,
                [
                    delta.account_id.into_inner().into(),
                    period_start.into(),
                    delta.amount.into(),
                    now.into(),
                ],
            ))
            .await
            .map_err(store_error)?;
        }
        Ok(())
    }

    /// Explains a compare-and-set that matched no row.
    async fn stale_or_missing(txn: &DatabaseTransaction, id: TransactionId) -> StoreError {
        match transactions::Entity::find_by_id(id.into_inner()).one(txn).await {
            Ok(Some(current)) => {
                let status: TransactionStatus = current.status.into();
                StoreError::StaleState(format!("transaction {id} is {status}"))
            }
            Ok(None) => StoreError::NotFound(format!("transaction {id}")),
            Err(err) => store_error(err),
        }
    }
}

fn to_entry(row: ledger_entries::Model) -> Entry {
    Entry {
        id: EntryId::from(row.id),
        transaction_id: TransactionId::from(row.transaction_id),
        account_id: AccountId::from(row.account_id),
        account_code: row.account_code,
        debit: row.debit,
        credit: row.credit,
        description: row.description,
    }
}

fn to_transaction(header: transactions::Model, entries: Vec<Entry>) -> Transaction {
    Transaction {
        id: TransactionId::from(header.id),
        date: header.transaction_date,
        source_module: header.source_module.into(),
        source_transaction_id: header.source_transaction_id,
        source_transaction_type: header.source_transaction_type,
        description: header.description,
        entries,
        status: header.status.into(),
        created_by: header.created_by,
        created_at: header.created_at.with_timezone(&Utc),
        posted_by: header.posted_by,
        posted_at: header.posted_at.map(|at| at.with_timezone(&Utc)),
        reversed_by: header.reversed_by,
        reversed_at: header.reversed_at.map(|at| at.with_timezone(&Utc)),
        reverses_transaction_id: header.reverses_transaction_id.map(TransactionId::from),
        reversed_by_transaction_id: header.reversed_by_transaction_id.map(TransactionId::from),
        branch_id: header.branch_id,
        metadata: header.metadata,
    }
}

fn to_active_header(tx: &Transaction) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: Set(tx.id.into_inner()),
        transaction_date: Set(tx.date),
        source_module: Set(tx.source_module.into()),
        source_transaction_id: Set(tx.source_transaction_id.clone()),
        source_transaction_type: Set(tx.source_transaction_type.clone()),
        description: Set(tx.description.clone()),
        status: Set(tx.status.into()),
        created_by: Set(tx.created_by.clone()),
        created_at: Set(tx.created_at.into()),
        posted_by: Set(tx.posted_by.clone()),
        posted_at: Set(tx.posted_at.map(Into::into)),
        reversed_by: Set(tx.reversed_by.clone()),
        reversed_at: Set(tx.reversed_at.map(Into::into)),
        reverses_transaction_id: Set(tx.reverses_transaction_id.map(TransactionId::into_inner)),
        reversed_by_transaction_id: Set(tx.reversed_by_transaction_id.map(TransactionId::into_inner)),
        branch_id: Set(tx.branch_id.clone()),
        metadata: Set(tx.metadata.clone()),
    }
}

#[async_trait]
impl LedgerStore for TransactionRepository {
    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        let txn = self.db.begin().await.map_err(store_error)?;
        Self::insert_with_entries(&txn, transaction).await?;
        txn.commit().await.map_err(store_error)?;

        tracing::debug!(
            transaction_id = %transaction.id,
            entries = transaction.entries.len(),
            "Inserted transaction"
        );
        Ok(())
    }

    async fn find_transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        let Some(header) = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?
        else {
            return Ok(None);
        };
        Ok(Self::with_entries(&self.db, vec![header]).await?.pop())
    }

    async fn find_active_by_source(
        &self,
        module: SourceModule,
        source_transaction_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        let Some(header) = transactions::Entity::find()
            .filter(transactions::Column::SourceModule.eq(db_enums::SourceModule::from(module)))
            .filter(transactions::Column::SourceTransactionId.eq(source_transaction_id))
            .filter(transactions::Column::Status.ne(db_enums::TransactionStatus::Reversed))
            .one(&self.db)
            .await
            .map_err(store_error)?
        else {
            return Ok(None);
        };
        Ok(Self::with_entries(&self.db, vec![header]).await?.pop())
    }

    async fn find_by_source_id(&self, source_transaction_id: &str) -> StoreResult<Vec<Transaction>> {
        let headers = transactions::Entity::find()
            .filter(transactions::Column::SourceTransactionId.eq(source_transaction_id))
            .order_by_asc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        Self::with_entries(&self.db, headers).await
    }

    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        let mut query = transactions::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(transactions::Column::Status.eq(db_enums::TransactionStatus::from(status)));
        }
        if let Some(module) = filter.source_module {
            query = query.filter(transactions::Column::SourceModule.eq(db_enums::SourceModule::from(module)));
        }
        if let Some(transaction_type) = &filter.transaction_type {
            query = query.filter(transactions::Column::SourceTransactionType.eq(transaction_type.as_str()));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(transactions::Column::TransactionDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(transactions::Column::TransactionDate.lte(to));
        }
        if let Some(branch_id) = &filter.branch_id {
            query = query.filter(transactions::Column::BranchId.eq(branch_id.as_str()));
        }

        let headers = query
            .order_by_desc(transactions::Column::TransactionDate)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        Self::with_entries(&self.db, headers).await
    }

    async fn commit_posting(&self, posting: &Posting) -> StoreResult<()> {
        let txn = self.db.begin().await.map_err(store_error)?;

        let result = transactions::Entity::update_many()
            .col_expr(
                transactions::Column::Status,
                transactions::Column::Status.save_as(Expr::val(db_enums::TransactionStatus::Posted)),
            )
            .col_expr(transactions::Column::PostedBy, Expr::value(posting.posted_by.clone()))
            .col_expr(transactions::Column::PostedAt, Expr::value(posting.posted_at))
            .filter(transactions::Column::Id.eq(posting.transaction_id.into_inner()))
            .filter(transactions::Column::Status.eq(db_enums::TransactionStatus::Pending))
            .exec(&txn)
            .await
            .map_err(store_error)?;

        if result.rows_affected == 0 {
            let err = Self::stale_or_missing(&txn, posting.transaction_id).await;
            txn.rollback().await.map_err(store_error)?;
            return Err(err);
        }

        Self::apply_deltas(&txn, &posting.deltas).await?;
        txn.commit().await.map_err(store_error)?;
        Ok(())
    }

    async fn commit_reversal(&self, reversal: &ReversalCommit) -> StoreResult<()> {
        let txn = self.db.begin().await.map_err(store_error)?;

        // The mirror goes in first so the original can reference it
        if let Some(mirror) = &reversal.mirror {
            Self::insert_with_entries(&txn, mirror).await?;
        }

        let result = transactions::Entity::update_many()
            .col_expr(
                transactions::Column::Status,
                transactions::Column::Status.save_as(Expr::val(db_enums::TransactionStatus::Reversed)),
            )
            .col_expr(transactions::Column::ReversedBy, Expr::value(reversal.reversed_by.clone()))
            .col_expr(transactions::Column::ReversedAt, Expr::value(reversal.reversed_at))
            .col_expr(
                transactions::Column::ReversedByTransactionId,
                Expr::value(reversal.mirror.as_ref().map(|m| m.id.into_inner())),
            )
            .filter(transactions::Column::Id.eq(reversal.original_id.into_inner()))
            .filter(
                transactions::Column::Status.eq(db_enums::TransactionStatus::from(reversal.expected_status)),
            )
            .exec(&txn)
            .await
            .map_err(store_error)?;

        if result.rows_affected == 0 {
            let err = Self::stale_or_missing(&txn, reversal.original_id).await;
            txn.rollback().await.map_err(store_error)?;
            return Err(err);
        }

        Self::apply_deltas(&txn, &reversal.deltas).await?;
        txn.commit().await.map_err(store_error)?;
        Ok(())
    }
}

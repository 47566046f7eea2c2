//! Balance reads over running and monthly balances.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tally_core::balance::{AccountBalance, BalanceQuery, PeriodBalance, PeriodKey};
use tally_core::store::{BalanceStore, StoreError, StoreResult};
use tally_shared::types::AccountId;

use crate::entities::{account_period_balances, chart_of_accounts};
use crate::error::store_error;

/// PostgreSQL-backed [`BalanceStore`].
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BalanceStore for BalanceRepository {
    async fn current_balances(&self, account_id: Option<AccountId>) -> StoreResult<Vec<AccountBalance>> {
        let mut query = chart_of_accounts::Entity::find();
        if let Some(id) = account_id {
            query = query.filter(chart_of_accounts::Column::Id.eq(id.into_inner()));
        }

        let accounts = query.all(&self.db).await.map_err(store_error)?;
        Ok(accounts
            .into_iter()
            .map(|a| AccountBalance {
                account_id: AccountId::from(a.id),
                balance: a.balance,
            })
            .collect())
    }

    async fn period_balances(&self, query: &BalanceQuery) -> StoreResult<Vec<PeriodBalance>> {
        let mut select = account_period_balances::Entity::find();
        if let Some(id) = query.account_id {
            select = select.filter(account_period_balances::Column::AccountId.eq(id.into_inner()));
        }
        if let Some(through) = query.through {
            let last = through
                .first_day()
                .ok_or_else(|| StoreError::Query(format!("period {through} out of range")))?;
            select = select.filter(account_period_balances::Column::PeriodStart.lte(last));
        }

        let rows = select
            .order_by_asc(account_period_balances::Column::AccountId)
            .order_by_asc(account_period_balances::Column::PeriodStart)
            .all(&self.db)
            .await
            .map_err(store_error)?;

        Ok(rows
            .into_iter()
            .map(|row| PeriodBalance {
                account_id: AccountId::from(row.account_id),
                period: PeriodKey::from_date(row.period_start),
                delta: row.delta,
            })
            .collect())
    }
}

//! Account repository for chart of accounts database operations.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use tally_core::accounts::Account;
use tally_core::store::{AccountStore, StoreError, StoreResult};
use tally_shared::types::AccountId;

use crate::entities::chart_of_accounts;
use crate::error::store_error;

/// PostgreSQL-backed [`AccountStore`].
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Accounts holding `code`, the active one first, then most recently updated.
    async fn find_ranked_by_code(&self, code: &str) -> StoreResult<Option<Account>> {
        let model = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::Code.eq(code))
            .order_by_desc(chart_of_accounts::Column::IsActive)
            .order_by_desc(chart_of_accounts::Column::UpdatedAt)
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(to_account))
    }
}

fn to_account(model: chart_of_accounts::Model) -> Account {
    Account {
        id: AccountId::from(model.id),
        code: model.code,
        name: model.name,
        account_type: model.account_type.into(),
        parent_id: model.parent_id.map(AccountId::from),
        balance: model.balance,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find_account_by_code(&self, code: &str) -> StoreResult<Option<Account>> {
        self.find_ranked_by_code(code).await
    }

    async fn find_account_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let model = chart_of_accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(to_account))
    }

    async fn find_accounts_by_codes(&self, codes: &[String]) -> StoreResult<Vec<Account>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let models = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::Code.is_in(codes.iter().map(String::as_str)))
            .order_by_asc(chart_of_accounts::Column::Code)
            .order_by_desc(chart_of_accounts::Column::IsActive)
            .order_by_desc(chart_of_accounts::Column::UpdatedAt)
            .all(&self.db)
            .await
            .map_err(store_error)?;

        // Rows arrive ranked per code, keep the first of each
        let mut accounts: Vec<Account> = Vec::with_capacity(codes.len());
        for model in models {
            if accounts.last().is_none_or(|a| a.code != model.code) {
                accounts.push(to_account(model));
            }
        }
        Ok(accounts)
    }

    async fn insert_account_if_absent(&self, account: Account) -> StoreResult<(Account, bool)> {
        let code = account.code.clone();
        let model = chart_of_accounts::ActiveModel {
            id: Set(account.id.into_inner()),
            code: Set(account.code),
            name: Set(account.name),
            account_type: Set(account.account_type.into()),
            parent_id: Set(account.parent_id.map(AccountId::into_inner)),
            balance: Set(account.balance),
            is_active: Set(account.is_active),
            created_at: Set(account.created_at.into()),
            updated_at: Set(account.updated_at.into()),
        };

        // A concurrent seeder may win the race for the active code
        let inserted = chart_of_accounts::Entity::insert(model)
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;

        let stored = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::Code.eq(code.as_str()))
            .filter(chart_of_accounts::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(store_error)?
            .ok_or_else(|| StoreError::NotFound(format!("account {code}")))?;

        Ok((to_account(stored), inserted > 0))
    }

    async fn deactivate_account(&self, id: AccountId) -> StoreResult<Account> {
        let model = chart_of_accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")))?;

        let mut active = model.into_active_model();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&self.db).await.map_err(store_error)?;

        Ok(to_account(updated))
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let models = chart_of_accounts::Entity::find()
            .order_by_asc(chart_of_accounts::Column::Code)
            .order_by_asc(chart_of_accounts::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        Ok(models.into_iter().map(to_account).collect())
    }
}

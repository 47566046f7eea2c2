//! Account registry service.

use std::sync::Arc;

use tally_shared::types::AccountId;
use tracing::{debug, info, instrument};

use super::chart::ChartAccount;
use super::tree::AccountTree;
use super::types::{Account, AccountType, SeedSummary};
use crate::ledger::{LedgerError, ValidationError};
use crate::store::AccountStore;

/// Looks up, creates and deactivates chart accounts.
#[derive(Clone)]
pub struct AccountRegistry {
    store: Arc<dyn AccountStore>,
}

impl AccountRegistry {
    /// Creates a registry over a store.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Looks up an account by code.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if no account has this code.
    pub async fn get_by_code(&self, code: &str) -> Result<Account, LedgerError> {
        self.store
            .find_account_by_code(code.trim())
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
    }

    /// Looks up an account by ID.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if the ID is unknown.
    pub async fn get_by_id(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .find_account_by_id(id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    /// Creates an account, or returns the active account already holding `code`.
    ///
    /// # Errors
    ///
    /// `Validation` for blank fields or a parent code that does not resolve.
    #[instrument(skip(self, name))]
    pub async fn create(
        &self,
        code: &str,
        name: &str,
        account_type: AccountType,
        parent_code: Option<&str>,
    ) -> Result<Account, LedgerError> {
        Ok(self.create_inner(code, name, account_type, parent_code).await?.0)
    }

    /// Same as [`Self::create`], normalizing a free-form type string first.
    ///
    /// # Errors
    ///
    /// `Validation` for an unknown type string, plus everything `create` returns.
    pub async fn create_from_str(
        &self,
        code: &str,
        name: &str,
        account_type: &str,
        parent_code: Option<&str>,
    ) -> Result<Account, LedgerError> {
        let account_type: AccountType = account_type.parse()?;
        self.create(code, name, account_type, parent_code).await
    }

    /// Soft-deactivates an account. Its history and balance are kept.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if no account has this code.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, code: &str) -> Result<Account, LedgerError> {
        let account = self.get_by_code(code).await?;
        if !account.is_active {
            return Ok(account);
        }
        let account = self.store.deactivate_account(account.id).await?;
        info!(code = %account.code, "account deactivated");
        Ok(account)
    }

    /// Seeds a chart. Existing accounts, and their balances, are left untouched.
    ///
    /// Parents must appear before their children in `chart`.
    ///
    /// # Errors
    ///
    /// Stops at the first entry that fails to create.
    #[instrument(skip_all, fields(accounts = chart.len()))]
    pub async fn ensure_required_accounts_exist(
        &self,
        chart: &[ChartAccount],
    ) -> Result<SeedSummary, LedgerError> {
        let mut summary = SeedSummary::default();
        for entry in chart {
            let (_, created) = self
                .create_inner(entry.code, entry.name, entry.account_type, entry.parent_code)
                .await?;
            if created {
                summary.created += 1;
            } else {
                summary.existing += 1;
            }
        }
        info!(created = summary.created, existing = summary.existing, "chart of accounts ensured");
        Ok(summary)
    }

    /// All accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.store.list_accounts().await?)
    }

    /// Accounts grouped by type as parent/child trees.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn get_account_tree(&self) -> Result<AccountTree, LedgerError> {
        Ok(AccountTree::build(self.store.list_accounts().await?))
    }

    async fn create_inner(
        &self,
        code: &str,
        name: &str,
        account_type: AccountType,
        parent_code: Option<&str>,
    ) -> Result<(Account, bool), LedgerError> {
        let code = code.trim();
        let name = name.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyField("code").into());
        }
        if name.is_empty() {
            return Err(ValidationError::EmptyField("name").into());
        }

        if let Some(existing) = self.store.find_account_by_code(code).await?
            && existing.is_active
        {
            return Ok((existing, false));
        }

        let parent_id = match parent_code.map(str::trim).filter(|p| !p.is_empty()) {
            Some(parent_code) => {
                let parent = self
                    .store
                    .find_account_by_code(parent_code)
                    .await?
                    .ok_or_else(|| ValidationError::ParentNotFound(parent_code.to_string()))?;
                Some(parent.id)
            }
            None => None,
        };

        let (account, created) = self
            .store
            .insert_account_if_absent(Account::new(code, name, account_type, parent_id))
            .await?;
        if created {
            debug!(code, account_type = %account_type, "account created");
        }
        Ok((account, created))
    }
}

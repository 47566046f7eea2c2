//! `SeaORM` mappings for the PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use tally_core::accounts::AccountType as CoreAccountType;
use tally_core::ledger::{SourceModule as CoreSourceModule, TransactionStatus as CoreStatus};
use tally_core::sync::SyncStatus as CoreSyncStatus;

/// `account_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
pub enum AccountType {
    #[sea_orm(string_value = "asset")]
    Asset,
    #[sea_orm(string_value = "liability")]
    Liability,
    #[sea_orm(string_value = "equity")]
    Equity,
    #[sea_orm(string_value = "revenue")]
    Revenue,
    #[sea_orm(string_value = "expense")]
    Expense,
}

/// `transaction_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "posted")]
    Posted,
    #[sea_orm(string_value = "reversed")]
    Reversed,
}

/// `source_module`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "source_module")]
pub enum SourceModule {
    #[sea_orm(string_value = "momo")]
    Momo,
    #[sea_orm(string_value = "agency-banking")]
    AgencyBanking,
    #[sea_orm(string_value = "commissions")]
    Commissions,
    #[sea_orm(string_value = "expenses")]
    Expenses,
    #[sea_orm(string_value = "manual")]
    Manual,
}

/// `sync_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "sync_status")]
pub enum SyncStatus {
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "partial")]
    Partial,
}

impl From<CoreAccountType> for AccountType {
    fn from(value: CoreAccountType) -> Self {
        match value {
            CoreAccountType::Asset => Self::Asset,
            CoreAccountType::Liability => Self::Liability,
            CoreAccountType::Equity => Self::Equity,
            CoreAccountType::Revenue => Self::Revenue,
            CoreAccountType::Expense => Self::Expense,
        }
    }
}

impl From<AccountType> for CoreAccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Asset => Self::Asset,
            AccountType::Liability => Self::Liability,
            AccountType::Equity => Self::Equity,
            AccountType::Revenue => Self::Revenue,
            AccountType::Expense => Self::Expense,
        }
    }
}

impl From<CoreStatus> for TransactionStatus {
    fn from(value: CoreStatus) -> Self {
        match value {
            CoreStatus::Pending => Self::Pending,
            CoreStatus::Posted => Self::Posted,
            CoreStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<TransactionStatus> for CoreStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Pending => Self::Pending,
            TransactionStatus::Posted => Self::Posted,
            TransactionStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<CoreSourceModule> for SourceModule {
    fn from(value: CoreSourceModule) -> Self {
        match value {
            CoreSourceModule::Momo => Self::Momo,
            CoreSourceModule::AgencyBanking => Self::AgencyBanking,
            CoreSourceModule::Commissions => Self::Commissions,
            CoreSourceModule::Expenses => Self::Expenses,
            CoreSourceModule::Manual => Self::Manual,
        }
    }
}

impl From<SourceModule> for CoreSourceModule {
    fn from(value: SourceModule) -> Self {
        match value {
            SourceModule::Momo => Self::Momo,
            SourceModule::AgencyBanking => Self::AgencyBanking,
            SourceModule::Commissions => Self::Commissions,
            SourceModule::Expenses => Self::Expenses,
            SourceModule::Manual => Self::Manual,
        }
    }
}

impl From<CoreSyncStatus> for SyncStatus {
    fn from(value: CoreSyncStatus) -> Self {
        match value {
            CoreSyncStatus::Success => Self::Success,
            CoreSyncStatus::Failed => Self::Failed,
            CoreSyncStatus::Partial => Self::Partial,
        }
    }
}

impl From<SyncStatus> for CoreSyncStatus {
    fn from(value: SyncStatus) -> Self {
        match value {
            SyncStatus::Success => Self::Success,
            SyncStatus::Failed => Self::Failed,
            SyncStatus::Partial => Self::Partial,
        }
    }
}

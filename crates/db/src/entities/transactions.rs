//! `SeaORM` Entity for the transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{SourceModule, TransactionStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_date: Date,
    pub source_module: SourceModule,
    pub source_transaction_id: String,
    pub source_transaction_type: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: TransactionStatus,
    pub created_by: String,
    pub created_at: DateTimeWithTimeZone,
    pub posted_by: Option<String>,
    pub posted_at: Option<DateTimeWithTimeZone>,
    pub reversed_by: Option<String>,
    pub reversed_at: Option<DateTimeWithTimeZone>,
    pub reverses_transaction_id: Option<Uuid>,
    pub reversed_by_transaction_id: Option<Uuid>,
    pub branch_id: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    LedgerEntries,
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

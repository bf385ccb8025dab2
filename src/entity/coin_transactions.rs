//! 金币账本
//!
//! 只追加。`amount` 有符号（入账为正，扣款为负），
//! `balance_after` 为本行生效后的余额。`reference` 唯一，
//! 同时作为支付入账的幂等键。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::transaction_metadata::TransactionMetadata;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coin_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text")]
    pub user_id: String,
    pub amount: i64,
    pub balance_after: i64,
    #[sea_orm(column_type = "Text")]
    pub kind: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Text", nullable, unique)]
    pub reference: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub metadata: Option<TransactionMetadata>,
    pub created_at: i64,
}

/// 余额变动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    CoinPurchase,
    ChapterUnlock,
    AdminAdjustment,
    Refund,
    Bonus,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::CoinPurchase => "coin_purchase",
            TransactionKind::ChapterUnlock => "chapter_unlock",
            TransactionKind::AdminAdjustment => "admin_adjustment",
            TransactionKind::Refund => "refund",
            TransactionKind::Bonus => "bonus",
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! 用户账户
//!
//! id 为上游认证服务的用户 ID。`coins` 为可用余额，
//! 每次变动都有对应的 `coin_transactions` 行。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub username: Option<String>,
    pub coins: i64,
    #[sea_orm(column_type = "Text")]
    pub role: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Model {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }
}

/// 账户角色，以小写文本存放在 `users.role`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::coin_transactions::Entity")]
    CoinTransactions,
    #[sea_orm(has_many = "super::user_chapter_purchases::Entity")]
    UserChapterPurchases,
    #[sea_orm(has_many = "super::reading_history::Entity")]
    ReadingHistory,
    #[sea_orm(has_one = "super::subscriptions::Entity")]
    Subscriptions,
}

impl Related<super::coin_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CoinTransactions.def()
    }
}

impl Related<super::user_chapter_purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserChapterPurchases.def()
    }
}

impl Related<super::reading_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReadingHistory.def()
    }
}

impl Related<super::subscriptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

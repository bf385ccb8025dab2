//! 第三方订阅状态
//!
//! 对应支付方的订阅对象，只由 webhook 处理函数写入。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text", unique)]
    pub user_id: String,
    #[sea_orm(column_type = "Text", unique)]
    pub provider_subscription_id: String,
    #[sea_orm(column_type = "Text")]
    pub status: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub plan: Option<String>,
    pub current_period_end: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// 可阅读付费章节的订阅状态
pub const ACTIVE_STATUSES: [&str; 2] = ["active", "trialing"];

impl Model {
    /// 状态有效，且（若有）当前周期尚未结束
    pub fn is_active_at(&self, now: i64) -> bool {
        ACTIVE_STATUSES.contains(&self.status.as_str())
            && self.current_period_end.is_none_or(|end| end > now)
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

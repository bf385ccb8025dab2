//! 可购买的金币套餐

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coin_packages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    pub coins: i64,
    pub bonus_coins: i64,
    pub price_cents: i64,
    #[sea_orm(column_type = "Text")]
    pub currency: String,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Model {
    /// 购买一次该套餐入账的金币数
    pub fn total_coins(&self) -> i64 {
        self.coins + self.bonus_coins
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

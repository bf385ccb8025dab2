//! 章节
//!
//! `coin_price` 非零的付费章节，须先解锁（金币或管理员授予）
//! 或有有效订阅，才返回页面。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::chapter_pages::ChapterPages;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chapters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub manhwa_id: i32,
    pub number: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub title: Option<String>,
    pub is_premium: bool,
    pub coin_price: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub pages: Option<ChapterPages>,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Model {
    /// 阅读该章节是否需要付费
    pub fn requires_unlock(&self) -> bool {
        self.is_premium && self.coin_price > 0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::manhwa::Entity",
        from = "Column::ManhwaId",
        to = "super::manhwa::Column::Id",
        on_delete = "Cascade"
    )]
    Manhwa,
    #[sea_orm(has_many = "super::user_chapter_purchases::Entity")]
    UserChapterPurchases,
}

impl Related<super::manhwa::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manhwa.def()
    }
}

impl Related<super::user_chapter_purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserChapterPurchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

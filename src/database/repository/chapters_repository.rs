use crate::database::dto::{InsertChapterData, UpdateChapterData};
use crate::entity::chapters;
use crate::entity::prelude::*;
use sea_orm::*;

/// 章节仓库
pub struct ChaptersRepository;

impl ChaptersRepository {
    pub async fn insert(
        db: &DatabaseConnection,
        data: InsertChapterData,
    ) -> Result<chapters::Model, DbErr> {
        let now = chrono::Utc::now().timestamp();

        let chapter = chapters::ActiveModel {
            id: NotSet,
            manhwa_id: Set(data.manhwa_id),
            number: Set(data.number),
            title: Set(data.title),
            is_premium: Set(data.is_premium),
            coin_price: Set(data.coin_price),
            pages: Set(data.pages),
            published_at: Set(data.published_at),
            created_at: Set(now),
            updated_at: Set(now),
        };

        chapter.insert(db).await
    }

    /// 部分更新。改价不影响已有的解锁记录
    pub async fn update(
        db: &DatabaseConnection,
        id: i32,
        updates: UpdateChapterData,
    ) -> Result<chapters::Model, DbErr> {
        let chapter = chapters::ActiveModel {
            id: Unchanged(id),
            number: updates.number.map_or(NotSet, Set),
            title: updates.title.map_or(NotSet, Set),
            is_premium: updates.is_premium.map_or(NotSet, Set),
            coin_price: updates.coin_price.map_or(NotSet, Set),
            pages: updates.pages.map_or(NotSet, Set),
            published_at: updates.published_at.map_or(NotSet, Set),
            updated_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };

        chapter.update(db).await
    }

    pub async fn delete<C>(db: &C, id: i32) -> Result<DeleteResult, DbErr>
    where
        C: ConnectionTrait,
    {
        Chapters::delete_by_id(id).exec(db).await
    }

    pub async fn find_by_id<C>(db: &C, id: i32) -> Result<Option<chapters::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Chapters::find_by_id(id).one(db).await
    }

    /// 作品的章节，按阅读顺序
    pub async fn list_by_manhwa(
        db: &DatabaseConnection,
        manhwa_id: i32,
    ) -> Result<Vec<chapters::Model>, DbErr> {
        Chapters::find()
            .filter(chapters::Column::ManhwaId.eq(manhwa_id))
            .order_by_asc(chapters::Column::Number)
            .all(db)
            .await
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, DbErr> {
        Chapters::find().count(db).await
    }
}

use crate::entity::prelude::*;
use crate::entity::chapters;
use crate::entity::user_chapter_purchases::{self, EntitlementSource};
use sea_orm::*;

/// 章节解锁仓库
pub struct PurchasesRepository;

impl PurchasesRepository {
    pub async fn find<C>(
        db: &C,
        user_id: &str,
        chapter_id: i32,
    ) -> Result<Option<user_chapter_purchases::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        UserChapterPurchases::find()
            .filter(
                user_chapter_purchases::Column::UserId
                    .eq(user_id)
                    .and(user_chapter_purchases::Column::ChapterId.eq(chapter_id)),
            )
            .one(db)
            .await
    }

    /// 已解锁时会因唯一约束失败
    pub async fn insert<C>(
        db: &C,
        user_id: &str,
        chapter_id: i32,
        coins_spent: i64,
        source: EntitlementSource,
    ) -> Result<user_chapter_purchases::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let row = user_chapter_purchases::ActiveModel {
            id: NotSet,
            user_id: Set(user_id.to_string()),
            chapter_id: Set(chapter_id),
            coins_spent: Set(coins_spent),
            source: Set(source.as_str().to_string()),
            created_at: Set(chrono::Utc::now().timestamp()),
        };

        row.insert(db).await
    }

    pub async fn delete<C>(db: &C, id: i32) -> Result<DeleteResult, DbErr>
    where
        C: ConnectionTrait,
    {
        UserChapterPurchases::delete_by_id(id).exec(db).await
    }

    /// 用户的解锁记录，最新在前
    pub async fn list_by_user(
        db: &DatabaseConnection,
        user_id: &str,
    ) -> Result<Vec<user_chapter_purchases::Model>, DbErr> {
        UserChapterPurchases::find()
            .filter(user_chapter_purchases::Column::UserId.eq(user_id))
            .order_by_desc(user_chapter_purchases::Column::Id)
            .all(db)
            .await
    }

    /// `chapter_ids` 中用户已拥有的章节
    pub async fn owned_chapter_ids(
        db: &DatabaseConnection,
        user_id: &str,
        chapter_ids: Vec<i32>,
    ) -> Result<Vec<i32>, DbErr> {
        if chapter_ids.is_empty() {
            return Ok(Vec::new());
        }

        UserChapterPurchases::find()
            .select_only()
            .column(user_chapter_purchases::Column::ChapterId)
            .filter(user_chapter_purchases::Column::UserId.eq(user_id))
            .filter(user_chapter_purchases::Column::ChapterId.is_in(chapter_ids))
            .into_tuple::<i32>()
            .all(db)
            .await
    }

    /// 单个章节的解锁数
    pub async fn count_by_chapter<C>(db: &C, chapter_id: i32) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        UserChapterPurchases::find()
            .filter(user_chapter_purchases::Column::ChapterId.eq(chapter_id))
            .count(db)
            .await
    }

    /// 作品下所有章节的解锁数
    pub async fn count_by_manhwa<C>(db: &C, manhwa_id: i32) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        UserChapterPurchases::find()
            .inner_join(Chapters)
            .filter(chapters::Column::ManhwaId.eq(manhwa_id))
            .count(db)
            .await
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, DbErr> {
        UserChapterPurchases::find().count(db).await
    }
}

use crate::entity::prelude::*;
use crate::entity::reading_history;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

/// 阅读进度仓库
pub struct ReadingHistoryRepository;

impl ReadingHistoryRepository {
    /// 每个 (user, chapter) 一行，后续阅读覆盖进度和时间
    pub async fn upsert(
        db: &DatabaseConnection,
        user_id: &str,
        manhwa_id: i32,
        chapter_id: i32,
        progress: f64,
    ) -> Result<reading_history::Model, DbErr> {
        let row = reading_history::ActiveModel {
            id: NotSet,
            user_id: Set(user_id.to_string()),
            manhwa_id: Set(manhwa_id),
            chapter_id: Set(chapter_id),
            progress: Set(progress.clamp(0.0, 100.0)),
            last_read_at: Set(chrono::Utc::now().timestamp()),
        };

        ReadingHistory::insert(row)
            .on_conflict(
                OnConflict::columns([
                    reading_history::Column::UserId,
                    reading_history::Column::ChapterId,
                ])
                .update_columns([
                    reading_history::Column::ManhwaId,
                    reading_history::Column::Progress,
                    reading_history::Column::LastReadAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        ReadingHistory::find()
            .filter(
                reading_history::Column::UserId
                    .eq(user_id)
                    .and(reading_history::Column::ChapterId.eq(chapter_id)),
            )
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Reading history not found".to_string()))
    }

    /// 最近阅读在前
    pub async fn list_recent(
        db: &DatabaseConnection,
        user_id: &str,
        limit: u64,
    ) -> Result<Vec<reading_history::Model>, DbErr> {
        ReadingHistory::find()
            .filter(reading_history::Column::UserId.eq(user_id))
            .order_by_desc(reading_history::Column::LastReadAt)
            .order_by_desc(reading_history::Column::Id)
            .limit(limit)
            .all(db)
            .await
    }

    pub async fn delete(
        db: &DatabaseConnection,
        user_id: &str,
        chapter_id: i32,
    ) -> Result<DeleteResult, DbErr> {
        ReadingHistory::delete_many()
            .filter(
                reading_history::Column::UserId
                    .eq(user_id)
                    .and(reading_history::Column::ChapterId.eq(chapter_id)),
            )
            .exec(db)
            .await
    }
}

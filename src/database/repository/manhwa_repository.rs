use crate::database::dto::{InsertManhwaData, Pagination, UpdateManhwaData};
use crate::entity::manhwa;
use crate::entity::prelude::*;
use sea_orm::*;

/// 作品仓库
pub struct ManhwaRepository;

impl ManhwaRepository {
    // ==================== CRUD ====================

    pub async fn insert(
        db: &DatabaseConnection,
        data: InsertManhwaData,
    ) -> Result<manhwa::Model, DbErr> {
        let now = chrono::Utc::now().timestamp();

        let series = manhwa::ActiveModel {
            id: NotSet,
            title: Set(data.title),
            slug: Set(data.slug),
            description: Set(data.description),
            cover_url: Set(data.cover_url),
            author: Set(data.author),
            status: Set(data.status.unwrap_or_else(|| "ongoing".to_string())),
            genres: Set(data.genres),
            created_at: Set(now),
            updated_at: Set(now),
        };

        series.insert(db).await
    }

    /// 部分更新，未提供的字段保持不变
    pub async fn update(
        db: &DatabaseConnection,
        id: i32,
        updates: UpdateManhwaData,
    ) -> Result<manhwa::Model, DbErr> {
        let series = manhwa::ActiveModel {
            id: Unchanged(id),
            title: updates.title.map_or(NotSet, Set),
            slug: updates.slug.map_or(NotSet, Set),
            description: updates.description.map_or(NotSet, Set),
            cover_url: updates.cover_url.map_or(NotSet, Set),
            author: updates.author.map_or(NotSet, Set),
            status: updates.status.map_or(NotSet, Set),
            genres: updates.genres.map_or(NotSet, Set),
            updated_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };

        series.update(db).await
    }

    /// 删除作品会级联删除其章节
    pub async fn delete<C>(db: &C, id: i32) -> Result<DeleteResult, DbErr>
    where
        C: ConnectionTrait,
    {
        Manhwa::delete_by_id(id).exec(db).await
    }

    // ==================== Queries ====================

    pub async fn find_by_id(db: &DatabaseConnection, id: i32) -> Result<Option<manhwa::Model>, DbErr> {
        Manhwa::find_by_id(id).one(db).await
    }

    pub async fn find_by_slug(
        db: &DatabaseConnection,
        slug: &str,
    ) -> Result<Option<manhwa::Model>, DbErr> {
        Manhwa::find()
            .filter(manhwa::Column::Slug.eq(slug))
            .one(db)
            .await
    }

    /// 标题搜索，最近更新在前
    pub async fn list(
        db: &DatabaseConnection,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<Vec<manhwa::Model>, DbErr> {
        Self::search_query(search)
            .order_by_desc(manhwa::Column::UpdatedAt)
            .order_by_asc(manhwa::Column::Id)
            .limit(page.limit())
            .offset(page.offset())
            .all(db)
            .await
    }

    /// 匹配 `search` 的作品数（`None` 时为全部）
    pub async fn count(db: &DatabaseConnection, search: Option<&str>) -> Result<u64, DbErr> {
        Self::search_query(search).count(db).await
    }

    fn search_query(search: Option<&str>) -> Select<Manhwa> {
        let query = Manhwa::find();
        match search.map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => query.filter(manhwa::Column::Title.contains(term)),
            None => query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::test_connection;

    fn series(title: &str, slug: &str) -> InsertManhwaData {
        InsertManhwaData {
            title: title.to_string(),
            slug: slug.to_string(),
            description: None,
            cover_url: None,
            author: None,
            status: None,
            genres: None,
        }
    }

    #[tokio::test]
    async fn insert_defaults_status() {
        let db = test_connection().await;
        let created = ManhwaRepository::insert(&db, series("Tower Climb", "tower-climb"))
            .await
            .unwrap();
        assert_eq!(created.status, "ongoing");
        assert!(
            ManhwaRepository::find_by_slug(&db, "tower-climb")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let db = test_connection().await;
        let mut data = series("Tower Climb", "tower-climb");
        data.author = Some("Kim".to_string());
        let created = ManhwaRepository::insert(&db, data).await.unwrap();

        let updated = ManhwaRepository::update(
            &db,
            created.id,
            UpdateManhwaData {
                status: Some("completed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.status, "completed");
        assert_eq!(updated.author.as_deref(), Some("Kim"));
        assert_eq!(updated.title, "Tower Climb");
    }

    #[tokio::test]
    async fn list_filters_by_title() {
        let db = test_connection().await;
        ManhwaRepository::insert(&db, series("Tower Climb", "tower-climb"))
            .await
            .unwrap();
        ManhwaRepository::insert(&db, series("Night Market", "night-market"))
            .await
            .unwrap();

        let found = ManhwaRepository::list(&db, Some("Night"), Pagination::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "night-market");
    }
}

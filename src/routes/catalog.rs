use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;

use super::Page;
use crate::auth::MaybeUser;
use crate::database::dto::CatalogQuery;
use crate::database::repository::{
    chapters_repository::ChaptersRepository, manhwa_repository::ManhwaRepository,
    purchases_repository::PurchasesRepository,
};
use crate::entity::{chapters, manhwa};
use crate::error::AppError;
use crate::state::AppState;

/// 章节列表项；页面只通过章节接口返回
#[derive(Debug, Serialize)]
pub struct ChapterSummary {
    pub id: i32,
    pub number: i32,
    pub title: Option<String>,
    pub is_premium: bool,
    pub coin_price: i64,
    pub page_count: usize,
    pub published_at: Option<i64>,
    /// 调用者是否已解锁；匿名调用时始终为 false
    pub owned: bool,
}

impl From<chapters::Model> for ChapterSummary {
    fn from(chapter: chapters::Model) -> Self {
        Self {
            id: chapter.id,
            number: chapter.number,
            title: chapter.title,
            is_premium: chapter.is_premium,
            coin_price: chapter.coin_price,
            page_count: chapter.pages.as_ref().map_or(0, |pages| pages.len()),
            published_at: chapter.published_at,
            owned: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ManhwaDetail {
    #[serde(flatten)]
    pub manhwa: manhwa::Model,
    pub chapters: Vec<ChapterSummary>,
}

pub async fn list_manhwa_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Page<manhwa::Model>>, AppError> {
    let page = query.pagination();
    let items = ManhwaRepository::list(&state.db, query.search(), page).await?;
    let total = ManhwaRepository::count(&state.db, query.search()).await?;

    Ok(Json(Page {
        items,
        total,
        limit: page.limit(),
        offset: page.offset(),
    }))
}

pub async fn get_manhwa_handler(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i32>,
) -> Result<Json<ManhwaDetail>, AppError> {
    let manhwa = ManhwaRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Manhwa {id}")))?;
    let mut chapters: Vec<ChapterSummary> = ChaptersRepository::list_by_manhwa(&state.db, id)
        .await?
        .into_iter()
        .map(ChapterSummary::from)
        .collect();

    if let Some(viewer) = viewer {
        let ids = chapters.iter().map(|c| c.id).collect();
        let owned = PurchasesRepository::owned_chapter_ids(&state.db, &viewer, ids).await?;
        for chapter in &mut chapters {
            chapter.owned = owned.contains(&chapter.id);
        }
    }

    Ok(Json(ManhwaDetail { manhwa, chapters }))
}

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::database::repository::{
    chapters_repository::ChaptersRepository, purchases_repository::PurchasesRepository,
};
use crate::database::service::{ChapterAccess, CoinLedger, PurchaseOutcome};
use crate::entity::{chapters, user_chapter_purchases};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChapterContent {
    #[serde(flatten)]
    pub chapter: chapters::Model,
    pub access: ChapterAccess,
}

/// 返回章节及页面，未解锁时返回 402 和解锁信息
pub async fn read_chapter_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ChapterContent>, AppError> {
    let access = CoinLedger::chapter_access(&state.db, user.id(), id).await?;
    if !access.has_access {
        return Err(AppError::ChapterLocked(Box::new(access)));
    }

    let chapter = ChaptersRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Chapter {id}")))?;

    Ok(Json(ChapterContent { chapter, access }))
}

pub async fn access_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ChapterAccess>, AppError> {
    Ok(Json(
        CoinLedger::chapter_access(&state.db, user.id(), id).await?,
    ))
}

pub async fn purchase_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<PurchaseOutcome>, AppError> {
    Ok(Json(
        CoinLedger::purchase_chapter(&state.db, user.id(), id).await?,
    ))
}

pub async fn purchases_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<user_chapter_purchases::Model>>, AppError> {
    Ok(Json(
        PurchasesRepository::list_by_user(&state.db, user.id()).await?,
    ))
}

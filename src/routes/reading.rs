use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::auth::AuthUser;
use crate::database::dto::{Pagination, RecordProgressData};
use crate::database::repository::{
    chapters_repository::ChaptersRepository, reading_history_repository::ReadingHistoryRepository,
    subscriptions_repository::SubscriptionsRepository,
};
use crate::entity::{reading_history, subscriptions};
use crate::error::AppError;
use crate::state::AppState;

pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<reading_history::Model>>, AppError> {
    Ok(Json(
        ReadingHistoryRepository::list_recent(&state.db, user.id(), page.limit()).await?,
    ))
}

pub async fn record_progress_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(data): Json<RecordProgressData>,
) -> Result<Json<reading_history::Model>, AppError> {
    if !data.progress.is_finite() {
        return Err(AppError::BadRequest("progress must be a number".to_string()));
    }

    let chapter = ChaptersRepository::find_by_id(&state.db, data.chapter_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Chapter {}", data.chapter_id)))?;

    let entry = ReadingHistoryRepository::upsert(
        &state.db,
        user.id(),
        chapter.manhwa_id,
        chapter.id,
        data.progress,
    )
    .await?;

    Ok(Json(entry))
}

pub async fn forget_progress_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chapter_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let result = ReadingHistoryRepository::delete(&state.db, user.id(), chapter_id).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "Reading history for chapter {chapter_id}"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// 调用者的订阅，没有时为 `null`
pub async fn subscription_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Option<subscriptions::Model>>, AppError> {
    Ok(Json(
        SubscriptionsRepository::find_by_user(&state.db, user.id()).await?,
    ))
}

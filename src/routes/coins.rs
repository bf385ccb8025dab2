use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Serialize;

use super::Page;
use crate::auth::AuthUser;
use crate::database::dto::Pagination;
use crate::database::repository::{
    ledger_repository::LedgerRepository, packages_repository::PackagesRepository,
};
use crate::entity::{coin_packages, coin_transactions};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: String,
    pub coins: i64,
}

pub async fn balance_handler(AuthUser(user): AuthUser) -> Json<BalanceResponse> {
    Json(BalanceResponse {
        user_id: user.id,
        coins: user.coins,
    })
}

/// 账本记录，最新在前
pub async fn transactions_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Page<coin_transactions::Model>>, AppError> {
    let items = LedgerRepository::list_by_user(&state.db, user.id(), page).await?;
    let total = LedgerRepository::count_by_user(&state.db, user.id()).await?;

    Ok(Json(Page {
        items,
        total,
        limit: page.limit(),
        offset: page.offset(),
    }))
}

pub async fn packages_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<coin_packages::Model>>, AppError> {
    Ok(Json(PackagesRepository::list_active(&state.db).await?))
}

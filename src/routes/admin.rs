//! 管理后台接口
//!
//! 每个处理函数都要求 [`AdminUser`]，非管理员在执行任何操作前即返回 403。
//! 余额变动与其他调用方一样经由金币账本。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use super::Page;
use crate::auth::AdminUser;
use crate::database::db::{BackupResult, backup_database};
use crate::database::dto::{
    AdjustBalanceData, CatalogQuery, InsertChapterData, InsertManhwaData, InsertPackageData,
    Pagination, UpdateChapterData, UpdateManhwaData, UpdatePackageData, UpdateUserData,
};
use crate::database::repository::{
    chapters_repository::ChaptersRepository, ledger_repository::LedgerRepository,
    manhwa_repository::ManhwaRepository, packages_repository::PackagesRepository,
    purchases_repository::PurchasesRepository, subscriptions_repository::SubscriptionsRepository,
    users_repository::UsersRepository,
};
use crate::database::service::{AdjustmentResult, BalanceAudit, CoinLedger, RefundResult};
use crate::entity::coin_transactions::TransactionKind;
use crate::entity::{chapters, coin_packages, manhwa, subscriptions, users};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::logs::{LogLevel, current_log_level, set_log_level};

// ==================== Users ====================

#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: users::Model,
    pub subscription: Option<subscriptions::Model>,
    pub chapters_owned: usize,
}

pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Page<users::Model>>, AppError> {
    let items = UsersRepository::list(&state.db, page).await?;
    let total = UsersRepository::count(&state.db).await?;

    Ok(Json(Page {
        items,
        total,
        limit: page.limit(),
        offset: page.offset(),
    }))
}

pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<UserDetail>, AppError> {
    let user = UsersRepository::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id}")))?;
    let subscription = SubscriptionsRepository::find_by_user(&state.db, &id).await?;
    let chapters_owned = PurchasesRepository::list_by_user(&state.db, &id).await?.len();

    Ok(Json(UserDetail {
        user,
        subscription,
        chapters_owned,
    }))
}

pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<String>,
    Json(updates): Json<UpdateUserData>,
) -> Result<Json<users::Model>, AppError> {
    let user = UsersRepository::update(&state.db, &id, updates)
        .await
        .map_err(|e| AppError::from_write(e, &format!("User {id}")))?;

    log::info!("管理员 {} 更新了用户 {}", admin.id(), id);
    Ok(Json(user))
}

pub async fn adjust_coins_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<String>,
    Json(data): Json<AdjustBalanceData>,
) -> Result<Json<AdjustmentResult>, AppError> {
    Ok(Json(
        CoinLedger::adjust_balance(&state.db, &id, data.delta, data.reason, admin.id()).await?,
    ))
}

pub async fn audit_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<BalanceAudit>, AppError> {
    Ok(Json(CoinLedger::audit_balance(&state.db, &id).await?))
}

pub async fn grant_chapter_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path((id, chapter_id)): Path<(String, i32)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let granted = CoinLedger::grant_chapter(&state.db, &id, chapter_id).await?;
    if granted {
        log::info!("管理员 {} 向用户 {} 授予章节 {}", admin.id(), id, chapter_id);
    }
    Ok(Json(serde_json::json!({ "granted": granted })))
}

pub async fn refund_chapter_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path((id, chapter_id)): Path<(String, i32)>,
) -> Result<Json<RefundResult>, AppError> {
    Ok(Json(
        CoinLedger::refund_chapter(&state.db, &id, chapter_id, admin.id()).await?,
    ))
}

// ==================== Catalog ====================

pub async fn list_manhwa_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
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

pub async fn create_manhwa_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(data): Json<InsertManhwaData>,
) -> Result<(StatusCode, Json<manhwa::Model>), AppError> {
    data.validate().map_err(AppError::BadRequest)?;
    let what = format!("Manhwa {}", data.slug);

    let series = ManhwaRepository::insert(&state.db, data)
        .await
        .map_err(|e| AppError::from_write(e, &what))?;

    Ok((StatusCode::CREATED, Json(series)))
}

pub async fn update_manhwa_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    Json(updates): Json<UpdateManhwaData>,
) -> Result<Json<manhwa::Model>, AppError> {
    updates.validate().map_err(AppError::BadRequest)?;

    let series = ManhwaRepository::update(&state.db, id, updates)
        .await
        .map_err(|e| AppError::from_write(e, &format!("Manhwa {id}")))?;

    Ok(Json(series))
}

pub async fn delete_manhwa_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;

    // 级联删除会丢失解锁记录且账本中没有退款
    let owners = PurchasesRepository::count_by_manhwa(&txn, id).await?;
    if owners > 0 {
        return Err(AppError::Conflict(format!(
            "Manhwa {id} has {owners} unlocked chapters; refund them first"
        )));
    }

    let result = ManhwaRepository::delete(&txn, id).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Manhwa {id}")));
    }
    txn.commit().await?;

    log::warn!("管理员 {} 删除了作品 {} 及其章节", admin.id(), id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_chapter_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(data): Json<InsertChapterData>,
) -> Result<(StatusCode, Json<chapters::Model>), AppError> {
    data.validate().map_err(AppError::BadRequest)?;
    let what = format!("Chapter {} of manhwa {}", data.number, data.manhwa_id);

    let chapter = ChaptersRepository::insert(&state.db, data)
        .await
        .map_err(|e| AppError::from_write(e, &what))?;

    Ok((StatusCode::CREATED, Json(chapter)))
}

pub async fn update_chapter_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    Json(updates): Json<UpdateChapterData>,
) -> Result<Json<chapters::Model>, AppError> {
    updates.validate().map_err(AppError::BadRequest)?;

    let chapter = ChaptersRepository::update(&state.db, id, updates)
        .await
        .map_err(|e| AppError::from_write(e, &format!("Chapter {id}")))?;

    Ok(Json(chapter))
}

pub async fn delete_chapter_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;

    let owners = PurchasesRepository::count_by_chapter(&txn, id).await?;
    if owners > 0 {
        return Err(AppError::Conflict(format!(
            "Chapter {id} is owned by {owners} users; refund them first"
        )));
    }

    let result = ChaptersRepository::delete(&txn, id).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Chapter {id}")));
    }
    txn.commit().await?;

    log::warn!("管理员 {} 删除了章节 {}", admin.id(), id);
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Coin packages ====================

pub async fn list_packages_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<coin_packages::Model>>, AppError> {
    Ok(Json(PackagesRepository::list_all(&state.db).await?))
}

pub async fn create_package_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(data): Json<InsertPackageData>,
) -> Result<(StatusCode, Json<coin_packages::Model>), AppError> {
    data.validate().map_err(AppError::BadRequest)?;
    let package = PackagesRepository::insert(&state.db, data).await?;
    Ok((StatusCode::CREATED, Json(package)))
}

pub async fn update_package_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    Json(updates): Json<UpdatePackageData>,
) -> Result<Json<coin_packages::Model>, AppError> {
    updates.validate().map_err(AppError::BadRequest)?;

    let package = PackagesRepository::update(&state.db, id, updates)
        .await
        .map_err(|e| AppError::from_write(e, &format!("Coin package {id}")))?;

    Ok(Json(package))
}

pub async fn delete_package_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let result = PackagesRepository::delete(&state.db, id).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Coin package {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Operations ====================

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub users: u64,
    pub manhwa: u64,
    pub chapters: u64,
    pub chapter_unlocks: u64,
    /// 所有余额之和
    pub coins_in_circulation: i64,
    pub coins_sold: i64,
    pub coins_spent: i64,
}

pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<DashboardStats>, AppError> {
    let db = &state.db;

    Ok(Json(DashboardStats {
        users: UsersRepository::count(db).await?,
        manhwa: ManhwaRepository::count(db, None).await?,
        chapters: ChaptersRepository::count(db).await?,
        chapter_unlocks: PurchasesRepository::count(db).await?,
        coins_in_circulation: UsersRepository::total_coins(db).await?,
        coins_sold: LedgerRepository::total_by_kind(db, TransactionKind::CoinPurchase).await?,
        coins_spent: -LedgerRepository::total_by_kind(db, TransactionKind::ChapterUnlock).await?,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogLevelBody {
    pub level: LogLevel,
}

#[derive(Debug, Deserialize)]
pub struct SetLogLevelBody {
    pub level: String,
}

pub async fn get_log_level_handler(_admin: AdminUser) -> Json<LogLevelBody> {
    Json(LogLevelBody {
        level: current_log_level(),
    })
}

pub async fn set_log_level_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<SetLogLevelBody>,
) -> Result<Json<LogLevelBody>, AppError> {
    let level = set_log_level(state.log_handle.as_ref(), &body.level)?;
    log::info!("管理员 {} 将日志级别设为 {:?}", admin.id(), level);
    Ok(Json(LogLevelBody { level }))
}

pub async fn backup_handler(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
) -> Result<Json<BackupResult>, AppError> {
    let result = backup_database(&state.db, &state.config.backup_dir).await?;
    log::info!("管理员 {} 请求数据库备份", admin.id());
    Ok(Json(result))
}

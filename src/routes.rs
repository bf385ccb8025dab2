use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::state::AppState;

pub mod admin;
pub mod catalog;
pub mod chapters;
pub mod coins;
pub mod reading;
pub mod webhooks;

/// 分页列表的一页
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_handler))
        .merge(reader_routes())
        .route("/api/webhooks/payments", post(webhooks::payment_webhook))
        .merge(admin_routes())
}

fn reader_routes() -> Router<Arc<AppState>> {
    Router::new()
        // 金币
        .route("/api/coins/balance", get(coins::balance_handler))
        .route("/api/coins/transactions", get(coins::transactions_handler))
        .route("/api/coins/packages", get(coins::packages_handler))
        // 作品目录
        .route("/api/manhwa", get(catalog::list_manhwa_handler))
        .route("/api/manhwa/{id}", get(catalog::get_manhwa_handler))
        // 章节
        .route("/api/chapters/{id}", get(chapters::read_chapter_handler))
        .route("/api/chapters/{id}/access", get(chapters::access_handler))
        .route("/api/chapters/{id}/purchase", post(chapters::purchase_handler))
        .route("/api/purchases", get(chapters::purchases_handler))
        // 阅读
        .route(
            "/api/reading-history",
            get(reading::history_handler).post(reading::record_progress_handler),
        )
        .route(
            "/api/reading-history/{chapter_id}",
            delete(reading::forget_progress_handler),
        )
        .route("/api/subscription", get(reading::subscription_handler))
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        // 用户
        .route("/api/admin/users", get(admin::list_users_handler))
        .route(
            "/api/admin/users/{id}",
            get(admin::get_user_handler).put(admin::update_user_handler),
        )
        .route("/api/admin/users/{id}/coins", post(admin::adjust_coins_handler))
        .route("/api/admin/users/{id}/audit", get(admin::audit_handler))
        .route(
            "/api/admin/users/{id}/chapters/{chapter_id}",
            post(admin::grant_chapter_handler).delete(admin::refund_chapter_handler),
        )
        // 作品目录
        .route(
            "/api/admin/manhwa",
            get(admin::list_manhwa_handler).post(admin::create_manhwa_handler),
        )
        .route(
            "/api/admin/manhwa/{id}",
            put(admin::update_manhwa_handler).delete(admin::delete_manhwa_handler),
        )
        .route("/api/admin/chapters", post(admin::create_chapter_handler))
        .route(
            "/api/admin/chapters/{id}",
            put(admin::update_chapter_handler).delete(admin::delete_chapter_handler),
        )
        // 套餐
        .route(
            "/api/admin/packages",
            get(admin::list_packages_handler).post(admin::create_package_handler),
        )
        .route(
            "/api/admin/packages/{id}",
            put(admin::update_package_handler).delete(admin::delete_package_handler),
        )
        // 运维
        .route("/api/admin/stats", get(admin::stats_handler))
        .route(
            "/api/admin/log-level",
            get(admin::get_log_level_handler).put(admin::set_log_level_handler),
        )
        .route("/api/admin/backup", post(admin::backup_handler))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub mod auth;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod payments;
pub mod routes;
pub mod state;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header::CONTENT_TYPE},
};
use migration::MigratorTrait;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Config;
use database::db;
use error::StartupError;
use state::AppState;
use utils::logs::init_logging;

/// 完整应用：路由、CORS 与请求追踪
pub fn build_router(state: Arc<AppState>) -> Router {
    let user_header = HeaderName::from_bytes(state.config.user_header.as_bytes())
        .unwrap_or_else(|_| HeaderName::from_static("x-user-id"));

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, user_header])
        .max_age(Duration::from_secs(60 * 60));

    if let Some(origin) = state.config.cors_origin.as_deref() {
        match origin.parse::<HeaderValue>() {
            Ok(origin) => cors = cors.allow_origin(origin),
            Err(_) => log::warn!("忽略无效的 CORS_ORIGIN {:?}", origin),
        }
    }

    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<(), StartupError> {
    let log_handle = init_logging(&config::log_filter());
    let config = Config::load()?;

    log::info!("正在连接数据库...");
    let conn = db::establish_connection(&config).await?;

    log::info!("正在执行数据库迁移...");
    migration::Migrator::up(&conn, None).await?;
    log::info!("数据库迁移完成");

    let address = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(conn.clone(), config, Some(log_handle));
    let app = build_router(state);

    let listener = TcpListener::bind(&address).await?;
    log::info!("服务已启动: {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("服务已停止，正在关闭数据库连接");
    match db::close_connection(conn).await {
        Ok(_) => log::info!("数据库连接已关闭"),
        Err(e) => log::error!("关闭数据库连接时出错: {}", e),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("无法注册 Ctrl+C 处理: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("收到 Ctrl+C，正在关闭");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                log::info!("收到终止信号，正在关闭");
            }
            Err(e) => {
                log::error!("无法注册信号处理: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{config::Config, utils::logs::LogHandle};

pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    /// 进程安装了全局 subscriber 时存在
    pub log_handle: Option<LogHandle>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, log_handle: Option<LogHandle>) -> Arc<Self> {
        Arc::new(Self {
            db,
            config,
            log_handle,
        })
    }
}

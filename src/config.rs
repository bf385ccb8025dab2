//! 进程配置
//!
//! 启动时从环境变量读取一次。未设置的变量使用默认值并记录日志，
//! 无法解析的值视为启动错误。

use std::{env, fmt::Display, fs, path::PathBuf, str::FromStr};

use log::{info, warn};
use thiserror::Error;

const DEFAULT_PORT: &str = "8080";
const DEFAULT_DB_PATH: &str = "data/manhwa_rush.db";
const DEFAULT_BACKUP_DIR: &str = "data/backups";
const DEFAULT_USER_HEADER: &str = "x-user-id";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("failed to read secret file {path}: {source}")]
    Secret {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// 完整连接 URL；未设置时由 `database_path` 构建
    pub database_url: Option<String>,
    pub database_path: PathBuf,
    pub max_connections: u32,
    /// 支付 webhook 签名密钥
    pub webhook_secret: String,
    pub webhook_tolerance_secs: i64,
    /// 认证网关写入已验证用户 ID 的请求头
    pub user_header: String,
    pub cors_origin: Option<String>,
    pub backup_dir: PathBuf,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            max_connections: 1,
            webhook_secret: String::new(),
            webhook_tolerance_secs: 300,
            user_header: DEFAULT_USER_HEADER.to_string(),
            cors_origin: None,
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let webhook_secret = match var("WEBHOOK_SECRET_FILE") {
            Some(path) => read_secret(&path)?,
            None => var("WEBHOOK_SECRET").unwrap_or_else(|| {
                warn!("未设置 WEBHOOK_SECRET，支付 webhook 将被拒绝");
                String::new()
            }),
        };

        Ok(Self {
            port: try_load("PORT", DEFAULT_PORT)?,
            database_url: var("DATABASE_URL"),
            database_path: try_load("DATABASE_PATH", DEFAULT_DB_PATH)?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "1")?,
            webhook_secret,
            webhook_tolerance_secs: try_load("WEBHOOK_TOLERANCE_SECS", "300")?,
            user_header: try_load("AUTH_USER_HEADER", DEFAULT_USER_HEADER)?,
            cors_origin: var("CORS_ORIGIN"),
            backup_dir: try_load("BACKUP_DIR", DEFAULT_BACKUP_DIR)?,
            log_filter: log_filter(),
        })
    }
}

/// 单独读取 `RUST_LOG`，使日志先于其余配置初始化
pub fn log_filter() -> String {
    var("RUST_LOG").unwrap_or_else(|| "info".to_string())
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("未设置 {key}，使用默认值: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

fn read_secret(path: &str) -> Result<String, ConfigError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| ConfigError::Secret {
            path: path.to_string(),
            source,
        })
}

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, RuntimeErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::config::Config;

/// 数据库备份结果
#[derive(Debug, Serialize, Deserialize)]
pub struct BackupResult {
    pub success: bool,
    pub path: Option<String>,
    pub message: String,
}

// ==================== Connection management ====================

/// 构建连接字符串：优先使用 `DATABASE_URL`，否则使用
/// `database_path` 处的 SQLite 文件（自动创建目录）。
pub fn connection_string(config: &Config) -> Result<String, DbErr> {
    if let Some(url) = &config.database_url {
        return Ok(url.clone());
    }

    let db_path = absolute_path(&config.database_path)?;

    if !db_path.exists() {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DbErr::Conn(RuntimeErr::Internal(format!(
                    "Failed to create database directory: {}",
                    e
                )))
            })?;
        }
        log::info!("首次启动，创建数据库: {}", db_path.display());
    } else {
        log::info!("使用数据库: {}", db_path.display());
    }

    // 使用 url crate 构建，路径中的特殊字符会被正确编码
    let db_url = Url::from_file_path(&db_path).map_err(|_| {
        DbErr::Conn(RuntimeErr::Internal(format!(
            "Invalid database path: {}",
            db_path.display()
        )))
    })?;

    Ok(format!("sqlite:{}?mode=rwc", db_url.path()))
}

/// 建立 SeaORM 数据库连接
pub async fn establish_connection(config: &Config) -> Result<DatabaseConnection, DbErr> {
    let connection_string = connection_string(config)?;
    connect(connection_string, config.max_connections).await
}

/// 以 `max_connections` 大小的连接池连接 `url`
pub async fn connect(url: String, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let max_connections = max_connections.max(1);

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    Database::connect(options).await
}

/// 关闭数据库连接
pub async fn close_connection(conn: DatabaseConnection) -> Result<(), DbErr> {
    conn.close().await?;
    Ok(())
}

fn absolute_path(path: &Path) -> Result<PathBuf, DbErr> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .map_err(|e| DbErr::Conn(RuntimeErr::Internal(format!("No working directory: {}", e))))
}

// ==================== Backup ====================

/// 带时间戳的备份文件名
fn generate_backup_filename() -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    format!("manhwa_rush_{}.db", timestamp)
}

/// 使用 `VACUUM INTO` 进行热备份
///
/// SQLite 在继续提供服务的同时写出一份压缩后的数据库副本。
/// 副本存放在 `backup_dir`，目录不存在时自动创建。
pub async fn backup_database<C>(db: &C, backup_dir: &Path) -> Result<BackupResult, DbErr>
where
    C: ConnectionTrait,
{
    if !backup_dir.exists() {
        fs::create_dir_all(backup_dir)
            .map_err(|e| DbErr::Custom(format!("Failed to create backup directory: {}", e)))?;
    }

    let target_path = backup_dir.join(generate_backup_filename());

    // SQLite 在各平台都接受正斜杠
    let target_path_str = target_path
        .to_str()
        .ok_or_else(|| DbErr::Custom("Backup path contains invalid characters".to_string()))?
        .replace('\\', "/");

    // 字面量中只需转义单引号
    let escaped_path = target_path_str.replace('\'', "''");
    let vacuum_sql = format!("VACUUM INTO '{}'", escaped_path);

    db.execute_unprepared(&vacuum_sql).await?;

    log::info!("数据库热备份成功: {}", target_path_str);

    Ok(BackupResult {
        success: true,
        path: Some(target_path_str),
        message: "Database backup succeeded".to_string(),
    })
}

#[cfg(test)]
pub(crate) async fn test_connection() -> DatabaseConnection {
    use migration::MigratorTrait;

    let db = connect("sqlite::memory:".to_string(), 1)
        .await
        .expect("in-memory database");
    migration::Migrator::up(&db, None)
        .await
        .expect("migrations apply");
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_url_wins() {
        let config = Config {
            database_url: Some("sqlite::memory:".to_string()),
            ..Config::default()
        };
        assert_eq!(connection_string(&config).unwrap(), "sqlite::memory:");
    }

    #[test]
    fn file_path_becomes_sqlite_url() {
        let dir = std::env::temp_dir().join("manhwa-rush-conn-test");
        let config = Config {
            database_path: dir.join("nested").join("app.db"),
            ..Config::default()
        };

        let url = connection_string(&config).unwrap();
        assert!(url.starts_with("sqlite:"));
        assert!(url.ends_with("app.db?mode=rwc"));
        assert!(dir.join("nested").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn migrations_create_the_ledger_tables() {
        let db = test_connection().await;
        for table in [
            "users",
            "manhwa",
            "chapters",
            "coin_packages",
            "coin_transactions",
            "user_chapter_purchases",
            "reading_history",
            "subscriptions",
        ] {
            let row = db
                .query_one(sea_orm::Statement::from_string(
                    sea_orm::DatabaseBackend::Sqlite,
                    format!(
                        "SELECT name FROM sqlite_master WHERE type='table' AND name='{}'",
                        table
                    ),
                ))
                .await
                .unwrap();
            assert!(row.is_some(), "table {table} missing");
        }
    }

    #[tokio::test]
    async fn backup_writes_a_database_file() {
        let db = test_connection().await;
        let dir = tempfile::tempdir().unwrap();

        let result = backup_database(&db, &dir.path().join("backups")).await.unwrap();

        assert!(result.success);
        let path = result.path.expect("backup path");
        assert!(Path::new(&path).exists());
    }
}

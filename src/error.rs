use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;

use crate::database::service::{ChapterAccess, LedgerError};
use crate::payments::SignatureError;

/// 处理函数边界的错误类型。每个变体对应一个 HTTP 状态码和
/// `{ "error": string }` 响应体。
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Missing authenticated user")]
    Unauthorized,

    #[error("Administrator access required")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient coins: {required} required, {balance} available")]
    InsufficientCoins { required: i64, balance: i64 },

    #[error("Chapter is locked")]
    ChapterLocked(Box<ChapterAccess>),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 导致服务无法正常启动或关闭的错误
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// 根据数据库错误原因，将写入失败映射为 404/409/400
    pub fn from_write(err: DbErr, what: &str) -> Self {
        if matches!(err, DbErr::RecordNotUpdated | DbErr::RecordNotFound(_)) {
            return AppError::NotFound(what.to_string());
        }
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict(format!("{what} already exists"))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                AppError::BadRequest(format!("{what} references a missing record"))
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UserNotFound(id) => AppError::NotFound(format!("User {id}")),
            LedgerError::ChapterNotFound(id) => AppError::NotFound(format!("Chapter {id}")),
            LedgerError::EntitlementNotFound { .. } => AppError::NotFound(err.to_string()),
            LedgerError::InsufficientCoins { required, balance } => {
                AppError::InsufficientCoins { required, balance }
            }
            LedgerError::InvalidAmount(_) => AppError::BadRequest(err.to_string()),
            LedgerError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InsufficientCoins { .. } | AppError::ChapterLocked(_) => {
                StatusCode::PAYMENT_REQUIRED
            }
            AppError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // 未解锁章节同时返回解锁信息
        if let AppError::ChapterLocked(access) = &self {
            let body = json!({ "error": self.to_string(), "access": access });
            return (status, Json(body)).into_response();
        }

        let message = if status.is_server_error() {
            log::error!("{self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_coins_maps_to_payment_required() {
        let response = AppError::InsufficientCoins {
            required: 30,
            balance: 10,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn database_errors_are_masked() {
        let response = AppError::Database(DbErr::Custom("disk on fire".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_rows_on_update_are_not_found() {
        let err = AppError::from_write(DbErr::RecordNotUpdated, "Chapter 9");
        assert!(matches!(err, AppError::NotFound(ref what) if what == "Chapter 9"));
    }

    #[test]
    fn ledger_errors_convert() {
        let err: AppError = LedgerError::ChapterNotFound(7).into();
        assert!(matches!(err, AppError::NotFound(ref what) if what == "Chapter 7"));
    }
}

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

use crate::error::AppError;

/// 日志过滤器句柄，用于运行时调整级别
pub type LogHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
            LogLevel::Off => "off",
        }
    }
}

/// 安装全局 subscriber，并桥接 `log` 记录
pub fn init_logging(filter: &str) -> LogHandle {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .init();

    handle
}

/// 运行时设置日志级别（不持久化）
pub fn set_log_level(handle: Option<&LogHandle>, level: &str) -> Result<LogLevel, AppError> {
    let parsed = match level.to_lowercase().as_str() {
        "error" => LogLevel::Error,
        "warn" => LogLevel::Warn,
        "info" => LogLevel::Info,
        "debug" => LogLevel::Debug,
        "trace" => LogLevel::Trace,
        "off" => LogLevel::Off,
        other => return Err(AppError::BadRequest(format!("Invalid log level: {other}"))),
    };

    if let Some(handle) = handle {
        handle
            .reload(EnvFilter::new(parsed.as_str()))
            .map_err(|e| AppError::Internal(format!("Failed to reload log filter: {e}")))?;
    }
    log::set_max_level(parsed.as_filter());

    Ok(parsed)
}

/// 获取当前日志级别
pub fn current_log_level() -> LogLevel {
    match log::max_level() {
        log::LevelFilter::Error => LogLevel::Error,
        log::LevelFilter::Warn => LogLevel::Warn,
        log::LevelFilter::Info => LogLevel::Info,
        log::LevelFilter::Debug => LogLevel::Debug,
        log::LevelFilter::Trace => LogLevel::Trace,
        log::LevelFilter::Off => LogLevel::Off,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_level() {
        assert!(matches!(
            set_log_level(None, "verbose"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(set_log_level(None, "WARN").unwrap(), LogLevel::Warn);
        assert_eq!(current_log_level(), LogLevel::Warn);
        set_log_level(None, "info").unwrap();
    }
}

//! 日志系统配置模块
//! 支持结构化日志与日志级别配置

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// 初始化日志系统；重复初始化时静默返回
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = if config.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}

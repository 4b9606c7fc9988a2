//! 配置管理模块
//! 支持从环境变量和 TOML 配置文件加载配置

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default = "RpcConfig::solana_default")]
    pub solana: RpcConfig,
    #[serde(default = "RpcConfig::sui_default")]
    pub sui: RpcConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 后端 REST API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// 请求头：语言、设备标识、平台与版本
    pub language: String,
    pub device_id: String,
    pub os: String,
    pub version: String,
    /// 存在性检查的重试策略（1 次重试 / 3 秒退避）
    #[serde(default)]
    pub exists_retry: RetryPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("SHOGUN_API_URL")
                .unwrap_or_else(|_| "https://api.shogun.social".into()),
            timeout_ms: 10_000,
            language: "en".into(),
            device_id: String::new(),
            os: "unknown".into(),
            version: "0".into(),
            exists_retry: RetryPolicy::default(),
        }
    }
}

/// 链 RPC 节点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub timeout_ms: u64,
    pub retries: usize,
    pub backoff_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_ms: 2_000,
            retries: 2,
            backoff_ms: 500,
        }
    }
}

impl RpcConfig {
    pub fn solana_default() -> Self {
        Self {
            url: env::var("SHOGUN_SOLANA_RPC_URL")
                .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".into()),
            ..Self::default()
        }
    }

    pub fn sui_default() -> Self {
        Self {
            url: env::var("SHOGUN_SUI_RPC_URL")
                .unwrap_or_else(|_| "https://fullnode.mainnet.sui.io:443".into()),
            ..Self::default()
        }
    }
}

/// 有限重试策略：固定次数 + 固定退避，绝不无限重试
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub retries: usize,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            backoff_ms: 3_000,
        }
    }
}

/// 本地持久化配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 账户数据库（SQLite）路径
    pub db_path: String,
    /// 加密键值存储文件路径
    pub kv_path: String,
    /// 键值存储静态加密口令（移动端由系统钥匙串提供）
    pub kv_passphrase: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: env::var("SHOGUN_DB_PATH").unwrap_or_else(|_| "shogun.db".into()),
            kv_path: env::var("SHOGUN_KV_PATH").unwrap_or_else(|_| "shogun.kv".into()),
            kv_passphrase: env::var("SHOGUN_KV_PASSPHRASE").unwrap_or_default(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "json" 或 "text"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env::var("SHOGUN_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: "text".into(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            solana: RpcConfig::solana_default(),
            sui: RpcConfig::sui_default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 加载配置：SHOGUN_CONFIG 指定 TOML 文件时优先，否则走环境变量与默认值
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        match env::var("SHOGUN_CONFIG") {
            Ok(path) => Self::from_file(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {}", path.as_ref().display()))?;
        toml::from_str(&raw).context("failed to parse config file")
    }
}

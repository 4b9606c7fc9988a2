//! 错误类型定义
//!
//! 派生与编解码错误对单次调用致命；网络错误由调用方按策略有限重试；
//! 令牌过期（状态 4000）是唯一带自动恢复路径的错误。任何错误都不得被吞掉。

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WalletError>;

#[derive(Debug, Error)]
pub enum WalletError {
    /// 助记词词数不合法（必须是 3 的倍数且不少于 12）
    #[error("invalid mnemonic")]
    InvalidMnemonic,

    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("unsupported signature scheme flag: {0:#04x}")]
    UnsupportedSignatureScheme(u8),

    /// 外部编码密钥格式错误（前缀/长度/校验和）
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    #[error("signing failure: {0}")]
    SigningFailure(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// 该链实现不处理的代币类型（如 SPL 代币转账）
    #[error("unsupported token: {0}")]
    UnsupportedToken(String),

    /// 服务端状态 4000：令牌过期，触发一次重新登录后重试原请求
    #[error("access token expired")]
    AccessTokenExpired,

    /// 服务端响应信封中的非成功状态
    #[error("api error: status={status} {message}")]
    Api { status: i64, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        WalletError::Network(err.to_string())
    }
}

impl From<rusqlite::Error> for WalletError {
    fn from(err: rusqlite::Error) -> Self {
        WalletError::Storage(err.to_string())
    }
}

//! Shogun Core - 移动端多链钱包核心库
//!
//! 账户派生、链能力抽象与签名认证子系统（不含任何 UI 层）。
//! 支持链：Solana、Sui。后端认证统一以主链（Solana）地址为准。

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod repository;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::WalletError;

// 统一模块导出
pub mod prelude {
    pub use crate::{
        app_state::AppState,
        config::Config,
        domain::{Account, Chain, ChainKey, FeeEstimate, TokenInfo},
        error::{Result, WalletError},
        service::chain_ops::{ChainOperations, ChainRegistry},
    };
}

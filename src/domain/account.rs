//! 账户模型
//!
//! 一个钱包（一条助记词）下按派生索引挂多个账户；
//! 同一 (助记词, 索引) 的重新派生必须逐字节一致，
//! 因此恢复账户只需要助记词与索引，无需持久化任何密钥材料。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub label: String,
    pub mnemonic: String,
    pub created_at: i64,
}

/// 账户 ID 即主链（Solana）地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub wallet_id: String,
    pub path_index: u32,
    /// 仅控制可见性，绝不代表删除
    pub hidden: bool,
}

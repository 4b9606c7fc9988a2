//! 代币信息

use serde::{Deserialize, Serialize};

/// Solana 原生币在接口层用系统程序地址表示
pub const SOL_NATIVE_ADDRESS: &str = "11111111111111111111111111111111";

/// Sui 原生币的 coin type
pub const SUI_COIN_ADDRESS: &str = "0x2::sui::SUI";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// 代币地址 / coin type
    pub address: String,
    pub symbol: String,
    pub decimals: u32,
}

impl TokenInfo {
    pub fn native_sol() -> Self {
        Self {
            address: SOL_NATIVE_ADDRESS.into(),
            symbol: "SOL".into(),
            decimals: 9,
        }
    }

    pub fn native_sui() -> Self {
        Self {
            address: SUI_COIN_ADDRESS.into(),
            symbol: "SUI".into(),
            decimals: 9,
        }
    }
}

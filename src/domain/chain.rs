//! 支持链定义
//!
//! 封闭枚举：新增链时增加变体并在注册表注册实现，调用方绝不按链名分支

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Solana,
    Sui,
}

/// 全部支持链，钱包创建时每条链各派生一把密钥
pub const ALL_CHAINS: [Chain; 2] = [Chain::Solana, Chain::Sui];

/// 主链：账户 ID 与后端认证均使用该链地址
pub const MAIN_CHAIN: Chain = Chain::Solana;

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Sui => "sui",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solana" => Ok(Chain::Solana),
            "sui" => Ok(Chain::Sui),
            other => Err(WalletError::UnsupportedChain(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_round_trip() {
        for chain in ALL_CHAINS {
            assert_eq!(chain.as_str().parse::<Chain>().unwrap(), chain);
        }
    }

    #[test]
    fn test_unknown_chain_rejected() {
        let err = "dogecoin".parse::<Chain>().unwrap_err();
        assert!(matches!(err, WalletError::UnsupportedChain(_)));
    }
}

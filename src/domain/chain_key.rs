//! 链密钥
//!
//! 一条链上的一把派生密钥对，归属于单个账户，绝不跨账户共享。
//! `secret_key` 为链原生外部编码：Solana 为 64 字节密钥对的 Base58，
//! Sui 为 bech32 `suiprivkey` 编码（见 `sui_key`）。

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::chain::Chain;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ChainKey {
    #[zeroize(skip)]
    pub chain: Chain,
    #[zeroize(skip)]
    pub address: String,
    pub secret_key: String,
}

// 日志脱敏：私钥绝不出现在 Debug 输出里
impl fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainKey")
            .field("chain", &self.chain)
            .field("address", &self.address)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

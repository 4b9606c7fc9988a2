//! 领域模型：链、密钥、账户与派生算法

pub mod account;
pub mod chain;
pub mod chain_key;
pub mod fee;
pub mod mnemonic;
pub mod slip10;
pub mod sui_key;
pub mod token;

pub use account::{Account, Wallet, WalletSummary};
pub use chain::{Chain, ALL_CHAINS, MAIN_CHAIN};
pub use chain_key::ChainKey;
pub use fee::FeeEstimate;
pub use token::TokenInfo;

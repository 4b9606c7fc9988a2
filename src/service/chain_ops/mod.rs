//! 链能力抽象与注册表
//!
//! 每条支持链都必须完整实现 `ChainOperations`；调用方一律经
//! `ChainRegistry::resolve` 获取实现，注册表是测试替身的唯一替换点。

pub mod solana;
pub mod sui;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::prelude::*;

use crate::config::Config;
use crate::domain::{Chain, ChainKey, FeeEstimate, TokenInfo};
use crate::error::{Result, WalletError};

pub use solana::SolanaChain;
pub use sui::SuiChain;

/// 单链能力集合
#[async_trait]
pub trait ChainOperations: Send + Sync {
    fn name(&self) -> &'static str;
    fn symbol(&self) -> &'static str;
    fn logo_uri(&self) -> &'static str;
    fn explorer_url_for_tx(&self, tx: &str) -> String;

    /// 纯语法/校验和验证，不触网，绝不抛错
    fn verify_address(&self, address: &str) -> bool;

    /// 从助记词与派生索引生成该链密钥；同一输入必须产出逐字节一致的结果
    fn generate_key_from_mnemonic(&self, mnemonic: &str, index: u32) -> Result<ChainKey>;

    /// 对任意消息签名，产出链原生编码的签名；不修改密钥
    async fn sign_message(&self, key: &ChainKey, message: &str) -> Result<String>;

    /// 用地址验证签名（认证协议的服务端原语，客户端用于自检）
    fn verify_message(&self, address: &str, message: &str, signature: &str) -> bool;

    /// 构造、签名并广播一笔转账，返回链原生交易标识（提交成功，而非确认）
    async fn transfer(
        &self,
        from: &ChainKey,
        to_address: &str,
        ui_amount: &str,
        token: &TokenInfo,
        fee: Option<&FeeEstimate>,
    ) -> Result<String>;

    /// 查询已提交交易的终局状态；未确认或超时返回 false，绝不抛错
    async fn confirm_transaction(&self, signature: &str) -> bool;

    /// 尽力而为的费用预估，不要求已签名交易
    async fn get_fee_estimate(
        &self,
        from: &str,
        to: &str,
        ui_amount: &str,
        token: &TokenInfo,
    ) -> Result<FeeEstimate>;
}

/// 链注册表：链标识 -> 单例实现
pub struct ChainRegistry {
    ops: HashMap<Chain, Arc<dyn ChainOperations>>,
}

impl ChainRegistry {
    pub fn new(config: &Config) -> Result<Self> {
        let mut ops: HashMap<Chain, Arc<dyn ChainOperations>> = HashMap::new();
        ops.insert(Chain::Solana, Arc::new(SolanaChain::new(&config.solana)?));
        ops.insert(Chain::Sui, Arc::new(SuiChain::new(&config.sui)?));
        Ok(Self { ops })
    }

    /// 用自定义实现构建注册表（测试替换点）
    pub fn with_ops(ops: HashMap<Chain, Arc<dyn ChainOperations>>) -> Self {
        Self { ops }
    }

    pub fn resolve(&self, chain: Chain) -> Result<Arc<dyn ChainOperations>> {
        self.ops
            .get(&chain)
            .cloned()
            .ok_or_else(|| WalletError::UnsupportedChain(chain.to_string()))
    }

    pub fn resolve_str(&self, chain: &str) -> Result<Arc<dyn ChainOperations>> {
        self.resolve(Chain::from_str(chain)?)
    }
}

/// UI 金额字符串 -> 最小单位整数（向下取整）
pub(crate) fn ui_amount_to_raw(ui_amount: &str, decimals: u32) -> Result<u128> {
    let amount = Decimal::from_str(ui_amount)
        .map_err(|_| WalletError::InvalidAmount(ui_amount.to_string()))?;
    if amount.is_sign_negative() {
        return Err(WalletError::InvalidAmount(ui_amount.to_string()));
    }
    // 外部元数据里的 decimals 不可信，10^decimals 必须做受控溢出
    let scale = 10u64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or_else(|| WalletError::InvalidAmount(format!("unsupported decimals: {decimals}")))?;
    let raw = amount
        .checked_mul(scale)
        .ok_or_else(|| WalletError::InvalidAmount(ui_amount.to_string()))?
        .trunc();
    raw.to_u128()
        .ok_or_else(|| WalletError::InvalidAmount(ui_amount.to_string()))
}

/// 最小单位整数 -> UI 金额字符串
pub(crate) fn raw_to_ui_amount(raw: u128, decimals: u32) -> String {
    let mut value = Decimal::from_u128(raw).unwrap_or_default();
    value.set_scale(decimals).ok();
    value.normalize().to_string()
}

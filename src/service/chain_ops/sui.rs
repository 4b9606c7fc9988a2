//! Sui 链实现
//!
//! 派生路径 `m/44'/784'/{index}'/0'/0'`；地址为 blake2b-256(flag || 公钥)
//! 的 0x 十六进制；私钥外部编码见 `domain::sui_key`。
//! 交易由节点侧 unsafe_pay* 接口构造，客户端对 intent 摘要签名后执行。

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde_json::{json, Value};

use crate::config::RpcConfig;
use crate::domain::sui_key::{
    decode_sui_private_key, encode_sui_private_key, SignatureScheme,
};
use crate::domain::token::SUI_COIN_ADDRESS;
use crate::domain::{mnemonic, slip10, Chain, ChainKey, FeeEstimate, TokenInfo};
use crate::error::{Result, WalletError};
use crate::infrastructure::rpc::JsonRpcClient;

use super::{raw_to_ui_amount, ui_amount_to_raw, ChainOperations};

type Blake2b256 = Blake2b<U32>;

const SUI_DECIMALS: u32 = 9;
/// 费用预估阶段构造交易用的临时 gas 预算（MIST）
const DRY_RUN_GAS_BUDGET: u64 = 10_000_000;
const CONFIRM_ATTEMPTS: usize = 5;
const CONFIRM_POLL_MS: u64 = 2_000;

pub struct SuiChain {
    rpc: JsonRpcClient,
}

impl SuiChain {
    pub fn new(config: &RpcConfig) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(config)?,
        })
    }

    fn derivation_path(index: u32) -> String {
        format!("m/44'/784'/{index}'/0'/0'")
    }

    /// Sui 地址 = 0x + hex(blake2b-256(方案标志 || 公钥))
    fn address_for_pubkey(pubkey: &[u8; 32]) -> String {
        let mut hasher = Blake2b256::new();
        hasher.update([SignatureScheme::Ed25519.flag()]);
        hasher.update(pubkey);
        format!("0x{}", hex::encode(hasher.finalize()))
    }

    fn signing_key_from_chain_key(key: &ChainKey) -> Result<SigningKey> {
        let parsed = decode_sui_private_key(&key.secret_key)?;
        if parsed.scheme != SignatureScheme::Ed25519 {
            return Err(WalletError::UnsupportedSignatureScheme(parsed.scheme.flag()));
        }
        let secret: [u8; 32] = parsed
            .secret_key
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::InvalidKeyFormat("sui secret key must be 32 bytes".into()))?;
        Ok(SigningKey::from_bytes(&secret))
    }

    fn chain_key_from_signing_key(signing_key: &SigningKey) -> Result<ChainKey> {
        let pubkey = signing_key.verifying_key().to_bytes();
        Ok(ChainKey {
            chain: Chain::Sui,
            address: Self::address_for_pubkey(&pubkey),
            secret_key: encode_sui_private_key(
                SignatureScheme::Ed25519,
                signing_key.as_bytes(),
            )?,
        })
    }

    async fn get_balance(&self, owner: &str, coin_type: &str) -> Result<u128> {
        let result = self
            .rpc
            .call("suix_getBalance", json!([owner, coin_type]))
            .await?;
        result
            .get("totalBalance")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| WalletError::Network("malformed suix_getBalance response".into()))
    }

    /// 按余额累加选币，直到覆盖目标金额
    async fn select_coins(
        &self,
        owner: &str,
        coin_type: &str,
        target: u128,
    ) -> Result<Vec<String>> {
        let result = self
            .rpc
            .call("suix_getCoins", json!([owner, coin_type]))
            .await?;
        let coins = result
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| WalletError::Network("malformed suix_getCoins response".into()))?;

        let mut selected = Vec::new();
        let mut selected_amount: u128 = 0;
        for coin in coins {
            let Some(object_id) = coin.get("coinObjectId").and_then(Value::as_str) else {
                continue;
            };
            let balance: u128 = coin
                .get("balance")
                .and_then(Value::as_str)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(0);
            selected.push(object_id.to_string());
            selected_amount += balance;
            if selected_amount >= target {
                break;
            }
        }
        if selected_amount < target {
            return Err(WalletError::InsufficientFunds(format!(
                "selected {selected_amount}, need {target}"
            )));
        }
        Ok(selected)
    }

    /// 让节点构造一笔支付交易，返回待签名的 tx_bytes（base64）
    async fn build_pay_tx(
        &self,
        signer: &str,
        coin_type: &str,
        input_coins: &[String],
        recipient: &str,
        amount: u128,
        gas_budget: u64,
    ) -> Result<String> {
        let amount = amount.to_string();
        let budget = gas_budget.to_string();
        let result = if coin_type == SUI_COIN_ADDRESS {
            self.rpc
                .call(
                    "unsafe_paySui",
                    json!([signer, input_coins, [recipient], [amount], budget]),
                )
                .await?
        } else {
            self.rpc
                .call(
                    "unsafe_pay",
                    json!([signer, input_coins, [recipient], [amount], null, budget]),
                )
                .await?
        };
        result
            .get("txBytes")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| WalletError::Network("malformed unsafe_pay response".into()))
    }

    /// 对交易做 Sui intent 签名：blake2b-256([0,0,0] || tx_bytes)，
    /// 序列化签名为 base64(flag || sig || pubkey)
    fn sign_tx_bytes(signing_key: &SigningKey, tx_bytes_b64: &str) -> Result<String> {
        let tx_bytes = BASE64
            .decode(tx_bytes_b64)
            .map_err(|e| WalletError::SigningFailure(e.to_string()))?;
        let mut hasher = Blake2b256::new();
        hasher.update([0u8, 0, 0]); // intent: TransactionData, V0, Sui
        hasher.update(&tx_bytes);
        let digest = hasher.finalize();

        let signature = signing_key.sign(&digest);
        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(SignatureScheme::Ed25519.flag());
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(&signing_key.verifying_key().to_bytes());
        Ok(BASE64.encode(serialized))
    }

    async fn execute_tx(&self, tx_bytes_b64: &str, serialized_sig: &str) -> Result<String> {
        let result = self
            .rpc
            .call(
                "sui_executeTransactionBlock",
                json!([tx_bytes_b64, [serialized_sig], null, null]),
            )
            .await?;
        result
            .get("digest")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| WalletError::Network("malformed execute response".into()))
    }
}

#[async_trait]
impl ChainOperations for SuiChain {
    fn name(&self) -> &'static str {
        "Sui"
    }

    fn symbol(&self) -> &'static str {
        "SUI"
    }

    fn logo_uri(&self) -> &'static str {
        "https://images.shogun.social/coin_sui_sui_3kecc"
    }

    fn explorer_url_for_tx(&self, tx: &str) -> String {
        format!("https://suiscan.xyz/mainnet/tx/{tx}")
    }

    fn verify_address(&self, address: &str) -> bool {
        let Some(body) = address.strip_prefix("0x") else {
            return false;
        };
        body.len() == 64
            && body
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    fn generate_key_from_mnemonic(&self, mnemonic_phrase: &str, index: u32) -> Result<ChainKey> {
        let seed = mnemonic::mnemonic_to_seed(mnemonic_phrase)?;
        let derived = slip10::derive_ed25519_seed(&seed, &Self::derivation_path(index))?;
        let signing_key = SigningKey::from_bytes(&derived);
        Self::chain_key_from_signing_key(&signing_key)
    }

    async fn sign_message(&self, key: &ChainKey, message: &str) -> Result<String> {
        let signing_key = Self::signing_key_from_chain_key(key)?;
        let signature = signing_key.sign(message.as_bytes());
        // 附带公钥：仅凭 Sui 地址无法验证签名
        Ok(format!(
            "{}:{}",
            bs58::encode(signing_key.verifying_key().to_bytes()).into_string(),
            bs58::encode(signature.to_bytes()).into_string()
        ))
    }

    fn verify_message(&self, address: &str, message: &str, signature: &str) -> bool {
        let Some((pubkey_b58, sig_b58)) = signature.split_once(':') else {
            return false;
        };
        let Ok(pubkey_bytes) = bs58::decode(pubkey_b58).into_vec() else {
            return false;
        };
        let Ok(pubkey_array) = <[u8; 32]>::try_from(pubkey_bytes.as_slice()) else {
            return false;
        };
        // 公钥必须重新推导出被声明的地址
        if Self::address_for_pubkey(&pubkey_array) != address {
            return false;
        }
        let Ok(verifying_key) = VerifyingKey::from_bytes(&pubkey_array) else {
            return false;
        };
        let Ok(sig_bytes) = bs58::decode(sig_b58).into_vec() else {
            return false;
        };
        let Ok(sig_array) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
            return false;
        };
        verifying_key
            .verify(message.as_bytes(), &Signature::from_bytes(&sig_array))
            .is_ok()
    }

    async fn transfer(
        &self,
        from: &ChainKey,
        to_address: &str,
        ui_amount: &str,
        token: &TokenInfo,
        fee: Option<&FeeEstimate>,
    ) -> Result<String> {
        if !self.verify_address(to_address) {
            return Err(WalletError::InvalidAddress(to_address.to_string()));
        }
        let signing_key = Self::signing_key_from_chain_key(from)?;
        let mut amount = ui_amount_to_raw(ui_amount, token.decimals)?;

        let token_balance = self.get_balance(&from.address, &token.address).await?;
        if token_balance < amount {
            return Err(WalletError::InsufficientFunds(format!(
                "token balance {token_balance}, need {amount}"
            )));
        }

        // gas 永远以 SUI 结算
        let sui_balance = self.get_balance(&from.address, SUI_COIN_ADDRESS).await?;
        let gas_budget = match fee {
            Some(estimate) => ui_amount_to_raw(&estimate.fee, SUI_DECIMALS)?,
            None => {
                let estimate = self
                    .get_fee_estimate(&from.address, to_address, ui_amount, token)
                    .await?;
                ui_amount_to_raw(&estimate.fee, SUI_DECIMALS)?
            }
        };
        let gas_budget = u64::try_from(gas_budget)
            .map_err(|_| WalletError::InvalidAmount("gas budget overflow".into()))?;
        if sui_balance < u128::from(gas_budget) {
            return Err(WalletError::InsufficientFunds(
                "not enough SUI for gas".into(),
            ));
        }

        if token.address == SUI_COIN_ADDRESS {
            // 全额转出时从金额里扣除 gas
            if amount == token_balance {
                amount -= u128::from(gas_budget);
            } else if amount + u128::from(gas_budget) > token_balance {
                return Err(WalletError::InsufficientFunds(
                    "not enough SUI for transfer and gas".into(),
                ));
            }
        }

        let coins = self
            .select_coins(&from.address, &token.address, amount)
            .await?;
        let tx_bytes = self
            .build_pay_tx(
                &from.address,
                &token.address,
                &coins,
                to_address,
                amount,
                gas_budget,
            )
            .await?;
        let serialized_sig = Self::sign_tx_bytes(&signing_key, &tx_bytes)?;
        self.execute_tx(&tx_bytes, &serialized_sig).await
    }

    async fn confirm_transaction(&self, signature: &str) -> bool {
        for _ in 0..CONFIRM_ATTEMPTS {
            if let Ok(result) = self
                .rpc
                .call("sui_getTransactionBlock", json!([signature]))
                .await
            {
                if result.get("timestampMs").map(|v| !v.is_null()).unwrap_or(false) {
                    return true;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(CONFIRM_POLL_MS)).await;
        }
        false
    }

    async fn get_fee_estimate(
        &self,
        from: &str,
        to: &str,
        ui_amount: &str,
        token: &TokenInfo,
    ) -> Result<FeeEstimate> {
        let amount = ui_amount_to_raw(ui_amount, token.decimals)?;
        let coins = self.select_coins(from, &token.address, amount).await?;
        let tx_bytes = self
            .build_pay_tx(from, &token.address, &coins, to, amount, DRY_RUN_GAS_BUDGET)
            .await?;
        let result = self
            .rpc
            .call("sui_dryRunTransactionBlock", json!([tx_bytes]))
            .await?;
        let budget: u128 = result
            .pointer("/input/gasData/budget")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| WalletError::Network("malformed dry run response".into()))?;
        Ok(FeeEstimate {
            fee: raw_to_ui_amount(budget, SUI_DECIMALS),
            symbol: "SUI".into(),
        })
    }
}

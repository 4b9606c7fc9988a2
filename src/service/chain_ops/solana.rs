//! Solana 链实现
//!
//! 派生路径 `m/44'/501'/{index}'/0'`（SLIP-0010 ed25519）；
//! 地址为公钥的 Base58，私钥外部编码为 64 字节密钥对的 Base58。
//! 转账只支持原生 SOL（系统程序转账指令，legacy 交易格式）。

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde_json::{json, Value};

use crate::config::RpcConfig;
use crate::domain::token::SOL_NATIVE_ADDRESS;
use crate::domain::{mnemonic, slip10, Chain, ChainKey, FeeEstimate, TokenInfo};
use crate::error::{Result, WalletError};
use crate::infrastructure::rpc::JsonRpcClient;

use super::{ui_amount_to_raw, ChainOperations};

// 与移动端一致的固定费用预算：基础费 5000 + 优先费 50000 lamports
const FEE_LAMPORTS: u64 = 5_000 + 50_000;
const SOL_DECIMALS: u32 = 9;

pub struct SolanaChain {
    rpc: JsonRpcClient,
}

impl SolanaChain {
    pub fn new(config: &RpcConfig) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(config)?,
        })
    }

    fn derivation_path(index: u32) -> String {
        format!("m/44'/501'/{index}'/0'")
    }

    fn signing_key_from_chain_key(key: &ChainKey) -> Result<SigningKey> {
        let bytes = bs58::decode(&key.secret_key)
            .into_vec()
            .map_err(|e| WalletError::InvalidKeyFormat(e.to_string()))?;
        let keypair: [u8; 64] = bytes
            .try_into()
            .map_err(|_| WalletError::InvalidKeyFormat("solana secret key must be 64 bytes".into()))?;
        SigningKey::from_keypair_bytes(&keypair)
            .map_err(|e| WalletError::InvalidKeyFormat(e.to_string()))
    }

    fn chain_key_from_signing_key(signing_key: &SigningKey) -> ChainKey {
        ChainKey {
            chain: Chain::Solana,
            address: bs58::encode(signing_key.verifying_key().to_bytes()).into_string(),
            secret_key: bs58::encode(signing_key.to_keypair_bytes()).into_string(),
        }
    }

    fn decode_pubkey(address: &str) -> Option<[u8; 32]> {
        let bytes = bs58::decode(address).into_vec().ok()?;
        bytes.try_into().ok()
    }

    async fn get_balance(&self, address: &str) -> Result<u64> {
        let result = self.rpc.call("getBalance", json!([address])).await?;
        result
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| WalletError::Network("malformed getBalance response".into()))
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32]> {
        let result = self.rpc.call("getLatestBlockhash", json!([])).await?;
        let blockhash = result
            .pointer("/value/blockhash")
            .and_then(Value::as_str)
            .ok_or_else(|| WalletError::Network("malformed getLatestBlockhash response".into()))?;
        Self::decode_pubkey(blockhash)
            .ok_or_else(|| WalletError::Network("invalid blockhash encoding".into()))
    }

    /// 构造并签名一笔 legacy 系统程序转账交易，返回交易 wire bytes
    fn build_transfer_tx(
        signing_key: &SigningKey,
        to: &[u8; 32],
        lamports: u64,
        blockhash: &[u8; 32],
    ) -> Vec<u8> {
        let from = signing_key.verifying_key().to_bytes();
        let system_program = [0u8; 32];

        let mut message = Vec::with_capacity(1 + 2 + 1 + 3 * 32 + 32 + 1 + 1 + 1 + 2 + 1 + 12);
        // 头部：1 个签名者，0 个只读签名者，1 个只读非签名者（系统程序）
        message.push(1);
        message.push(0);
        message.push(1);
        // 账户表
        push_shortvec_len(&mut message, 3);
        message.extend_from_slice(&from);
        message.extend_from_slice(to);
        message.extend_from_slice(&system_program);
        // 最近区块哈希
        message.extend_from_slice(blockhash);
        // 指令表：单条系统程序 Transfer
        push_shortvec_len(&mut message, 1);
        message.push(2); // program_id_index
        push_shortvec_len(&mut message, 2);
        message.push(0);
        message.push(1);
        let mut data = Vec::with_capacity(12);
        data.extend_from_slice(&2u32.to_le_bytes()); // SystemInstruction::Transfer
        data.extend_from_slice(&lamports.to_le_bytes());
        push_shortvec_len(&mut message, data.len() as u16);
        message.extend_from_slice(&data);

        let signature = signing_key.sign(&message);
        let mut tx = Vec::with_capacity(1 + 64 + message.len());
        push_shortvec_len(&mut tx, 1);
        tx.extend_from_slice(&signature.to_bytes());
        tx.extend_from_slice(&message);
        tx
    }
}

/// Solana compact-u16 长度编码
fn push_shortvec_len(out: &mut Vec<u8>, mut value: u16) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

#[async_trait]
impl ChainOperations for SolanaChain {
    fn name(&self) -> &'static str {
        "Solana"
    }

    fn symbol(&self) -> &'static str {
        "SOL"
    }

    fn logo_uri(&self) -> &'static str {
        "https://images.shogun.social/coin_sol_solana_3torr"
    }

    fn explorer_url_for_tx(&self, tx: &str) -> String {
        format!("https://solscan.io/tx/{tx}")
    }

    fn verify_address(&self, address: &str) -> bool {
        Self::decode_pubkey(address).is_some()
    }

    fn generate_key_from_mnemonic(&self, mnemonic_phrase: &str, index: u32) -> Result<ChainKey> {
        let seed = mnemonic::mnemonic_to_seed(mnemonic_phrase)?;
        let derived = slip10::derive_ed25519_seed(&seed, &Self::derivation_path(index))?;
        let signing_key = SigningKey::from_bytes(&derived);
        Ok(Self::chain_key_from_signing_key(&signing_key))
    }

    async fn sign_message(&self, key: &ChainKey, message: &str) -> Result<String> {
        let signing_key = Self::signing_key_from_chain_key(key)?;
        let signature = signing_key.sign(message.as_bytes());
        Ok(bs58::encode(signature.to_bytes()).into_string())
    }

    fn verify_message(&self, address: &str, message: &str, signature: &str) -> bool {
        let Some(pubkey_bytes) = Self::decode_pubkey(address) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&pubkey_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = bs58::decode(signature).into_vec() else {
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
        _fee: Option<&FeeEstimate>,
    ) -> Result<String> {
        if token.address != SOL_NATIVE_ADDRESS {
            // SPL 代币转账不在本核心范围内
            return Err(WalletError::UnsupportedToken(token.address.clone()));
        }
        let to = Self::decode_pubkey(to_address)
            .ok_or_else(|| WalletError::InvalidAddress(to_address.to_string()))?;
        if to_address == from.address {
            return Err(WalletError::InvalidAddress(
                "cannot transfer to the sending address".into(),
            ));
        }

        let signing_key = Self::signing_key_from_chain_key(from)?;
        let balance = self.get_balance(&from.address).await?;
        let mut lamports = u64::try_from(ui_amount_to_raw(ui_amount, SOL_DECIMALS)?)
            .map_err(|_| WalletError::InvalidAmount(ui_amount.to_string()))?;

        // 全额转出时从金额里扣除手续费，否则校验余额足以覆盖金额加费用
        if lamports == balance {
            lamports = lamports.saturating_sub(FEE_LAMPORTS);
        } else if lamports.saturating_add(FEE_LAMPORTS) > balance {
            return Err(WalletError::InsufficientFunds(format!(
                "balance {balance} lamports, need {} lamports",
                lamports.saturating_add(FEE_LAMPORTS)
            )));
        }

        let blockhash = self.latest_blockhash().await?;
        let tx = Self::build_transfer_tx(&signing_key, &to, lamports, &blockhash);

        let result = self
            .rpc
            .call(
                "sendTransaction",
                json!([BASE64.encode(&tx), {"encoding": "base64"}]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::Network("malformed sendTransaction response".into()))
    }

    async fn confirm_transaction(&self, signature: &str) -> bool {
        let params = json!([[signature], {"searchTransactionHistory": true}]);
        let Ok(result) = self.rpc.call("getSignatureStatuses", params).await else {
            return false;
        };
        let Some(status) = result.pointer("/value/0") else {
            return false;
        };
        if status.is_null() || !status.get("err").map(Value::is_null).unwrap_or(true) {
            return false;
        }
        matches!(
            status.get("confirmationStatus").and_then(Value::as_str),
            Some("confirmed") | Some("finalized")
        )
    }

    async fn get_fee_estimate(
        &self,
        _from: &str,
        _to: &str,
        _ui_amount: &str,
        _token: &TokenInfo,
    ) -> Result<FeeEstimate> {
        // 固定预算（基础费 + 优先费），与移动端一致
        Ok(FeeEstimate {
            fee: "0.000015".into(),
            symbol: "SOL".into(),
        })
    }
}

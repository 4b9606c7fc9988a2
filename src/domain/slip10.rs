//! SLIP-0010 ed25519 密钥派生
//!
//! ed25519 只支持硬化派生，路径中每一段都必须带 `'`。

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::{Result, WalletError};

type HmacSha512 = Hmac<Sha512>;

const CURVE_KEY: &[u8] = b"ed25519 seed";
const HARDENED_OFFSET: u32 = 0x8000_0000;

struct Node {
    key: [u8; 32],
    chain_code: [u8; 32],
}

fn hmac_sha512(key: &[u8], chunks: &[&[u8]]) -> Result<[u8; 64]> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| WalletError::SigningFailure(e.to_string()))?;
    for chunk in chunks {
        mac.update(chunk);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn split_node(digest: [u8; 64]) -> Node {
    let mut key = [0u8; 32];
    let mut chain_code = [0u8; 32];
    key.copy_from_slice(&digest[..32]);
    chain_code.copy_from_slice(&digest[32..]);
    Node { key, chain_code }
}

fn master_node(seed: &[u8]) -> Result<Node> {
    Ok(split_node(hmac_sha512(CURVE_KEY, &[seed])?))
}

fn derive_child(node: &Node, index: u32) -> Result<Node> {
    let digest = hmac_sha512(
        &node.chain_code,
        &[&[0u8], node.key.as_slice(), &index.to_be_bytes()],
    )?;
    Ok(split_node(digest))
}

/// 解析形如 `m/44'/501'/0'/0'` 的硬化路径，返回带硬化位的索引序列
pub fn parse_path(path: &str) -> Result<Vec<u32>> {
    let mut parts = path.split('/');
    if parts.next() != Some("m") {
        return Err(WalletError::InvalidDerivationPath(format!(
            "path must start with m: {path}"
        )));
    }
    let mut indexes = Vec::new();
    for segment in parts {
        if segment.is_empty() {
            // 移动端路径存在尾随斜杠，容忍空段
            continue;
        }
        let Some(raw) = segment.strip_suffix('\'') else {
            return Err(WalletError::InvalidDerivationPath(format!(
                "ed25519 requires hardened segments: {segment}"
            )));
        };
        let index: u32 = raw.parse().map_err(|_| {
            WalletError::InvalidDerivationPath(format!("invalid segment: {segment}"))
        })?;
        indexes.push(index | HARDENED_OFFSET);
    }
    Ok(indexes)
}

/// 从 BIP-39 种子沿硬化路径派生 32 字节 ed25519 私钥种子
pub fn derive_ed25519_seed(seed: &[u8], path: &str) -> Result<[u8; 32]> {
    let mut node = master_node(seed)?;
    for index in parse_path(path)? {
        node = derive_child(&node, index)?;
    }
    Ok(node.key)
}

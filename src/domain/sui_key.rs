//! Sui 私钥编解码
//!
//! 对外展示的 Sui 私钥是 bech32 编码的 `[方案标志字节 || 原始私钥]`，
//! 前缀固定为 `suiprivkey`。标志表封闭且带版本约束：新增方案只追加，
//! 绝不重新编号。

use bech32::{Bech32, Hrp};
use once_cell::sync::Lazy;

use crate::error::{Result, WalletError};

pub const SUI_PRIVATE_KEY_PREFIX: &str = "suiprivkey";

// 前缀是编译期常量，解析不可能失败
static SUI_HRP: Lazy<Hrp> = Lazy::new(|| {
    Hrp::parse(SUI_PRIVATE_KEY_PREFIX).unwrap_or_else(|_| unreachable!("fixed hrp is valid"))
});

/// 签名方案及其标志字节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Ed25519,
    Secp256k1,
    Secp256r1,
    MultiSig,
    ZkLogin,
}

impl SignatureScheme {
    pub fn flag(&self) -> u8 {
        match self {
            SignatureScheme::Ed25519 => 0x00,
            SignatureScheme::Secp256k1 => 0x01,
            SignatureScheme::Secp256r1 => 0x02,
            SignatureScheme::MultiSig => 0x03,
            SignatureScheme::ZkLogin => 0x05,
        }
    }

    pub fn from_flag(flag: u8) -> Result<Self> {
        match flag {
            0x00 => Ok(SignatureScheme::Ed25519),
            0x01 => Ok(SignatureScheme::Secp256k1),
            0x02 => Ok(SignatureScheme::Secp256r1),
            0x03 => Ok(SignatureScheme::MultiSig),
            0x05 => Ok(SignatureScheme::ZkLogin),
            other => Err(WalletError::UnsupportedSignatureScheme(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKeypair {
    pub scheme: SignatureScheme,
    pub secret_key: Vec<u8>,
}

/// 解码 bech32 编码的 Sui 私钥
pub fn decode_sui_private_key(value: &str) -> Result<ParsedKeypair> {
    let (hrp, data) =
        bech32::decode(value).map_err(|e| WalletError::InvalidKeyFormat(e.to_string()))?;
    if hrp.as_str() != SUI_PRIVATE_KEY_PREFIX {
        return Err(WalletError::InvalidKeyFormat(
            "invalid private key prefix".into(),
        ));
    }
    let Some((&flag, secret)) = data.split_first() else {
        return Err(WalletError::InvalidKeyFormat("empty key payload".into()));
    };
    Ok(ParsedKeypair {
        scheme: SignatureScheme::from_flag(flag)?,
        secret_key: secret.to_vec(),
    })
}

/// 编码为 bech32 的 Sui 私钥；`decode(encode(k)) == k` 对所有合法密钥成立
pub fn encode_sui_private_key(scheme: SignatureScheme, secret_key: &[u8]) -> Result<String> {
    let mut payload = Vec::with_capacity(1 + secret_key.len());
    payload.push(scheme.flag());
    payload.extend_from_slice(secret_key);
    bech32::encode::<Bech32>(*SUI_HRP, &payload)
        .map_err(|e| WalletError::InvalidKeyFormat(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_schemes() {
        let secret = [7u8; 32];
        for scheme in [
            SignatureScheme::Ed25519,
            SignatureScheme::Secp256k1,
            SignatureScheme::Secp256r1,
            SignatureScheme::MultiSig,
            SignatureScheme::ZkLogin,
        ] {
            let encoded = encode_sui_private_key(scheme, &secret).unwrap();
            assert!(encoded.starts_with(SUI_PRIVATE_KEY_PREFIX));
            let parsed = decode_sui_private_key(&encoded).unwrap();
            assert_eq!(parsed.scheme, scheme);
            assert_eq!(parsed.secret_key, secret);
        }
    }

    #[test]
    fn test_wrong_prefix_rejected() {
        let hrp = Hrp::parse("notsui").unwrap();
        let encoded = bech32::encode::<Bech32>(hrp, &[0u8; 33]).unwrap();
        assert!(matches!(
            decode_sui_private_key(&encoded),
            Err(WalletError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_garbage_input_rejected() {
        assert!(matches!(
            decode_sui_private_key("not bech32 at all"),
            Err(WalletError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        // 0x04 不在标志表内
        let hrp = Hrp::parse(SUI_PRIVATE_KEY_PREFIX).unwrap();
        let mut payload = vec![0x04u8];
        payload.extend_from_slice(&[1u8; 32]);
        let encoded = bech32::encode::<Bech32>(hrp, &payload).unwrap();
        assert!(matches!(
            decode_sui_private_key(&encoded),
            Err(WalletError::UnsupportedSignatureScheme(0x04))
        ));
    }
}

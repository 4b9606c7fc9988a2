//! 助记词校验、生成与种子推导

use bip39::{Language, Mnemonic};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Result, WalletError};

/// 词数必须是 3 的倍数且不少于 12，违反时在任何派生之前拒绝
pub fn validate_mnemonic(mnemonic: &str) -> bool {
    let count = mnemonic.trim().split_whitespace().count();
    count % 3 == 0 && count >= 12
}

/// 生成英文助记词（12 或 24 词）
pub fn generate_mnemonic(word_count: usize) -> Result<String> {
    let mnemonic = Mnemonic::generate_in(Language::English, word_count)
        .map_err(|_| WalletError::InvalidMnemonic)?;
    Ok(mnemonic.to_string())
}

/// BIP-39 种子：PBKDF2-HMAC-SHA512(NFKD(助记词), "mnemonic", 2048) -> 64 字节
///
/// 与移动端实现保持一致：只做词数校验，不做词表校验和强校验
pub fn mnemonic_to_seed(mnemonic: &str) -> Result<[u8; 64]> {
    if !validate_mnemonic(mnemonic) {
        return Err(WalletError::InvalidMnemonic);
    }
    let normalized: String = mnemonic.trim().nfkd().collect();
    let mut seed = [0u8; 64];
    pbkdf2_hmac::<Sha512>(normalized.as_bytes(), b"mnemonic", 2048, &mut seed);
    Ok(seed)
}

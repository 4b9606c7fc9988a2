//! 加密键值存储
//!
//! 移动端由系统加密 KV（MMKV + 钥匙串）承担；核心只依赖这里的 trait。
//! 文件实现用 AES-256-GCM 静态加密整张表，口令经 PBKDF2 拉伸；
//! 测试用内存实现。单键写入是原子的：持有写锁期间完成内存更新与落盘。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{Result, WalletError};

pub trait KvStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_i64(&self, key: &str) -> Option<i64>;
    fn set_string(&self, key: &str, value: &str) -> Result<()>;
    fn set_i64(&self, key: &str, value: i64) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 内存实现（测试用）
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_string(key)?.parse().ok()
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| WalletError::Storage("kv lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_string(key, &value.to_string())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| WalletError::Storage("kv lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 加密文件实现
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const PBKDF2_ROUNDS: u32 = 100_000;

/// 文件格式：salt(16) || nonce(12) || AES-256-GCM(serde_json(map))
pub struct EncryptedFileKv {
    path: PathBuf,
    passphrase: String,
    salt: [u8; SALT_LEN],
    entries: RwLock<HashMap<String, String>>,
}

impl EncryptedFileKv {
    pub fn open<P: AsRef<Path>>(path: P, passphrase: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            let raw = fs::read(&path).map_err(|e| WalletError::Storage(e.to_string()))?;
            if raw.len() < SALT_LEN + NONCE_LEN {
                return Err(WalletError::Storage("kv file truncated".into()));
            }
            let mut salt = [0u8; SALT_LEN];
            salt.copy_from_slice(&raw[..SALT_LEN]);
            let nonce = &raw[SALT_LEN..SALT_LEN + NONCE_LEN];
            let ciphertext = &raw[SALT_LEN + NONCE_LEN..];

            let cipher = Self::cipher(passphrase, &salt);
            let plaintext = cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| WalletError::Storage("kv decryption failed".into()))?;
            let entries: HashMap<String, String> = serde_json::from_slice(&plaintext)
                .map_err(|e| WalletError::Storage(e.to_string()))?;
            Ok(Self {
                path,
                passphrase: passphrase.to_string(),
                salt,
                entries: RwLock::new(entries),
            })
        } else {
            let mut salt = [0u8; SALT_LEN];
            rand::thread_rng().fill_bytes(&mut salt);
            let store = Self {
                path,
                passphrase: passphrase.to_string(),
                salt,
                entries: RwLock::new(HashMap::new()),
            };
            store.persist(&HashMap::new())?;
            Ok(store)
        }
    }

    fn cipher(passphrase: &str, salt: &[u8]) -> Aes256Gcm {
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key))
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let plaintext =
            serde_json::to_vec(entries).map_err(|e| WalletError::Storage(e.to_string()))?;
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let cipher = Self::cipher(&self.passphrase, &self.salt);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| WalletError::Storage("kv encryption failed".into()))?;

        let mut raw = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        raw.extend_from_slice(&self.salt);
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&ciphertext);
        fs::write(&self.path, raw).map_err(|e| WalletError::Storage(e.to_string()))
    }

    fn mutate<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| WalletError::Storage("kv lock poisoned".into()))?;
        apply(&mut entries);
        self.persist(&entries)
    }
}

impl KvStore for EncryptedFileKv {
    fn get_string(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_string(key)?.parse().ok()
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_string(key, &value.to_string())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryKvStore::new();
        store.set_string("a", "hello").unwrap();
        store.set_i64("b", 42).unwrap();
        assert_eq!(store.get_string("a").as_deref(), Some("hello"));
        assert_eq!(store.get_i64("b"), Some(42));
        store.delete("a").unwrap();
        assert_eq!(store.get_string("a"), None);
    }

    #[test]
    fn test_encrypted_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.kv");
        {
            let store = EncryptedFileKv::open(&path, "pass").unwrap();
            store.set_string("token", "abc").unwrap();
            store.set_i64("expires", 1_700_000_000_000).unwrap();
        }
        let reopened = EncryptedFileKv::open(&path, "pass").unwrap();
        assert_eq!(reopened.get_string("token").as_deref(), Some("abc"));
        assert_eq!(reopened.get_i64("expires"), Some(1_700_000_000_000));
    }

    #[test]
    fn test_encrypted_store_wrong_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.kv");
        {
            let store = EncryptedFileKv::open(&path, "correct").unwrap();
            store.set_string("k", "v").unwrap();
        }
        assert!(EncryptedFileKv::open(&path, "wrong").is_err());
    }

    #[test]
    fn test_file_is_not_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.kv");
        let store = EncryptedFileKv::open(&path, "pass").unwrap();
        store.set_string("needle", "super-secret-value").unwrap();
        let raw = std::fs::read(&path).unwrap();
        let haystack = String::from_utf8_lossy(&raw);
        assert!(!haystack.contains("super-secret-value"));
    }
}

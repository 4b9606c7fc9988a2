//! 钱包与账户仓储
//!
//! 钱包 ID = bs58(sha256(助记词))，天然对同一条助记词去重；
//! 账户 ID = 主链（Solana）地址。
//! 每个账户为每条支持链各存一份派生好的密钥，
//! "当前账户" 指针存放在 KV 里，键名与移动端约定一致。

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::domain::{mnemonic, Account, Chain, ChainKey, Wallet, WalletSummary, ALL_CHAINS, MAIN_CHAIN};
use crate::error::{Result, WalletError};
use crate::infrastructure::kv::KvStore;
use crate::service::chain_ops::ChainRegistry;
use crate::utils::time_utils::current_timestamp_ms;

/// 当前账户指针的 KV 键，沿用移动端的命名
pub const CURRENT_ACCOUNT_ID_KEY: &str = "current-account-id";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS wallet (
    id          TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    mnemonic    TEXT NOT NULL,
    created_at  INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS account (
    id          TEXT PRIMARY KEY,
    wallet_id   TEXT NOT NULL REFERENCES wallet(id),
    path_index  INTEGER NOT NULL,
    hidden      INTEGER NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_account_wallet_index
    ON account(wallet_id, path_index);
CREATE TABLE IF NOT EXISTS secret (
    address     TEXT PRIMARY KEY,
    secret_key  TEXT NOT NULL,
    wallet_id   TEXT NOT NULL REFERENCES wallet(id),
    account_id  TEXT NOT NULL REFERENCES account(id),
    chain       TEXT NOT NULL
);
";

pub struct AccountStore {
    conn: Mutex<Connection>,
    kv: Arc<dyn KvStore>,
}

impl AccountStore {
    pub fn open(path: &str, kv: Arc<dyn KvStore>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?, kv)
    }

    pub fn open_in_memory(kv: Arc<dyn KvStore>) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, kv)
    }

    fn with_connection(conn: Connection, kv: Arc<dyn KvStore>) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            kv,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| WalletError::Storage("account store lock poisoned".into()))
    }

    /// 钱包 ID 是助记词的内容寻址指纹
    pub fn wallet_id_for_mnemonic(mnemonic: &str) -> String {
        bs58::encode(Sha256::digest(mnemonic.as_bytes())).into_string()
    }

    /// 从助记词创建钱包及其 0 号账户；重复导入同一条助记词会被拒绝。
    /// 钱包行与账户行在同一事务内落库，成功后新账户成为当前账户。
    pub fn create_new_wallet(&self, registry: &ChainRegistry, phrase: &str) -> Result<Account> {
        if !mnemonic::validate_mnemonic(phrase) {
            return Err(WalletError::InvalidMnemonic);
        }
        let wallet_id = Self::wallet_id_for_mnemonic(phrase);
        let label = format!("Wallet {}", self.wallet_count()? + 1);
        let (account_id, keys) = Self::derive_account_keys(registry, phrase, 0)?;

        {
            let mut conn = self.lock()?;
            let existing: Option<String> = conn
                .query_row("SELECT id FROM wallet WHERE id = ?1", [&wallet_id], |row| {
                    row.get(0)
                })
                .optional()?;
            if existing.is_some() {
                return Err(WalletError::InvalidMnemonic);
            }
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO wallet (id, label, mnemonic, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![wallet_id, label, phrase, current_timestamp_ms()],
            )?;
            Self::insert_account(&tx, &wallet_id, &account_id, 0, &keys)?;
            tx.commit()?;
        }

        self.set_current_account_id(&account_id)?;
        tracing::info!(wallet_id, "wallet created");
        Ok(Account {
            id: account_id,
            wallet_id,
            path_index: 0,
            hidden: false,
        })
    }

    /// 在钱包下追加下一个派生索引的账户
    pub fn create_next_account(&self, registry: &ChainRegistry, wallet_id: &str) -> Result<Account> {
        let phrase = self.wallet_mnemonic(wallet_id)?;
        let index = self.next_path_index(wallet_id)?;
        let (account_id, keys) = Self::derive_account_keys(registry, &phrase, index)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::insert_account(&tx, wallet_id, &account_id, index, &keys)?;
        tx.commit()?;

        tracing::info!(wallet_id, index, "account created");
        Ok(Account {
            id: account_id,
            wallet_id: wallet_id.to_string(),
            path_index: index,
            hidden: false,
        })
    }

    /// 锁外完成所有链的派生（纯计算），返回账户 ID（主链地址）与全部密钥
    fn derive_account_keys(
        registry: &ChainRegistry,
        phrase: &str,
        index: u32,
    ) -> Result<(String, Vec<ChainKey>)> {
        let mut keys = Vec::with_capacity(ALL_CHAINS.len());
        for chain in ALL_CHAINS {
            let ops = registry.resolve(chain)?;
            keys.push(ops.generate_key_from_mnemonic(phrase, index)?);
        }
        let account_id = keys
            .iter()
            .find(|key| key.chain == MAIN_CHAIN)
            .map(|key| key.address.clone())
            .ok_or_else(|| WalletError::UnsupportedChain(MAIN_CHAIN.as_str().into()))?;
        Ok((account_id, keys))
    }

    fn insert_account(
        tx: &rusqlite::Transaction<'_>,
        wallet_id: &str,
        account_id: &str,
        index: u32,
        keys: &[ChainKey],
    ) -> Result<()> {
        tx.execute(
            "INSERT INTO account (id, wallet_id, path_index, hidden) VALUES (?1, ?2, ?3, 0)",
            params![account_id, wallet_id, index],
        )?;
        for key in keys {
            tx.execute(
                "INSERT INTO secret (address, secret_key, wallet_id, account_id, chain)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    key.address,
                    key.secret_key,
                    wallet_id,
                    account_id,
                    key.chain.as_str()
                ],
            )?;
        }
        Ok(())
    }

    pub fn next_path_index(&self, wallet_id: &str) -> Result<u32> {
        let conn = self.lock()?;
        let max: Option<u32> = conn.query_row(
            "SELECT MAX(path_index) FROM account WHERE wallet_id = ?1",
            [wallet_id],
            |row| row.get(0),
        )?;
        Ok(max.map(|m| m + 1).unwrap_or(0))
    }

    pub fn wallet_count(&self) -> Result<u32> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM wallet", [], |row| row.get(0))?)
    }

    pub fn all_wallets(&self) -> Result<Vec<WalletSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, label FROM wallet ORDER BY created_at")?;
        let rows = stmt.query_map([], |row| {
            Ok(WalletSummary {
                id: row.get(0)?,
                label: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    pub fn wallet_by_id(&self, wallet_id: &str) -> Result<Wallet> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, label, mnemonic, created_at FROM wallet WHERE id = ?1",
            [wallet_id],
            |row| {
                Ok(Wallet {
                    id: row.get(0)?,
                    label: row.get(1)?,
                    mnemonic: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| WalletError::AccountNotFound(wallet_id.to_string()))
    }

    pub fn wallet_mnemonic(&self, wallet_id: &str) -> Result<String> {
        Ok(self.wallet_by_id(wallet_id)?.mnemonic)
    }

    pub fn account_by_id(&self, account_id: &str) -> Result<Account> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, wallet_id, path_index, hidden FROM account WHERE id = ?1",
            [account_id],
            |row| {
                Ok(Account {
                    id: row.get(0)?,
                    wallet_id: row.get(1)?,
                    path_index: row.get(2)?,
                    hidden: row.get::<_, i64>(3)? != 0,
                })
            },
        )
        .optional()?
        .ok_or_else(|| WalletError::AccountNotFound(account_id.to_string()))
    }

    pub fn accounts_for_wallet(&self, wallet_id: &str) -> Result<Vec<Account>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, wallet_id, path_index, hidden FROM account
             WHERE wallet_id = ?1 ORDER BY path_index",
        )?;
        let rows = stmt.query_map([wallet_id], |row| {
            Ok(Account {
                id: row.get(0)?,
                wallet_id: row.get(1)?,
                path_index: row.get(2)?,
                hidden: row.get::<_, i64>(3)? != 0,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// 隐藏仅影响列表展示，密钥与派生索引都保留
    pub fn set_account_hidden(&self, account_id: &str, hidden: bool) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE account SET hidden = ?1 WHERE id = ?2",
            params![hidden as i64, account_id],
        )?;
        if changed == 0 {
            return Err(WalletError::AccountNotFound(account_id.to_string()));
        }
        Ok(())
    }

    pub fn chain_key_for_address(&self, address: &str) -> Result<ChainKey> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT chain, address, secret_key FROM secret WHERE address = ?1",
            [address],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| WalletError::AccountNotFound(address.to_string()))
        .and_then(|(chain, address, secret_key)| {
            Ok(ChainKey {
                chain: chain.parse()?,
                address,
                secret_key,
            })
        })
    }

    pub fn address_for_account_chain(&self, account_id: &str, chain: Chain) -> Result<String> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT address FROM secret WHERE account_id = ?1 AND chain = ?2",
            params![account_id, chain.as_str()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| WalletError::AccountNotFound(account_id.to_string()))
    }

    pub fn addresses_for_chain(&self, chain: Chain) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT address FROM secret WHERE chain = ?1")?;
        let rows = stmt.query_map([chain.as_str()], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    pub fn keys_for_account(&self, account_id: &str) -> Result<Vec<ChainKey>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT chain, address, secret_key FROM secret WHERE account_id = ?1",
        )?;
        let rows = stmt.query_map([account_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut keys = Vec::new();
        for row in rows {
            let (chain, address, secret_key) = row?;
            keys.push(ChainKey {
                chain: chain.parse()?,
                address,
                secret_key,
            });
        }
        Ok(keys)
    }

    pub fn current_account_id(&self) -> Option<String> {
        self.kv.get_string(CURRENT_ACCOUNT_ID_KEY)
    }

    pub fn set_current_account_id(&self, account_id: &str) -> Result<()> {
        self.kv.set_string(CURRENT_ACCOUNT_ID_KEY, account_id)
    }

    pub fn current_account(&self) -> Result<Account> {
        let id = self
            .current_account_id()
            .ok_or_else(|| WalletError::AccountNotFound("no current account".into()))?;
        self.account_by_id(&id)
    }

    /// 抹掉全部钱包数据与当前账户指针，供 "重置钱包" 使用
    pub fn delete_everything(&self) -> Result<()> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM secret", [])?;
            tx.execute("DELETE FROM account", [])?;
            tx.execute("DELETE FROM wallet", [])?;
            tx.commit()?;
        }
        self.kv.delete(CURRENT_ACCOUNT_ID_KEY)?;
        tracing::warn!("all wallet data deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::infrastructure::kv::MemoryKvStore;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const OTHER_MNEMONIC: &str =
        "legal winner thank year wave sausage worth useful legal winner thank yellow";

    fn store() -> (AccountStore, ChainRegistry) {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let store = AccountStore::open_in_memory(kv).unwrap();
        let registry = ChainRegistry::new(&Config::default()).unwrap();
        (store, registry)
    }

    #[test]
    fn test_create_wallet_and_first_account() {
        let (store, registry) = store();
        let account = store.create_new_wallet(&registry, TEST_MNEMONIC).unwrap();
        assert_eq!(account.path_index, 0);
        assert!(!account.hidden);
        assert_eq!(store.wallet_count().unwrap(), 1);

        // 账户 ID 即主链地址
        let main = store
            .address_for_account_chain(&account.id, MAIN_CHAIN)
            .unwrap();
        assert_eq!(main, account.id);

        // 每条链各有一份密钥
        let keys = store.keys_for_account(&account.id).unwrap();
        assert_eq!(keys.len(), ALL_CHAINS.len());

        // 新钱包的账户自动成为当前账户
        assert_eq!(store.current_account().unwrap().id, account.id);
    }

    #[test]
    fn test_wallet_id_is_mnemonic_fingerprint() {
        let (store, registry) = store();
        let account = store.create_new_wallet(&registry, TEST_MNEMONIC).unwrap();
        assert_eq!(
            account.wallet_id,
            AccountStore::wallet_id_for_mnemonic(TEST_MNEMONIC)
        );
    }

    #[test]
    fn test_duplicate_mnemonic_rejected() {
        let (store, registry) = store();
        store.create_new_wallet(&registry, TEST_MNEMONIC).unwrap();
        let err = store.create_new_wallet(&registry, TEST_MNEMONIC).unwrap_err();
        assert!(matches!(err, WalletError::InvalidMnemonic));
    }

    #[test]
    fn test_failed_creation_leaves_no_wallet_row() {
        use std::collections::HashMap;

        use crate::config::RpcConfig;
        use crate::service::chain_ops::{ChainOperations, SuiChain};

        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let store = AccountStore::open_in_memory(kv).unwrap();
        // 缺主链实现的注册表：派生在任何写库之前失败
        let mut ops: HashMap<Chain, Arc<dyn ChainOperations>> = HashMap::new();
        ops.insert(Chain::Sui, Arc::new(SuiChain::new(&RpcConfig::default()).unwrap()));
        let broken = ChainRegistry::with_ops(ops);

        let err = store.create_new_wallet(&broken, TEST_MNEMONIC).unwrap_err();
        assert!(matches!(err, WalletError::UnsupportedChain(_)));
        assert_eq!(store.wallet_count().unwrap(), 0);
        assert!(store.all_wallets().unwrap().is_empty());
        assert!(store.current_account_id().is_none());
    }

    #[test]
    fn test_wallet_labels_are_sequential() {
        let (store, registry) = store();
        store.create_new_wallet(&registry, TEST_MNEMONIC).unwrap();
        store.create_new_wallet(&registry, OTHER_MNEMONIC).unwrap();
        let wallets = store.all_wallets().unwrap();
        assert_eq!(wallets[0].label, "Wallet 1");
        assert_eq!(wallets[1].label, "Wallet 2");
    }

    #[test]
    fn test_next_account_increments_path_index() {
        let (store, registry) = store();
        let first = store.create_new_wallet(&registry, TEST_MNEMONIC).unwrap();
        let second = store
            .create_next_account(&registry, &first.wallet_id)
            .unwrap();
        assert_eq!(second.path_index, 1);
        assert_ne!(second.id, first.id);
        assert_eq!(store.next_path_index(&first.wallet_id).unwrap(), 2);
    }

    #[test]
    fn test_recovered_account_matches_original() {
        let (store, registry) = store();
        let account = store.create_new_wallet(&registry, TEST_MNEMONIC).unwrap();
        let keys_before = store.keys_for_account(&account.id).unwrap();

        store.delete_everything().unwrap();
        assert_eq!(store.wallet_count().unwrap(), 0);
        assert!(store.current_account_id().is_none());

        let recovered = store.create_new_wallet(&registry, TEST_MNEMONIC).unwrap();
        assert_eq!(recovered.id, account.id);
        assert_eq!(store.keys_for_account(&recovered.id).unwrap(), keys_before);
    }

    #[test]
    fn test_hide_account_keeps_keys() {
        let (store, registry) = store();
        let account = store.create_new_wallet(&registry, TEST_MNEMONIC).unwrap();
        store.set_account_hidden(&account.id, true).unwrap();
        assert!(store.account_by_id(&account.id).unwrap().hidden);
        assert!(!store.keys_for_account(&account.id).unwrap().is_empty());

        store.set_account_hidden(&account.id, false).unwrap();
        assert!(!store.account_by_id(&account.id).unwrap().hidden);
    }

    #[test]
    fn test_chain_key_lookup_by_address() {
        let (store, registry) = store();
        let account = store.create_new_wallet(&registry, TEST_MNEMONIC).unwrap();
        for key in store.keys_for_account(&account.id).unwrap() {
            let found = store.chain_key_for_address(&key.address).unwrap();
            assert_eq!(found, key);
        }
        assert!(store.chain_key_for_address("unknown").is_err());
    }
}

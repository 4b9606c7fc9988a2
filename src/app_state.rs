//! 应用状态：配置、链注册表、仓储与 API 客户端的组装点

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::infrastructure::http::{ApiClient, ApiHeaders};
use crate::infrastructure::kv::{EncryptedFileKv, KvStore};
use crate::infrastructure::token_cache::AccessTokenCache;
use crate::repository::AccountStore;
use crate::service::chain_ops::ChainRegistry;

pub struct AppState {
    pub config: Config,
    pub registry: Arc<ChainRegistry>,
    pub accounts: Arc<AccountStore>,
    pub tokens: AccessTokenCache,
    pub api: ApiClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        crate::infrastructure::logging::init_logging(&config.logging);
        let kv: Arc<dyn KvStore> = Arc::new(EncryptedFileKv::open(
            &config.storage.kv_path,
            &config.storage.kv_passphrase,
        )?);
        let registry = Arc::new(ChainRegistry::new(&config)?);
        let accounts = Arc::new(AccountStore::open(&config.storage.db_path, kv.clone())?);
        let tokens = AccessTokenCache::new(kv);
        let api = ApiClient::new(&config.api)?;
        Ok(Self {
            config,
            registry,
            accounts,
            tokens,
            api,
        })
    }

    /// 测试装配点：内存存储加可替换的链实现
    pub fn with_parts(
        config: Config,
        registry: Arc<ChainRegistry>,
        accounts: Arc<AccountStore>,
        tokens: AccessTokenCache,
        api: ApiClient,
    ) -> Self {
        Self {
            config,
            registry,
            accounts,
            tokens,
            api,
        }
    }

    /// 构造请求头；带上当前账户尚存的访问令牌（可能为空）
    pub fn headers(&self) -> ApiHeaders {
        let access_token = self
            .accounts
            .current_account_id()
            .and_then(|id| self.tokens.valid_token(&id))
            .unwrap_or_default();
        ApiHeaders {
            language: self.config.api.language.clone(),
            device: self.config.api.device_id.clone(),
            os: self.config.api.os.clone(),
            version: self.config.api.version.clone(),
            access_token,
        }
    }
}

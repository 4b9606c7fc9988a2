//! 访问令牌缓存
//!
//! 按链地址持久化访问令牌与过期时间。这是凭据存储而非内存缓存：
//! 必须跨进程重启存活，且静态加密（由底层 KV 提供）。
//! 无隐式淘汰：调用方使用前自查过期并触发重新认证。

use std::sync::Arc;

use crate::error::Result;
use crate::infrastructure::kv::KvStore;
use crate::utils::time_utils;

// KV 键名与移动端保持一致
fn access_token_key(address: &str) -> String {
    format!("access-token-{address}")
}

fn expire_at_key(address: &str) -> String {
    format!("access-token-expire-at-{address}")
}

#[derive(Clone)]
pub struct AccessTokenCache {
    kv: Arc<dyn KvStore>,
}

impl AccessTokenCache {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// 写入令牌，覆盖该地址的任何旧记录；`expires_in` 单位为秒
    pub fn store(&self, address: &str, token: &str, expires_in: i64) -> Result<()> {
        self.kv.set_string(&access_token_key(address), token)?;
        let expire_at = time_utils::current_timestamp_ms() + expires_in * 1000;
        self.kv.set_i64(&expire_at_key(address), expire_at)
    }

    pub fn get(&self, address: &str) -> Option<String> {
        self.kv.get_string(&access_token_key(address))
    }

    /// 过期时刻（毫秒时间戳）
    pub fn get_expire_at(&self, address: &str) -> Option<i64> {
        self.kv.get_i64(&expire_at_key(address))
    }

    /// 指定时刻仍有效的令牌；缺失或已过期返回 None
    pub fn valid_token_at(&self, address: &str, now_ms: i64) -> Option<String> {
        let expire_at = self.get_expire_at(address)?;
        if expire_at <= now_ms {
            return None;
        }
        self.get(address)
    }

    pub fn valid_token(&self, address: &str) -> Option<String> {
        self.valid_token_at(address, time_utils::current_timestamp_ms())
    }
}

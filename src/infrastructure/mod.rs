//! 基础设施：持久化、网络传输与日志

pub mod http;
pub mod kv;
pub mod logging;
pub mod rpc;
pub mod token_cache;

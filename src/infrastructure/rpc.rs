//! 链节点 JSON-RPC 客户端：带超时与有限次重试的最小实现
//!
//! Solana 与 Sui 节点共用；传输层失败按配置退避重试，
//! 节点返回的 RPC 错误不重试，直接上抛。

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::config::RpcConfig;
use crate::error::{Result, WalletError};

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

impl<'a> JsonRpcRequest<'a> {
    fn new(method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        }
    }
}

#[derive(Clone)]
pub struct JsonRpcClient {
    url: String,
    client: reqwest::Client,
    retries: usize,
    backoff: Duration,
}

impl JsonRpcClient {
    pub fn new(config: &RpcConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            url: config.url.clone(),
            client,
            retries: config.retries,
            backoff: Duration::from_millis(config.backoff_ms),
        })
    }

    /// 调用 RPC 方法并返回 `result` 字段
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = JsonRpcRequest::new(method, params);
        let mut attempt = 0usize;
        loop {
            match self.post_once(&request).await {
                Ok(value) => return Ok(value),
                Err(WalletError::Network(message)) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(method, attempt, %message, "rpc call failed, retrying");
                    tokio::time::sleep(self.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post_once(&self, request: &JsonRpcRequest<'_>) -> Result<Value> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?;

        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown rpc error");
            // 节点语义错误，重试无意义
            return Err(WalletError::Api {
                status: code,
                message: message.to_string(),
            });
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| WalletError::Network("rpc response missing result".into()))
    }
}

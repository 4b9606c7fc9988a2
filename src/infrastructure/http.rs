//! REST 传输层
//!
//! 统一响应信封 `{status, data?, error?}`：status == 200 为成功，
//! 4000 表示令牌过期（由认证服务做一次自动恢复），其余状态整体上抛。

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::{ApiConfig, RetryPolicy};
use crate::error::{Result, WalletError};

/// 服务端状态码（非 HTTP 状态码）
pub mod api_status {
    pub const SUCCESS: i64 = 200;
    pub const BAD_REQUEST: i64 = 400;
    pub const UNAUTHORIZED: i64 = 401;

    pub const ERROR_ACCESS_TOKEN_EXPIRED: i64 = 4000;
    pub const ERROR_USER_NOT_FOUND: i64 = 4001;
}

#[derive(Debug, Deserialize)]
pub struct ApiRes<T> {
    pub status: i64,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// 每次请求携带的标准头
#[derive(Debug, Clone)]
pub struct ApiHeaders {
    pub language: String,
    pub device: String,
    pub os: String,
    pub version: String,
    pub access_token: String,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder, headers: &ApiHeaders) -> reqwest::RequestBuilder {
        builder
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Language", &headers.language)
            .header("Device", &headers.device)
            .header("OS", &headers.os)
            .header("Version", &headers.version)
            .header("Access-Token", &headers.access_token)
    }

    /// GET 请求；信封状态非 200 时映射为错误
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        headers: &ApiHeaders,
    ) -> Result<ApiRes<T>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.request(self.client.get(&url), headers).send().await?;
        let envelope: ApiRes<T> = response.json().await?;
        Self::check_status(envelope)
    }

    /// 带有限重试的 GET：只重试传输层失败
    pub async fn get_json_with_retry<T: DeserializeOwned>(
        &self,
        path: &str,
        headers: &ApiHeaders,
        policy: &RetryPolicy,
    ) -> Result<ApiRes<T>> {
        let mut attempt = 0usize;
        loop {
            match self.get_json(path, headers).await {
                Err(WalletError::Network(message)) if attempt < policy.retries => {
                    attempt += 1;
                    tracing::warn!(path, attempt, %message, "api call failed, retrying");
                    tokio::time::sleep(Duration::from_millis(policy.backoff_ms)).await;
                }
                other => return other,
            }
        }
    }

    fn check_status<T>(envelope: ApiRes<T>) -> Result<ApiRes<T>> {
        match envelope.status {
            api_status::SUCCESS => Ok(envelope),
            api_status::ERROR_ACCESS_TOKEN_EXPIRED => Err(WalletError::AccessTokenExpired),
            status => Err(WalletError::Api {
                status,
                message: envelope.error.unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_success() {
        let envelope = ApiRes::<String> {
            status: api_status::SUCCESS,
            data: Some("ok".into()),
            error: None,
        };
        assert!(ApiClient::check_status(envelope).is_ok());
    }

    #[test]
    fn test_check_status_token_expired() {
        let envelope = ApiRes::<String> {
            status: api_status::ERROR_ACCESS_TOKEN_EXPIRED,
            data: None,
            error: None,
        };
        assert!(matches!(
            ApiClient::check_status(envelope),
            Err(WalletError::AccessTokenExpired)
        ));
    }

    #[test]
    fn test_check_status_other_error_propagates_envelope() {
        let envelope = ApiRes::<String> {
            status: api_status::BAD_REQUEST,
            data: None,
            error: Some("request expired".into()),
        };
        match ApiClient::check_status(envelope) {
            Err(WalletError::Api { status, message }) => {
                assert_eq!(status, api_status::BAD_REQUEST);
                assert_eq!(message, "request expired");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}

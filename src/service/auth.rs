//! 签名认证
//!
//! 没有口令，身份就是私钥：客户端用当前时间戳构造挑战串、
//! 用主链密钥签名，服务端验签并核对时效（15 秒内）后放行。
//! 存在性检查与登录共用同一套挑战格式，但走不同路径；
//! 只有登录会签发访问令牌。

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::domain::{ChainKey, MAIN_CHAIN};
use crate::error::{Result, WalletError};
use crate::infrastructure::http::ApiRes;
use crate::service::chain_ops::ChainRegistry;
use crate::utils::time_utils::current_timestamp_ms;

/// 存在性检查的挑战串，与被签名的消息逐字节一致
pub fn auth_exists_message(address: &str, timestamp_ms: i64) -> String {
    format!("/auth/exists/{address}?timestamp={timestamp_ms}")
}

/// 登录挑战串
pub fn auth_login_message(address: &str, timestamp_ms: i64) -> String {
    format!("/auth/login/{address}?timestamp={timestamp_ms}")
}

/// 存在性检查的应答：是否已注册，外加已注册用户的资料摘要
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub is_new_user: bool,
    /// 令牌有效期（秒）
    pub expires_in: i64,
}

/// 一次签名产出的登录参数
#[derive(Debug, Clone)]
pub struct LoginParams {
    pub public_key: String,
    pub timestamp: i64,
    pub signature: String,
}

/// 用主链密钥对当前时刻的登录挑战签名
pub async fn login_params(registry: &ChainRegistry, key: &ChainKey) -> Result<LoginParams> {
    let ops = registry.resolve(key.chain)?;
    let timestamp = current_timestamp_ms();
    let message = auth_login_message(&key.address, timestamp);
    let signature = ops.sign_message(key, &message).await?;
    Ok(LoginParams {
        public_key: key.address.clone(),
        timestamp,
        signature,
    })
}

/// 询问后端某地址是否已有账户，返回存在性与资料摘要；
/// 传输层失败按配置的策略重试
pub async fn check_account_exists(state: &AppState, key: &ChainKey) -> Result<ExistsResponse> {
    let ops = state.registry.resolve(key.chain)?;
    let timestamp = current_timestamp_ms();
    let message = auth_exists_message(&key.address, timestamp);
    let signature = ops.sign_message(key, &message).await?;
    let path = format!(
        "/auth/exists/{}?timestamp={timestamp}&signature={signature}",
        key.address
    );
    let envelope: ApiRes<ExistsResponse> = state
        .api
        .get_json_with_retry(&path, &state.headers(), &state.config.api.exists_retry)
        .await?;
    Ok(envelope.data.unwrap_or_default())
}

/// 登录并返回令牌；不触碰本地缓存
pub async fn login(state: &AppState, key: &ChainKey) -> Result<LoginResponse> {
    let params = login_params(&state.registry, key).await?;
    let path = format!(
        "/auth/login?public_key={}&timestamp={}&signature={}",
        params.public_key, params.timestamp, params.signature
    );
    let envelope: ApiRes<LoginResponse> = state.api.get_json(&path, &state.headers()).await?;
    envelope
        .data
        .ok_or_else(|| WalletError::Network("login response missing data".into()))
}

/// 用当前账户的主链密钥登录并缓存令牌，返回令牌
pub async fn try_login_current_account(state: &AppState) -> Result<String> {
    let account = state.accounts.current_account()?;
    let address = state
        .accounts
        .address_for_account_chain(&account.id, MAIN_CHAIN)?;
    let key = state.accounts.chain_key_for_address(&address)?;
    let response = login(state, &key).await?;
    state
        .tokens
        .store(&account.id, &response.access_token, response.expires_in)?;
    tracing::info!(
        account = %account.id,
        is_new_user = response.is_new_user,
        "login succeeded"
    );
    Ok(response.access_token)
}

/// 当前账户的认证状态；不触网
pub fn auth_state(state: &AppState) -> AuthState {
    state
        .accounts
        .current_account_id()
        .and_then(|id| state.tokens.valid_token(&id))
        .map(|access_token| AuthState::Authenticated { access_token })
        .unwrap_or(AuthState::Unauthenticated)
}

/// 令牌未过期或不存在两种状态；过期与缺失不作区分
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated { access_token: String },
}

/// 保证当前账户持有有效令牌，必要时登录一次
pub async fn ensure_authenticated(state: &AppState) -> Result<String> {
    match auth_state(state) {
        AuthState::Authenticated { access_token } => Ok(access_token),
        AuthState::Unauthenticated => try_login_current_account(state).await,
    }
}

/// 带认证的 GET：令牌被服务端判为过期时重新登录一次并重放一次，
/// 第二次仍过期则原样上抛
pub async fn get_authenticated<T: DeserializeOwned>(
    state: &AppState,
    path: &str,
) -> Result<ApiRes<T>> {
    ensure_authenticated(state).await?;
    match state.api.get_json(path, &state.headers()).await {
        Err(WalletError::AccessTokenExpired) => {
            tracing::debug!(path, "access token rejected, re-authenticating");
            try_login_current_account(state).await?;
            state.api.get_json(path, &state.headers()).await
        }
        other => other,
    }
}

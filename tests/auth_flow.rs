//! 认证流程用例：登录、令牌缓存与过期重放
//!
//! 用本地桩服务回放预置信封，断言请求次数与路径，
//! 验证 "过期只重登录一次、只重放一次" 的约定。

mod common;

use std::sync::Arc;

use serde_json::Value;

use shogun_core::app_state::AppState;
use shogun_core::config::Config;
use shogun_core::error::WalletError;
use shogun_core::infrastructure::http::ApiClient;
use shogun_core::infrastructure::kv::{KvStore, MemoryKvStore};
use shogun_core::infrastructure::token_cache::AccessTokenCache;
use shogun_core::repository::AccountStore;
use shogun_core::service::auth;
use shogun_core::service::chain_ops::ChainRegistry;

use common::StubServer;

const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn login_ok(token: &str) -> String {
    format!(
        r#"{{"status":200,"data":{{"access_token":"{token}","is_new_user":false,"expires_in":3600}}}}"#
    )
}

fn token_expired() -> String {
    r#"{"status":4000,"error":"access token expired"}"#.to_string()
}

fn state_against(base_url: &str) -> AppState {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let registry = Arc::new(ChainRegistry::new(&config).unwrap());
    let accounts = Arc::new(AccountStore::open_in_memory(kv.clone()).unwrap());
    let tokens = AccessTokenCache::new(kv);
    let api = ApiClient::new(&config.api).unwrap();
    let state = AppState::with_parts(config, registry, accounts, tokens, api);
    state
        .accounts
        .create_new_wallet(&state.registry, TEST_MNEMONIC)
        .unwrap();
    state
}

#[tokio::test]
async fn login_stores_token_for_current_account() {
    let server = StubServer::start(vec![login_ok("tok-1")]).await;
    let state = state_against(&server.base_url);
    let account_id = state.accounts.current_account_id().unwrap();

    let token = auth::try_login_current_account(&state).await.unwrap();
    assert_eq!(token, "tok-1");
    assert_eq!(state.tokens.valid_token(&account_id).as_deref(), Some("tok-1"));
    assert_eq!(
        auth::auth_state(&state),
        auth::AuthState::Authenticated {
            access_token: "tok-1".into()
        }
    );

    let paths = server.recorded_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("/auth/login?public_key="));
    assert!(paths[0].contains("&timestamp=") && paths[0].contains("&signature="));
}

#[tokio::test]
async fn expired_token_triggers_exactly_one_relogin_and_replay() {
    let server = StubServer::start(vec![
        token_expired(),
        login_ok("fresh"),
        r#"{"status":200,"data":{"balance":"1"}}"#.to_string(),
    ])
    .await;
    let state = state_against(&server.base_url);
    let account_id = state.accounts.current_account_id().unwrap();
    // 预置一枚本地未过期、服务端已判废的令牌
    state.tokens.store(&account_id, "stale", 3600).unwrap();

    let envelope = auth::get_authenticated::<Value>(&state, "/account/info")
        .await
        .unwrap();
    assert_eq!(envelope.status, 200);
    assert_eq!(state.tokens.valid_token(&account_id).as_deref(), Some("fresh"));

    let paths = server.recorded_paths();
    assert_eq!(paths.len(), 3, "request, relogin, replay");
    assert_eq!(paths[0], "/account/info");
    assert!(paths[1].starts_with("/auth/login?"));
    assert_eq!(paths[2], "/account/info");
}

#[tokio::test]
async fn second_expiry_surfaces_error_without_second_relogin() {
    let server = StubServer::start(vec![
        token_expired(),
        login_ok("fresh"),
        token_expired(),
    ])
    .await;
    let state = state_against(&server.base_url);
    let account_id = state.accounts.current_account_id().unwrap();
    state.tokens.store(&account_id, "stale", 3600).unwrap();

    let err = auth::get_authenticated::<Value>(&state, "/account/info")
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::AccessTokenExpired));

    let login_calls = server
        .recorded_paths()
        .iter()
        .filter(|p| p.starts_with("/auth/login?"))
        .count();
    assert_eq!(login_calls, 1);
}

#[tokio::test]
async fn unauthenticated_state_logs_in_before_first_request() {
    let server = StubServer::start(vec![
        login_ok("first"),
        r#"{"status":200,"data":null}"#.to_string(),
    ])
    .await;
    let state = state_against(&server.base_url);
    assert_eq!(auth::auth_state(&state), auth::AuthState::Unauthenticated);

    auth::get_authenticated::<Value>(&state, "/account/info")
        .await
        .unwrap();

    let paths = server.recorded_paths();
    assert_eq!(paths.len(), 2);
    assert!(paths[0].starts_with("/auth/login?"));
    assert_eq!(paths[1], "/account/info");
}

#[tokio::test]
async fn exists_check_reports_backend_answer_with_profile() {
    let server = StubServer::start(vec![
        r#"{"status":200,"data":{"exists":true,"id":"u1","username":"alice","thumbnail":"https://images.shogun.social/u1"}}"#
            .to_string(),
    ])
    .await;
    let state = state_against(&server.base_url);
    let account_id = state.accounts.current_account_id().unwrap();
    let key = state.accounts.chain_key_for_address(&account_id).unwrap();

    let response = auth::check_account_exists(&state, &key).await.unwrap();
    assert!(response.exists);
    assert_eq!(response.id.as_deref(), Some("u1"));
    assert_eq!(response.username.as_deref(), Some("alice"));
    assert_eq!(response.name, None);

    let paths = server.recorded_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with(&format!("/auth/exists/{account_id}?timestamp=")));
}

#[tokio::test]
async fn exists_check_handles_unregistered_address() {
    let server = StubServer::start(vec![r#"{"status":200,"data":{"exists":false}}"#.to_string()]).await;
    let state = state_against(&server.base_url);
    let account_id = state.accounts.current_account_id().unwrap();
    let key = state.accounts.chain_key_for_address(&account_id).unwrap();

    let response = auth::check_account_exists(&state, &key).await.unwrap();
    assert!(!response.exists);
    assert_eq!(response.username, None);
}

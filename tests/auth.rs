//! HTTP auth tests: register, login, logout, and the Bearer-token guard.

use std::sync::Arc;

use papertrade::api::routes::{AppState, app_router};
use papertrade::ledger::{LedgerStore, MemLedger};
use papertrade::portfolio::PortfolioEngine;
use papertrade::quotes::FixedQuoteProvider;

fn test_app_state() -> AppState {
    let ledger: Arc<dyn LedgerStore> = Arc::new(MemLedger::new());
    let quotes = Arc::new(FixedQuoteProvider::new());
    let engine = PortfolioEngine::new(ledger.clone(), quotes);
    AppState {
        engine,
        ledger,
        jwt_secret: b"test-jwt-secret".to_vec(),
    }
}

/// Spawn the app on a random port and return (base_url, guard that keeps
/// the server running).
async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

async fn register(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({
            "username": username,
            "password": password,
            "confirmation": password,
        }))
        .send()
        .await
        .unwrap()
}

async fn login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn register_returns_201_with_starting_cash() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = register(&client, &base_url, "alice", "secret123").await;
    assert_eq!(res.status().as_u16(), 201);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("user_id").and_then(|v| v.as_str()).is_some());
    assert_eq!(json.get("username").and_then(|v| v.as_str()), Some("alice"));
    assert_eq!(
        json.get("cash").and_then(|v| v.as_str()),
        Some("$10,000.00")
    );
}

#[tokio::test]
async fn register_empty_username_returns_400() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = register(&client, &base_url, "", "secret123").await;
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(
        json.get("error")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("required")
    );
}

#[tokio::test]
async fn register_password_mismatch_returns_400() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({
            "username": "alice",
            "password": "secret123",
            "confirmation": "secret124",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(
        json.get("error")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("do not match")
    );
}

#[tokio::test]
async fn register_empty_confirmation_returns_400() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({
            "username": "alice",
            "password": "secret123",
            "confirmation": "",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_username_returns_409_and_keeps_first_user() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = register(&client, &base_url, "alice", "first-password").await;
    assert_eq!(res.status().as_u16(), 201);

    let res = register(&client, &base_url, "alice", "second-password").await;
    assert_eq!(res.status().as_u16(), 409);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("error").unwrap().as_str().unwrap().contains("taken"));

    // The original account is untouched.
    let res = login(&client, &base_url, "alice", "first-password").await;
    assert_eq!(res.status().as_u16(), 200);
    let res = login(&client, &base_url, "alice", "second-password").await;
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn login_returns_token_that_unlocks_protected_routes() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    register(&client, &base_url, "alice", "secret123").await;

    let res = login(&client, &base_url, "alice", "secret123").await;
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    let token = json.get("token").and_then(|v| v.as_str()).unwrap();

    let res = client
        .get(format!("{}/portfolio", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn login_failure_message_is_the_same_for_username_and_password() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    register(&client, &base_url, "alice", "secret123").await;

    let res = login(&client, &base_url, "alice", "wrong-password").await;
    assert_eq!(res.status().as_u16(), 401);
    let wrong_password: serde_json::Value = res.json().await.unwrap();

    let res = login(&client, &base_url, "no-such-user", "secret123").await;
    assert_eq!(res.status().as_u16(), 401);
    let wrong_username: serde_json::Value = res.json().await.unwrap();

    assert_eq!(wrong_password, wrong_username);
    assert_eq!(
        wrong_password.get("error").and_then(|v| v.as_str()),
        Some("invalid username or password")
    );
}

#[tokio::test]
async fn usernames_are_case_insensitive() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = register(&client, &base_url, "Alice", "secret123").await;
    assert_eq!(res.status().as_u16(), 201);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json.get("username").and_then(|v| v.as_str()), Some("alice"));

    let res = login(&client, &base_url, "ALICE", "secret123").await;
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn protected_routes_reject_missing_or_garbage_tokens() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/portfolio", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = client
        .get(format!("{}/history", base_url))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn logout_acknowledges_for_authenticated_users() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    register(&client, &base_url, "alice", "secret123").await;
    let res = login(&client, &base_url, "alice", "secret123").await;
    let json: serde_json::Value = res.json().await.unwrap();
    let token = json.get("token").and_then(|v| v.as_str()).unwrap().to_string();

    let res = client
        .post(format!("{}/auth/logout", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json.get("ok").and_then(|v| v.as_bool()), Some(true));

    let res = client
        .post(format!("{}/auth/logout", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

//! HTTP surface: router, shared state, and JSON handlers. Handlers stay
//! thin; validation and ledger rules live in the portfolio engine.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::api::auth::{self, AuthUser};
use crate::error::AppError;
use crate::ledger::LedgerStore;
use crate::portfolio::{PortfolioEngine, STARTING_CASH, parse_shares};

#[derive(Clone)]
pub struct AppState {
    pub engine: PortfolioEngine,
    pub ledger: Arc<dyn LedgerStore>,
    pub jwt_secret: Vec<u8>,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/quote/{symbol}", get(quote))
        .route("/buy", post(buy))
        .route("/sell", post(sell))
        .route("/portfolio", get(portfolio))
        .route("/history", get(history))
        .with_state(state)
}

async fn health() -> &'static str {
    "healthy"
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
    confirmation: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim().to_lowercase();
    if username.is_empty() {
        return Err(AppError::Validation("username is required".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }
    if req.confirmation.is_empty() {
        return Err(AppError::Validation(
            "password confirmation is required".to_string(),
        ));
    }
    if req.password != req.confirmation {
        return Err(AppError::Validation("passwords do not match".to_string()));
    }

    let password_hash = auth::hash_password(&req.password)?;
    let user = state
        .ledger
        .create_user(&username, &password_hash, STARTING_CASH)
        .await?;
    info!(username = %user.username, "registered user");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user_id": user.id,
            "username": user.username,
            "cash": user.cash,
        })),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let username = req.username.trim().to_lowercase();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".to_string(),
        ));
    }
    // Unknown username and wrong password are indistinguishable outward.
    let user = state
        .ledger
        .user_by_username(&username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }
    let token = auth::create_token(&state.jwt_secret, user.id)
        .map_err(|_| AppError::Internal("token creation failed"))?;
    Ok(Json(json!({ "token": token, "user_id": user.id })))
}

/// Tokens are stateless; logout is an acknowledgment and the client
/// discards its token.
async fn logout(_user: AuthUser) -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn quote(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quote = state.engine.quote(&symbol).await?;
    Ok(Json(quote))
}

#[derive(Deserialize)]
struct TradeRequest {
    symbol: String,
    // Integer or digit string; parsed and validated by the engine.
    shares: Value,
}

async fn buy(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<TradeRequest>,
) -> Result<Json<Value>, AppError> {
    let shares = parse_shares(&req.shares)?;
    let receipt = state.engine.buy(user.user_id, &req.symbol, shares).await?;
    Ok(Json(json!({ "cash": receipt.cash, "trade": receipt.trade })))
}

async fn sell(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<TradeRequest>,
) -> Result<Json<Value>, AppError> {
    let shares = parse_shares(&req.shares)?;
    let receipt = state.engine.sell(user.user_id, &req.symbol, shares).await?;
    Ok(Json(json!({ "cash": receipt.cash, "trade": receipt.trade })))
}

async fn portfolio(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let view = state.engine.positions(user.user_id).await?;
    Ok(Json(view))
}

async fn history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let trades = state.engine.history(user.user_id).await?;
    Ok(Json(json!({ "trades": trades })))
}

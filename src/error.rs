//! Outward error taxonomy. Every business-rule and validation failure is a
//! structured result up to the HTTP layer; only storage failures map to 5xx.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::ledger::LedgerError;
use crate::types::money::Cents;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed client input. Never mutates state.
    #[error("{0}")]
    Validation(String),

    #[error("username is already taken")]
    UsernameTaken,

    /// Deliberately generic: does not reveal whether the username or the
    /// password was wrong.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("not authenticated")]
    NotAuthenticated,

    /// Symbol lookup failed. Network errors, unknown tickers, and malformed
    /// provider responses all collapse into this one outward kind; the
    /// finer-grained cause is logged where it happens.
    #[error("could not get a quote for {0}")]
    QuoteUnavailable(String),

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Cents, available: Cents },

    #[error("insufficient shares of {symbol}: requested {requested}, holding {held}")]
    InsufficientShares {
        symbol: String,
        requested: i64,
        held: i64,
    },

    #[error("storage failure")]
    Storage(#[source] LedgerError),

    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::QuoteUnavailable(_)
            | AppError::InsufficientFunds { .. }
            | AppError::InsufficientShares { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::UsernameTaken => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DuplicateUsername => AppError::UsernameTaken,
            LedgerError::UnknownUser => AppError::NotAuthenticated,
            LedgerError::InsufficientFunds { needed, available } => {
                AppError::InsufficientFunds { needed, available }
            }
            LedgerError::InsufficientShares {
                symbol,
                requested,
                held,
            } => AppError::InsufficientShares {
                symbol,
                requested,
                held,
            },
            LedgerError::InvalidTrade(msg) => AppError::Validation(msg.to_string()),
            err @ LedgerError::Database(_) => AppError::Storage(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Server-side failures get logged with their source chain; the
        // client only ever sees a generic message for those.
        let message = if status.is_server_error() {
            error!(error = ?self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

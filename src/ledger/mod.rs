//! Ledger store: users plus the append-only trade log. All cash balances
//! and positions derive from what is persisted here; nothing portfolio-
//! related is cached in process.

mod memory;
mod pool;
mod postgres;

pub use memory::MemLedger;
pub use pool::{create_pool_and_migrate, run_migrations};
pub use postgres::PgLedger;
pub use sqlx::PgPool;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::types::money::Cents;
use crate::types::position::Position;
use crate::types::trade::Trade;
use crate::types::user::User;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("username is already taken")]
    DuplicateUsername,

    #[error("no such user")]
    UnknownUser,

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Cents, available: Cents },

    #[error("insufficient shares of {symbol}: requested {requested}, holding {held}")]
    InsufficientShares {
        symbol: String,
        requested: i64,
        held: i64,
    },

    /// A trade that violates ledger invariants (zero shares, non-positive
    /// price, empty symbol, value overflow). Callers validate first, so
    /// hitting this means a bug upstream.
    #[error("invalid trade: {0}")]
    InvalidTrade(&'static str),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of a committed buy or sell: the appended trade and the cash
/// balance after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
    pub trade: Trade,
    pub cash: Cents,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a user with the given starting cash. Uniqueness of the
    /// username is enforced by the store itself (unique constraint), not a
    /// read-then-insert; a losing concurrent registration gets
    /// `DuplicateUsername`.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        cash: Cents,
    ) -> Result<User, LedgerError>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, LedgerError>;

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, LedgerError>;

    /// Atomically apply one signed trade: re-validate cash (for buys) or
    /// held shares (for sells) against committed state, adjust cash by
    /// `-shares * price`, and append the trade. Both mutations commit
    /// together or not at all, and calls for the same user are linearizable.
    async fn apply_trade(
        &self,
        user_id: Uuid,
        symbol: &str,
        shares: i64,
        price: Cents,
    ) -> Result<TradeReceipt, LedgerError>;

    /// Net shares per symbol for a user, open (sum > 0) positions only,
    /// symbols ascending.
    async fn open_positions(&self, user_id: Uuid) -> Result<Vec<Position>, LedgerError>;

    /// All trades for a user, newest first.
    async fn trades_for_user(&self, user_id: Uuid) -> Result<Vec<Trade>, LedgerError>;
}

/// Invariant checks shared by every `LedgerStore` implementation.
pub(crate) fn validate_trade(symbol: &str, shares: i64, price: Cents) -> Result<(), LedgerError> {
    if symbol.trim().is_empty() {
        return Err(LedgerError::InvalidTrade("symbol must not be empty"));
    }
    if shares == 0 {
        return Err(LedgerError::InvalidTrade("share quantity must be nonzero"));
    }
    if price.raw() <= 0 {
        return Err(LedgerError::InvalidTrade("price must be positive"));
    }
    Ok(())
}

//! Postgres ledger over the `users` and `trades` tables.
//!
//! Buy/sell runs in one transaction that locks the user row first, so the
//! check-then-act sequence for a given user is serialized at the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::ledger::{LedgerError, LedgerStore, TradeReceipt, validate_trade};
use crate::types::money::Cents;
use crate::types::position::Position;
use crate::types::trade::Trade;
use crate::types::user::User;

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    cash_cents: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> User {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            cash: Cents::new(row.cash_cents),
        }
    }
}

#[derive(FromRow)]
struct TradeRow {
    id: Uuid,
    user_id: Uuid,
    symbol: String,
    shares: i64,
    price_cents: i64,
    created_at: DateTime<Utc>,
}

impl From<TradeRow> for Trade {
    fn from(row: TradeRow) -> Trade {
        Trade {
            id: row.id,
            user_id: row.user_id,
            symbol: row.symbol,
            shares: row.shares,
            price: Cents::new(row.price_cents),
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct PositionRow {
    symbol: String,
    shares: i64,
}

const UNIQUE_VIOLATION: &str = "23505";

fn map_user_insert_error(err: sqlx::Error) -> LedgerError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return LedgerError::DuplicateUsername;
        }
    }
    LedgerError::Database(err)
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        cash: Cents,
    ) -> Result<User, LedgerError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, username, password_hash, cash_cents) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(username)
            .bind(password_hash)
            .bind(cash.raw())
            .execute(&self.pool)
            .await
            .map_err(map_user_insert_error)?;
        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            cash,
        })
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, LedgerError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, cash_cents FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, LedgerError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, cash_cents FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn apply_trade(
        &self,
        user_id: Uuid,
        symbol: &str,
        shares: i64,
        price: Cents,
    ) -> Result<TradeReceipt, LedgerError> {
        validate_trade(symbol, shares, price)?;
        let cost = price
            .raw()
            .checked_mul(shares)
            .ok_or(LedgerError::InvalidTrade("trade value overflows"))?;

        let mut tx = self.pool.begin().await?;

        // Row lock serializes all buys/sells for this user; the validation
        // below sees committed state, never a stale balance or position.
        let cash: Option<i64> =
            sqlx::query_scalar("SELECT cash_cents FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let cash = cash.ok_or(LedgerError::UnknownUser)?;
        let new_cash = cash
            .checked_sub(cost)
            .ok_or(LedgerError::InvalidTrade("cash balance overflows"))?;

        if shares > 0 && new_cash < 0 {
            return Err(LedgerError::InsufficientFunds {
                needed: Cents::new(cost),
                available: Cents::new(cash),
            });
        }
        if shares < 0 {
            let held: i64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(shares), 0)::BIGINT FROM trades \
                 WHERE (user_id = $1 AND symbol = $2)",
            )
            .bind(user_id)
            .bind(symbol)
            .fetch_one(&mut *tx)
            .await?;
            let requested = -shares;
            if requested > held {
                return Err(LedgerError::InsufficientShares {
                    symbol: symbol.to_string(),
                    requested,
                    held,
                });
            }
        }

        let trade = Trade {
            id: Uuid::new_v4(),
            user_id,
            symbol: symbol.to_string(),
            shares,
            price,
            created_at: Utc::now(),
        };
        sqlx::query("UPDATE users SET cash_cents = $1 WHERE id = $2")
            .bind(new_cash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO trades (id, user_id, symbol, shares, price_cents, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(trade.id)
        .bind(trade.user_id)
        .bind(&trade.symbol)
        .bind(trade.shares)
        .bind(trade.price.raw())
        .bind(trade.created_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(TradeReceipt {
            trade,
            cash: Cents::new(new_cash),
        })
    }

    async fn open_positions(&self, user_id: Uuid) -> Result<Vec<Position>, LedgerError> {
        let rows = sqlx::query_as::<_, PositionRow>(
            "SELECT symbol, SUM(shares)::BIGINT AS shares FROM trades \
             WHERE user_id = $1 GROUP BY symbol HAVING SUM(shares) > 0 \
             ORDER BY symbol ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Position {
                symbol: row.symbol,
                shares: row.shares,
            })
            .collect())
    }

    async fn trades_for_user(&self, user_id: Uuid) -> Result<Vec<Trade>, LedgerError> {
        let rows = sqlx::query_as::<_, TradeRow>(
            "SELECT id, user_id, symbol, shares, price_cents, created_at FROM trades \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

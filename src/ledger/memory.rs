//! In-memory ledger with the same semantics as the Postgres one. Used for
//! offline runs and tests. The write lock is held for each whole
//! check-then-act sequence, which makes per-user operations linearizable.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ledger::{LedgerError, LedgerStore, TradeReceipt, validate_trade};
use crate::types::money::Cents;
use crate::types::position::Position;
use crate::types::trade::Trade;
use crate::types::user::User;

#[derive(Default)]
pub struct MemLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    users: HashMap<Uuid, User>,
    ids_by_username: HashMap<String, Uuid>,
    // Append-only, in execution order.
    trades: Vec<Trade>,
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn shares_held(trades: &[Trade], user_id: Uuid, symbol: &str) -> i64 {
    trades
        .iter()
        .filter(|t| t.user_id == user_id && t.symbol == symbol)
        .map(|t| t.shares)
        .sum()
}

#[async_trait]
impl LedgerStore for MemLedger {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        cash: Cents,
    ) -> Result<User, LedgerError> {
        let mut state = self.inner.write().await;
        if state.ids_by_username.contains_key(username) {
            return Err(LedgerError::DuplicateUsername);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            cash,
        };
        state.ids_by_username.insert(user.username.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, LedgerError> {
        let state = self.inner.read().await;
        let id = state.ids_by_username.get(username);
        Ok(id.and_then(|id| state.users.get(id)).cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, LedgerError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
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

        let mut state = self.inner.write().await;
        let cash = state
            .users
            .get(&user_id)
            .ok_or(LedgerError::UnknownUser)?
            .cash;
        let new_cash = cash
            .raw()
            .checked_sub(cost)
            .ok_or(LedgerError::InvalidTrade("cash balance overflows"))?;

        if shares > 0 && new_cash < 0 {
            return Err(LedgerError::InsufficientFunds {
                needed: Cents::new(cost),
                available: cash,
            });
        }
        if shares < 0 {
            let held = shares_held(&state.trades, user_id, symbol);
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
        state.trades.push(trade.clone());
        let user = state.users.get_mut(&user_id).ok_or(LedgerError::UnknownUser)?;
        user.cash = Cents::new(new_cash);
        Ok(TradeReceipt {
            trade,
            cash: user.cash,
        })
    }

    async fn open_positions(&self, user_id: Uuid) -> Result<Vec<Position>, LedgerError> {
        let state = self.inner.read().await;
        let mut totals: BTreeMap<String, i64> = BTreeMap::new();
        for trade in state.trades.iter().filter(|t| t.user_id == user_id) {
            *totals.entry(trade.symbol.clone()).or_default() += trade.shares;
        }
        Ok(totals
            .into_iter()
            .filter(|(_, shares)| *shares > 0)
            .map(|(symbol, shares)| Position { symbol, shares })
            .collect())
    }

    async fn trades_for_user(&self, user_id: Uuid) -> Result<Vec<Trade>, LedgerError> {
        let state = self.inner.read().await;
        // Execution order reversed; timestamps can collide within a tick.
        Ok(state
            .trades
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }
}

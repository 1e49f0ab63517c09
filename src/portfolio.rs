//! Portfolio engine: validates and applies buys and sells, derives holdings
//! from the trade log, and prices them for the portfolio view.
//! Testable without HTTP.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::ledger::{LedgerStore, TradeReceipt};
use crate::quotes::QuoteProvider;
use crate::types::money::Cents;
use crate::types::quote::Quote;
use crate::types::trade::Trade;

/// Cash every new account starts with: $10,000.00.
pub const STARTING_CASH: Cents = Cents::new(1_000_000);

#[derive(Clone)]
pub struct PortfolioEngine {
    ledger: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteProvider>,
}

/// One entry in the portfolio view. `price` and `market_value` are `None`
/// when the quote lookup failed; the position is still listed rather than
/// failing the whole view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionView {
    pub symbol: String,
    pub shares: i64,
    pub name: Option<String>,
    pub price: Option<Cents>,
    pub market_value: Option<Cents>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioView {
    pub positions: Vec<PositionView>,
    /// Sum of market values over the entries that could be priced.
    pub holdings_value: Cents,
    pub cash: Cents,
    pub net_worth: Cents,
}

/// Parse a requested share count from client input. Accepts a JSON integer
/// or a string of digits; anything fractional, non-numeric, zero, or
/// negative is a validation failure.
pub fn parse_shares(input: &Value) -> Result<i64, AppError> {
    let shares = match input {
        Value::Number(n) => n.as_i64().ok_or_else(invalid_shares)?,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid_shares())?,
        _ => return Err(invalid_shares()),
    };
    ensure_share_count(shares)?;
    Ok(shares)
}

fn invalid_shares() -> AppError {
    AppError::Validation("shares must be a whole number of at least 1".to_string())
}

fn ensure_share_count(shares: i64) -> Result<(), AppError> {
    if shares < 1 {
        return Err(invalid_shares());
    }
    Ok(())
}

fn normalize_symbol(symbol: &str) -> Result<String, AppError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(AppError::Validation("symbol is required".to_string()));
    }
    Ok(symbol.to_uppercase())
}

impl PortfolioEngine {
    pub fn new(ledger: Arc<dyn LedgerStore>, quotes: Arc<dyn QuoteProvider>) -> Self {
        Self { ledger, quotes }
    }

    /// Look up a current quote. Every provider failure collapses into one
    /// outward `QuoteUnavailable`; the cause is only logged.
    pub async fn quote(&self, symbol: &str) -> Result<Quote, AppError> {
        let symbol = normalize_symbol(symbol)?;
        self.lookup(&symbol).await
    }

    async fn lookup(&self, symbol: &str) -> Result<Quote, AppError> {
        match self.quotes.lookup(symbol).await {
            Ok(quote) => Ok(quote),
            Err(err) => {
                warn!(%symbol, error = %err, "quote lookup failed");
                Err(AppError::QuoteUnavailable(symbol.to_string()))
            }
        }
    }

    /// Buy `shares` of `symbol` at the current quoted price. The ledger
    /// re-checks funds inside its transaction and either debits cash and
    /// appends the trade together, or does nothing.
    pub async fn buy(
        &self,
        user_id: Uuid,
        symbol: &str,
        shares: i64,
    ) -> Result<TradeReceipt, AppError> {
        let symbol = normalize_symbol(symbol)?;
        ensure_share_count(shares)?;
        // Quote before the ledger transaction: network I/O must not run
        // under the per-user lock.
        let quote = self.lookup(&symbol).await?;
        quote
            .price
            .checked_mul_shares(shares)
            .ok_or_else(|| AppError::Validation("share count too large".to_string()))?;
        let receipt = self
            .ledger
            .apply_trade(user_id, &symbol, shares, quote.price)
            .await?;
        info!(%user_id, %symbol, shares, price = %quote.price, "buy executed");
        Ok(receipt)
    }

    /// Sell `shares` of `symbol` at the current quoted price. The ledger
    /// re-checks the held share count for exactly this (user, symbol) pair
    /// inside its transaction.
    pub async fn sell(
        &self,
        user_id: Uuid,
        symbol: &str,
        shares: i64,
    ) -> Result<TradeReceipt, AppError> {
        let symbol = normalize_symbol(symbol)?;
        ensure_share_count(shares)?;
        let quote = self.lookup(&symbol).await?;
        quote
            .price
            .checked_mul_shares(shares)
            .ok_or_else(|| AppError::Validation("share count too large".to_string()))?;
        let receipt = self
            .ledger
            .apply_trade(user_id, &symbol, -shares, quote.price)
            .await?;
        info!(%user_id, %symbol, shares, price = %quote.price, "sell executed");
        Ok(receipt)
    }

    /// Current holdings priced at fresh quotes, plus cash and net worth.
    /// A symbol whose quote fails is listed unpriced and excluded from the
    /// totals instead of failing the view.
    pub async fn positions(&self, user_id: Uuid) -> Result<PortfolioView, AppError> {
        let user = self
            .ledger
            .user_by_id(user_id)
            .await?
            .ok_or(AppError::NotAuthenticated)?;
        let open = self.ledger.open_positions(user_id).await?;

        let mut positions = Vec::with_capacity(open.len());
        let mut holdings_value = Cents::ZERO;
        for position in open {
            match self.quotes.lookup(&position.symbol).await {
                Ok(quote) => {
                    let market_value = quote.price.checked_mul_shares(position.shares);
                    if let Some(value) = market_value {
                        holdings_value = holdings_value.saturating_add(value);
                    }
                    positions.push(PositionView {
                        symbol: position.symbol,
                        shares: position.shares,
                        name: Some(quote.name),
                        price: Some(quote.price),
                        market_value,
                    });
                }
                Err(err) => {
                    warn!(
                        symbol = %position.symbol,
                        error = %err,
                        "quote unavailable; listing position unpriced"
                    );
                    positions.push(PositionView {
                        symbol: position.symbol,
                        shares: position.shares,
                        name: None,
                        price: None,
                        market_value: None,
                    });
                }
            }
        }

        let net_worth = holdings_value.saturating_add(user.cash);
        Ok(PortfolioView {
            positions,
            holdings_value,
            cash: user.cash,
            net_worth,
        })
    }

    /// All of the user's trades, newest first. Read-only.
    pub async fn history(&self, user_id: Uuid) -> Result<Vec<Trade>, AppError> {
        Ok(self.ledger.trades_for_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_shares_accepts_integers_and_digit_strings() {
        assert_eq!(parse_shares(&json!(10)).unwrap(), 10);
        assert_eq!(parse_shares(&json!("7")).unwrap(), 7);
        assert_eq!(parse_shares(&json!(" 3 ")).unwrap(), 3);
    }

    #[test]
    fn parse_shares_rejects_bad_input() {
        for input in [
            json!(0),
            json!(-4),
            json!(1.5),
            json!("1.5"),
            json!("ten"),
            json!(""),
            json!(null),
            json!(true),
            json!(["10"]),
        ] {
            assert!(
                matches!(parse_shares(&input), Err(AppError::Validation(_))),
                "expected validation failure for {input}"
            );
        }
    }

    #[test]
    fn normalize_symbol_trims_and_uppercases() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert!(matches!(
            normalize_symbol("   "),
            Err(AppError::Validation(_))
        ));
    }
}

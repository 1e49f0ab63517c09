//! Quote lookup: the `QuoteProvider` seam, an HTTP client for an IEX-style
//! quote API, and a fixed in-process table for offline runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::types::money::Cents;
use crate::types::quote::Quote;

pub const DEFAULT_QUOTE_API: &str = "https://cloud.iexapis.com/stable";

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("quote request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unknown symbol")]
    UnknownSymbol,
    #[error("malformed quote payload: {0}")]
    Malformed(&'static str),
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Resolve a symbol to a current quote. Callers pass the symbol already
    /// trimmed and uppercased.
    async fn lookup(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

/// HTTP client against `GET {base}/stock/{symbol}/quote?token={key}`.
pub struct HttpQuoteProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct QuotePayload {
    #[serde(rename = "companyName")]
    company_name: String,
    #[serde(rename = "latestPrice")]
    latest_price: f64,
    symbol: String,
}

impl HttpQuoteProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteProvider {
    async fn lookup(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let url = format!(
            "{}/stock/{}/quote?token={}",
            self.base_url, symbol, self.api_key
        );
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(QuoteError::UnknownSymbol);
        }
        let payload: QuotePayload = response.error_for_status()?.json().await?;
        let price = Cents::from_quote_price(payload.latest_price)
            .ok_or(QuoteError::Malformed("latestPrice out of range"))?;
        Ok(Quote {
            name: payload.company_name,
            price,
            symbol: payload.symbol.to_uppercase(),
        })
    }
}

/// Fixed quote table. Serves deterministic prices without network access;
/// prices can be changed between lookups.
#[derive(Default)]
pub struct FixedQuoteProvider {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl FixedQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handful of well-known tickers, for running without an API key.
    pub fn with_demo_quotes() -> Self {
        let demo = [
            ("AAPL", "Apple Inc", 19_012),
            ("AMZN", "Amazon.com Inc", 22_987),
            ("MSFT", "Microsoft Corporation", 50_660),
            ("NFLX", "Netflix Inc", 120_489),
        ];
        let quotes = demo
            .into_iter()
            .map(|(symbol, name, cents)| {
                (
                    symbol.to_string(),
                    Quote {
                        name: name.to_string(),
                        price: Cents::new(cents),
                        symbol: symbol.to_string(),
                    },
                )
            })
            .collect();
        Self {
            quotes: RwLock::new(quotes),
        }
    }

    pub async fn set(&self, symbol: &str, name: &str, price: Cents) {
        let symbol = symbol.to_uppercase();
        self.quotes.write().await.insert(
            symbol.clone(),
            Quote {
                name: name.to_string(),
                price,
                symbol,
            },
        );
    }

    pub async fn remove(&self, symbol: &str) {
        self.quotes.write().await.remove(&symbol.to_uppercase());
    }
}

#[async_trait]
impl QuoteProvider for FixedQuoteProvider {
    async fn lookup(&self, symbol: &str) -> Result<Quote, QuoteError> {
        self.quotes
            .read()
            .await
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or(QuoteError::UnknownSymbol)
    }
}

use std::sync::Arc;

use papertrade::api::routes::{AppState, app_router};
use papertrade::ledger::{LedgerStore, MemLedger, PgLedger, create_pool_and_migrate};
use papertrade::portfolio::PortfolioEngine;
use papertrade::quotes::{DEFAULT_QUOTE_API, FixedQuoteProvider, HttpQuoteProvider, QuoteProvider};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("papertrade=info")),
        )
        .init();

    let ledger: Arc<dyn LedgerStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = create_pool_and_migrate(&url)
                .await
                .expect("database setup failed");
            Arc::new(PgLedger::new(pool))
        }
        Err(_) => {
            warn!("DATABASE_URL not set; using the in-memory ledger");
            Arc::new(MemLedger::new())
        }
    };

    let quotes: Arc<dyn QuoteProvider> = match std::env::var("QUOTE_API_KEY") {
        Ok(api_key) => Arc::new(HttpQuoteProvider::new(DEFAULT_QUOTE_API, api_key)),
        Err(_) => {
            warn!("QUOTE_API_KEY not set; serving fixed demo quotes");
            Arc::new(FixedQuoteProvider::with_demo_quotes())
        }
    };

    let jwt_secret = std::env::var("JWT_SECRET")
        .map(String::into_bytes)
        .unwrap_or_else(|_| {
            warn!("JWT_SECRET not set; using an insecure development secret");
            b"papertrade-dev-secret".to_vec()
        });

    let engine = PortfolioEngine::new(ledger.clone(), quotes);
    let state = AppState {
        engine,
        ledger,
        jwt_secret,
    };

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    info!(%bind_addr, "listening");
    axum::serve(listener, app).await.unwrap();
}

//! Paper-trading service: registered users quote, buy, and sell shares
//! against a virtual cash balance. Every balance and position derives from
//! the persisted user row and append-only trade log.

pub mod api;
pub mod error;
pub mod ledger;
pub mod portfolio;
pub mod quotes;
pub mod types;

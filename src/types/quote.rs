use serde::Serialize;

use crate::types::money::Cents;

/// Snapshot price for a symbol at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub name: String,
    pub price: Cents,
    pub symbol: String,
}

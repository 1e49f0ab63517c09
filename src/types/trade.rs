use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::money::Cents;

/// One executed buy or sell. Append-only: trades are never edited or
/// deleted, and every balance and position derives from this log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    /// Signed share count: positive = buy, negative = sell.
    pub shares: i64,
    /// Per-share price at execution time.
    pub price: Cents,
    pub created_at: DateTime<Utc>,
}

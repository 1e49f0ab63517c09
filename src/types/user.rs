use uuid::Uuid;

use crate::types::money::Cents;

/// Account row: identity, credential hash, cash balance. The hash is an
/// argon2 PHC string and is never serialized outward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub cash: Cents,
}

pub mod money;
pub mod position;
pub mod quote;
pub mod trade;
pub mod user;

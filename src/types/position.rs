/// Net holding in one symbol, derived by summing signed trade quantities
/// for a (user, symbol) pair. Never stored; recomputed from the trade log
/// on every read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub symbol: String,
    pub shares: i64,
}

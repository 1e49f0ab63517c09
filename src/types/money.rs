//! Fixed-point money. All balances and prices are integer cents; the only
//! decimal conversion happens once, when a quote price crosses the boundary.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Serialize, Serializer};

/// An amount of money in integer cents. Arithmetic is closed over `Cents`;
/// there is no implicit conversion from raw integers or floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn new(cents: i64) -> Self {
        Cents(cents)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Convert a decimal price (as reported by the quote API) to cents,
    /// rounding half away from zero. Non-finite and non-positive prices
    /// are rejected.
    pub fn from_quote_price(price: f64) -> Option<Cents> {
        if !price.is_finite() || price <= 0.0 {
            return None;
        }
        let cents = (price * 100.0).round();
        if cents < 1.0 || cents > i64::MAX as f64 {
            return None;
        }
        Some(Cents(cents as i64))
    }

    /// Total value of `shares` at this per-share price. `None` on overflow.
    pub fn checked_mul_shares(self, shares: i64) -> Option<Cents> {
        self.0.checked_mul(shares).map(Cents)
    }

    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }

    pub fn checked_sub(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_sub(rhs.0).map(Cents)
    }

    pub fn saturating_add(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_add(rhs.0))
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

/// `$1,234.56` style: currency symbol, comma groups, exactly two decimals.
impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let dollars = (abs / 100).to_string();
        let cents = abs % 100;
        let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
        for (i, ch) in dollars.chars().enumerate() {
            if i > 0 && (dollars.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "{sign}${grouped}.{cents:02}")
    }
}

/// Money goes over the wire in display form, never as a float.
impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals_and_groups() {
        assert_eq!(Cents::new(5).to_string(), "$0.05");
        assert_eq!(Cents::new(15000).to_string(), "$150.00");
        assert_eq!(Cents::new(1_000_000).to_string(), "$10,000.00");
        assert_eq!(Cents::new(123_456_789).to_string(), "$1,234,567.89");
        assert_eq!(Cents::new(-50).to_string(), "-$0.50");
    }

    #[test]
    fn from_quote_price_rounds_to_the_cent() {
        assert_eq!(Cents::from_quote_price(150.0), Some(Cents::new(15000)));
        assert_eq!(Cents::from_quote_price(37.45), Some(Cents::new(3745)));
        assert_eq!(Cents::from_quote_price(0.01), Some(Cents::new(1)));
    }

    #[test]
    fn from_quote_price_rejects_bad_input() {
        assert_eq!(Cents::from_quote_price(0.0), None);
        assert_eq!(Cents::from_quote_price(-1.0), None);
        assert_eq!(Cents::from_quote_price(f64::NAN), None);
        assert_eq!(Cents::from_quote_price(f64::INFINITY), None);
    }

    #[test]
    fn checked_mul_shares_detects_overflow() {
        assert_eq!(
            Cents::new(15000).checked_mul_shares(10),
            Some(Cents::new(150_000))
        );
        assert_eq!(Cents::new(i64::MAX).checked_mul_shares(2), None);
    }

    #[test]
    fn serializes_as_display_string() {
        let json = serde_json::to_value(Cents::new(850_000)).unwrap();
        assert_eq!(json, serde_json::json!("$8,500.00"));
    }
}

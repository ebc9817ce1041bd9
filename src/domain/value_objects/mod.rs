//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Price value object (Brazilian real).
///
/// Serialized as a plain JSON number so cart snapshots stay compatible with
/// the browser storage format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    /// Price from an integer number of centavos.
    pub fn from_cents(cents: i64) -> Self { Self(Decimal::new(cents, 2)) }

    pub fn multiply(&self, qty: u32) -> Price { Price(self.0 * Decimal::from(qty)) }
}

impl Add for Price {
    type Output = Price;
    fn add(self, other: Price) -> Price { Price(self.0 + other.0) }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Price { iter.fold(Price::ZERO, Add::add) }
}

impl<'a> Sum<&'a Price> for Price {
    fn sum<I: Iterator<Item = &'a Price>>(iter: I) -> Price { iter.copied().sum() }
}

/// Formats as `R$ 1.234,50`.
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(2);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        let text = format!("{:.2}", rounded.abs());
        let (units, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(units.len() + units.len() / 3);
        for (i, digit) in units.chars().enumerate() {
            if i > 0 && (units.len() - i) % 3 == 0 { grouped.push('.'); }
            grouped.push(digit);
        }
        write!(f, "{sign}R$ {grouped},{cents}")
    }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

impl Default for Quantity { fn default() -> Self { Self(1) } }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_cents(1000).to_string(), "R$ 10,00");
        assert_eq!(Price::from_cents(123450).to_string(), "R$ 1.234,50");
        assert_eq!(Price::from_cents(100000000).to_string(), "R$ 1.000.000,00");
        assert_eq!(Price::ZERO.to_string(), "R$ 0,00");
        assert_eq!(Price::from_cents(-250).to_string(), "-R$ 2,50");
    }

    #[test]
    fn test_price_arithmetic() {
        let base = Price::from_cents(1500);
        let surcharge = Price::from_cents(300);
        assert_eq!((base + surcharge).multiply(4), Price::from_cents(7200));
        let total: Price = [base, surcharge].iter().sum();
        assert_eq!(total, Price::from_cents(1800));
    }

    #[test]
    fn test_price_json_is_a_number() {
        let json = serde_json::to_string(&Price::from_cents(1250)).unwrap();
        assert_eq!(json, "12.5");
        let back: Price = serde_json::from_str("10").unwrap();
        assert_eq!(back, Price::from_cents(1000));
    }

    #[test]
    fn test_quantity_saturates() {
        let q = Quantity::new(u32::MAX - 1);
        assert_eq!(q.add(5).value(), u32::MAX);
        assert_eq!(Quantity::default().value(), 1);
    }
}

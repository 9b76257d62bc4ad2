//! Money amounts in Pakistani rupees.
//!
//! The marketplace trades in a single currency, so `Money` is a thin wrapper
//! over `Decimal` that knows how to render itself the way the storefront
//! shows prices (`PKR 12,500`, `PKR 999.50`).

use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency prefix used in every rendered amount.
pub const CURRENCY: &str = "PKR";

/// An amount of money in PKR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal value.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from whole rupees.
    #[must_use]
    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply a unit price by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Format with thousands separators and no currency prefix (`12,500`).
    #[must_use]
    pub fn grouped(&self) -> String {
        let rounded = self.0.round_dp(2).normalize();
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let text = rounded.abs().to_string();
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3 + 4);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let sign = if negative { "-" } else { "" };
        if fraction.is_empty() {
            format!("{sign}{grouped}")
        } else {
            format!("{sign}{grouped}.{fraction}")
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{CURRENCY} {}", self.grouped())
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        self.times(rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_rupees(0).to_string(), "PKR 0");
        assert_eq!(Money::from_rupees(999).to_string(), "PKR 999");
        assert_eq!(Money::from_rupees(1000).to_string(), "PKR 1,000");
        assert_eq!(Money::from_rupees(1_234_567).to_string(), "PKR 1,234,567");
    }

    #[test]
    fn test_display_keeps_significant_fraction() {
        let m = Money::new(Decimal::from_str("1499.50").unwrap());
        assert_eq!(m.to_string(), "PKR 1,499.5");
        let m = Money::new(Decimal::from_str("2500.00").unwrap());
        assert_eq!(m.to_string(), "PKR 2,500");
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(Money::from_rupees(-1200).grouped(), "-1,200");
    }

    #[test]
    fn test_sum_and_times() {
        let total: Money = [Money::from_rupees(1500), Money::from_rupees(2500)]
            .iter()
            .sum();
        assert_eq!(total, Money::from_rupees(4000));
        assert_eq!(Money::from_rupees(600).times(5), Money::from_rupees(3000));
    }

    #[test]
    fn test_deserializes_json_numbers() {
        let m: Money = serde_json::from_str("1250.5").unwrap();
        assert_eq!(m, Money::new(Decimal::from_str("1250.5").unwrap()));
        let m: Money = serde_json::from_str("800").unwrap();
        assert_eq!(m, Money::from_rupees(800));
    }
}

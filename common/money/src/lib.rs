use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid monetary amount: {0}")]
    Invalid(String),
    #[error("monetary amount must not be negative: {0}")]
    Negative(String),
}

/// Normalize a monetary value to 2 decimal places (extra digits are truncated).
pub fn normalize_scale(value: &BigDecimal) -> BigDecimal {
    value.with_scale(2)
}

/// A price or total held at a fixed scale of two decimal places.
///
/// Serialized as a decimal string (`"23.00"`); deserialization also accepts
/// JSON numbers so catalog payloads can send `10` or `19.99`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(BigDecimal);

impl Money {
    pub fn new(raw: BigDecimal) -> Self { Self(normalize_scale(&raw)) }

    pub fn zero() -> Self { Self::new(BigDecimal::zero()) }

    pub fn from_cents(cents: i64) -> Self {
        Self::new(BigDecimal::from(cents) / BigDecimal::from(100))
    }

    pub fn amount(&self) -> &BigDecimal { &self.0 }

    /// `None` when the amount does not fit in an `i64` count of cents.
    pub fn as_cents(&self) -> Option<i64> {
        (self.0.clone() * BigDecimal::from(100)).to_i64()
    }

    pub fn is_negative(&self) -> bool { self.0 < BigDecimal::zero() }

    /// Parses and rejects negative amounts; used for catalog prices.
    pub fn parse_non_negative(raw: &str) -> Result<Self, MoneyError> {
        let value: Money = raw.parse()?;
        if value.is_negative() {
            return Err(MoneyError::Negative(raw.to_string()));
        }
        Ok(value)
    }
}

impl Default for Money {
    fn default() -> Self { Self::zero() }
}

impl From<BigDecimal> for Money {
    fn from(value: BigDecimal) -> Self { Self::new(value) }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigDecimal::from_str(s.trim())
            .map(Money::new)
            .map_err(|_| MoneyError::Invalid(s.to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money::new(self.0 + rhs.0) }
}

impl<'a> Add<&'a Money> for Money {
    type Output = Money;
    fn add(self, rhs: &'a Money) -> Money { Money::new(self.0 + &rhs.0) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self { iter.fold(Money::zero(), |acc, m| acc + m) }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self { iter.fold(Money::zero(), |acc, m| acc + m) }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Int(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = match RawAmount::deserialize(deserializer)? {
            RawAmount::Text(s) => s,
            RawAmount::Int(i) => i.to_string(),
            // shortest round-trip repr keeps 19.99 as "19.99"
            RawAmount::Float(f) => f.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

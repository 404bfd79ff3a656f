// Fixed-point money: an i64 count of minor units (paise), two decimal places.
//
// Prices enter the system as decimal strings and are converted with no floats.
// Anything that would need rounding (more than two fractional digits) is
// rejected rather than silently truncated.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const MINOR_PER_MAJOR: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyParseError {
    #[error("empty amount")]
    Empty,
    #[error("negative amount not allowed")]
    Negative,
    #[error("invalid decimal format")]
    Format,
    #[error("more than two fractional digits")]
    Precision,
    #[error("amount out of range")]
    Overflow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    pub const fn from_major(major: i64) -> Self {
        Money(major * MINOR_PER_MAJOR)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Line subtotal. Saturates instead of wrapping.
    pub fn times(self, quantity: i32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    pub fn parse(s: &str) -> Result<Money, MoneyParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MoneyParseError::Empty);
        }
        let s = s.strip_prefix('+').unwrap_or(s);
        if s.starts_with('-') {
            return Err(MoneyParseError::Negative);
        }

        let mut parts = s.split('.');
        let int_part = parts.next().unwrap_or("");
        let frac_part = parts.next();
        if parts.next().is_some() {
            return Err(MoneyParseError::Format);
        }
        if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(MoneyParseError::Format);
        }

        let major: i64 = int_part.parse().map_err(|_| MoneyParseError::Overflow)?;

        let minor = match frac_part {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(MoneyParseError::Format);
                }
                if frac.len() > 2 {
                    return Err(MoneyParseError::Precision);
                }
                // "5" means 50 paise, "05" means 5.
                let padded = format!("{frac:0<2}");
                padded.parse::<i64>().map_err(|_| MoneyParseError::Format)?
            }
        };

        major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|m| m.checked_add(minor))
            .map(Money)
            .ok_or(MoneyParseError::Overflow)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = abs / MINOR_PER_MAJOR as u64;
        let minor = abs % MINOR_PER_MAJOR as u64;
        write!(f, "{sign}{major}.{minor:02}")
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Money::parse(&raw).map_err(serde::de::Error::custom)
    }
}

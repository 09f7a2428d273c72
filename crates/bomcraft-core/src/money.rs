//! # Credits
//!
//! Exact base-10 currency values for crafting costs.
//!
//! [`Credits`] wraps a [`rust_decimal::Decimal`], so sums and integer
//! multiples never pick up binary rounding artifacts. Values are passed and
//! returned by value; nothing in the resolver mutates a shared accumulator.
//!
//! Serialization always goes through the canonical decimal string, which
//! keeps the value exact in JSON and works with non-self-describing formats
//! such as postcard.

use crate::BomError;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};
use std::str::FromStr;

/// An exact amount of credits.
///
/// # Examples
///
/// ```
/// use bomcraft_core::Credits;
///
/// let widget = Credits::from_units(3);
/// let total = Credits::from_units(10) + widget.times(2);
/// assert_eq!(total.to_string(), "16");
///
/// let cheap: Credits = "0.10".parse().expect("decimal");
/// assert_eq!((cheap + "0.20".parse::<Credits>().expect("decimal")).to_string(), "0.3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Credits(Decimal);

impl Credits {
    /// Exactly zero credits.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal value.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Whole credits.
    #[must_use]
    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    /// Construct from a possibly-absent value; absent is exactly zero.
    #[must_use]
    pub fn from_optional(amount: Option<Decimal>) -> Self {
        amount.map_or(Self::ZERO, Self)
    }

    /// Parse spreadsheet-style input the way the source catalog was seeded.
    ///
    /// Only the leading numeric prefix is read (`"12.5 cr"` is 12.5).
    /// Empty, unparsable, zero and negative inputs all yield `None`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let mut end = 0;
        let mut seen_digit = false;
        let mut seen_dot = false;

        for (idx, ch) in trimmed.char_indices() {
            match ch {
                '+' | '-' if idx == 0 => {}
                '0'..='9' => seen_digit = true,
                '.' if !seen_dot => seen_dot = true,
                _ => break,
            }
            end = idx + ch.len_utf8();
        }

        if !seen_digit {
            return None;
        }

        let prefix = trimmed[..end].trim_end_matches('.');
        let value = Decimal::from_str(prefix).ok()?;
        (value > Decimal::ZERO).then_some(Self(value))
    }

    /// Multiply by a non-negative integer quantity.
    #[must_use]
    pub fn times(self, quantity: u64) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl Add for Credits {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Credits {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul<u64> for Credits {
    type Output = Self;

    fn mul(self, rhs: u64) -> Self {
        self.times(rhs)
    }
}

impl Sum for Credits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Canonical rendering: trailing zeros stripped, `-0` shown as `0`.
impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.normalize(), f)
    }
}

impl FromStr for Credits {
    type Err = BomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self)
            .map_err(|e| BomError::DeserializationError(format!("invalid credits '{}': {}", s, e)))
    }
}

impl From<Decimal> for Credits {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Serialize for Credits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Credits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

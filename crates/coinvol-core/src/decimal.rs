//! Precision-safe decimal types.
//!
//! Uses `rust_decimal` for exact decimal arithmetic so that prices and
//! derived statistics never pick up binary floating-point artifacts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Observed price with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Price {
    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    /// Parse a price from the textual form of a JSON number.
    ///
    /// Accepts plain (`"0.000012"`) and scientific (`"1.2e-5"`) notation so
    /// that upstream values never round-trip through `f64`.
    pub fn parse_number(text: &str) -> Result<Self, CoreError> {
        let value = if text.contains(['e', 'E']) {
            Decimal::from_scientific(text)?
        } else {
            Decimal::from_str(text)?
        };
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CoreError::InvalidPrice(format!("negative price {text}")));
        }
        Ok(Self(value.normalize()))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_number(s)
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Rolling statistic (sample standard deviation of price).
///
/// Always stored normalized so that two computations over the same window
/// compare and serialize identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statistic(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Statistic {
    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value.normalize())
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Statistic {
    fn from(d: Decimal) -> Self {
        Self::new(d)
    }
}

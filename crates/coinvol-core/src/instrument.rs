//! Instrument identification.
//!
//! An instrument is anything with a continuously observed price. For the
//! CoinGecko source it is a coin quoted in a currency, rendered as
//! `{coin_id}/{vs_currency}` (e.g. `bitcoin/usd`).

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Unique instrument identifier (primary key of statistic records).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(String);

impl InstrumentId {
    /// Create an identifier, rejecting empty or whitespace-only names.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::InvalidInstrument("empty instrument id".to_string()));
        }
        Ok(Self(id))
    }

    /// Build the pair identifier for a coin quoted in `vs_currency`.
    pub fn pair(coin_id: &str, vs_currency: &str) -> Result<Self, CoreError> {
        if coin_id.trim().is_empty() {
            return Err(CoreError::InvalidInstrument("empty coin id".to_string()));
        }
        Self::new(format!("{coin_id}/{vs_currency}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstrumentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Borrow<str> for InstrumentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

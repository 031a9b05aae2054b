//! Core domain types for the coinvol service.
//!
//! This crate provides the types shared by every other crate:
//! - `InstrumentId`: identifier of an observed instrument (e.g. `bitcoin/usd`)
//! - `Price`, `Statistic`: precision-safe numeric types
//! - `PriceObservation`, `BatchMarker`, `StatisticRecord`: stored records
//! - `Quote`: one current price reported by the market-data source

pub mod decimal;
pub mod error;
pub mod instrument;
pub mod types;

pub use decimal::{Price, Statistic};
pub use error::{CoreError, Result};
pub use instrument::InstrumentId;
pub use types::{BatchMarker, PriceObservation, Quote, StatisticRecord, UnixSeconds};

/// Trailing window length in seconds (24 hours).
pub const WINDOW_SECS: i64 = 86_400;

/// Minimum number of observations in a window before a statistic exists.
pub const MIN_WINDOW_OBSERVATIONS: usize = 2;

/// Identifier of the singleton batch marker record.
pub const LATEST_UPDATE_ID: &str = "latest_update";

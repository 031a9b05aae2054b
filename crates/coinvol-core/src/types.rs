//! Stored records and upstream quotes.

use serde::{Deserialize, Serialize};

use crate::{InstrumentId, Price, Statistic, LATEST_UPDATE_ID};

/// Seconds since the Unix epoch.
pub type UnixSeconds = i64;

/// One timestamped price reading for an instrument.
///
/// Immutable once written; keyed by `(instrument, time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    #[serde(rename = "pair")]
    pub instrument: InstrumentId,
    pub time: UnixSeconds,
    pub value: Price,
}

impl PriceObservation {
    pub fn new(instrument: InstrumentId, time: UnixSeconds, value: Price) -> Self {
        Self {
            instrument,
            time,
            value,
        }
    }
}

/// Pointer to the most recent ingestion batch.
///
/// `time` is the capture timestamp shared by every observation of the
/// batch. `version` increases by one each time the marker advances, so
/// readers can tell two publications apart independently of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMarker {
    pub time: UnixSeconds,
    pub version: u64,
}

impl BatchMarker {
    pub fn new(time: UnixSeconds, version: u64) -> Self {
        Self { time, version }
    }

    /// Singleton record id.
    pub fn id(&self) -> &'static str {
        LATEST_UPDATE_ID
    }

    /// Whether a statistic computed for `batch` reflects this marker.
    #[inline]
    pub fn is_fresh(&self, batch: UnixSeconds) -> bool {
        self.time == batch
    }
}

/// Latest statistic for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticRecord {
    #[serde(rename = "pair")]
    pub instrument: InstrumentId,
    #[serde(rename = "stddev")]
    pub statistic: Statistic,
    /// Time of the observation that triggered the computation.
    #[serde(rename = "updateBatch")]
    pub batch: UnixSeconds,
}

impl StatisticRecord {
    pub fn new(instrument: InstrumentId, statistic: Statistic, batch: UnixSeconds) -> Self {
        Self {
            instrument,
            statistic,
            batch,
        }
    }
}

/// Current price of one instrument as reported by the market-data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub instrument: InstrumentId,
    pub price: Price,
}

impl Quote {
    pub fn new(instrument: InstrumentId, price: Price) -> Self {
        Self { instrument, price }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_marker_freshness() {
        let marker = BatchMarker::new(1000, 3);
        assert!(marker.is_fresh(1000));
        assert!(!marker.is_fresh(940));
        assert_eq!(marker.id(), "latest_update");
    }

    #[test]
    fn test_statistic_record_wire_names() {
        let record = StatisticRecord::new(
            InstrumentId::new("bitcoin/usd").unwrap(),
            Statistic::new(dec!(2.5)),
            1000,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["pair"], "bitcoin/usd");
        assert_eq!(json["stddev"], "2.5");
        assert_eq!(json["updateBatch"], 1000);
    }

    #[test]
    fn test_observation_roundtrip_keeps_exact_price() {
        let obs = PriceObservation::new(
            InstrumentId::new("pepe/usd").unwrap(),
            1_700_000_000,
            Price::new(dec!(0.00000123456789)),
        );
        let line = serde_json::to_string(&obs).unwrap();
        let back: PriceObservation = serde_json::from_str(&line).unwrap();
        assert_eq!(back, obs);
    }
}

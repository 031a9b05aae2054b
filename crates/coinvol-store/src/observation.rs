//! Append-only observation store.
//!
//! Observations are keyed by `(instrument, time)` and range-queried by
//! instrument and time. Every successful append is published on the
//! change feed, which is how the window aggregator is triggered.

use std::collections::BTreeMap;
use std::sync::Arc;

use coinvol_core::{InstrumentId, Price, PriceObservation, UnixSeconds};
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{StoreError, StoreResult};

/// Receiving end of the observation change feed.
pub type ChangeFeed = mpsc::UnboundedReceiver<PriceObservation>;

/// Observation store boundary.
pub trait ObservationStore: Send + Sync {
    /// Append one observation. A later write for the same `(instrument, time)`
    /// replaces the earlier one; no deduplication is attempted.
    fn append(&self, observation: PriceObservation) -> StoreResult<()>;

    /// All observations of `instrument` with `from <= time <= to`, ordered
    /// by time ascending.
    fn range(
        &self,
        instrument: &InstrumentId,
        from: UnixSeconds,
        to: UnixSeconds,
    ) -> StoreResult<Vec<PriceObservation>>;
}

impl<T: ObservationStore + ?Sized> ObservationStore for Arc<T> {
    fn append(&self, observation: PriceObservation) -> StoreResult<()> {
        (**self).append(observation)
    }

    fn range(
        &self,
        instrument: &InstrumentId,
        from: UnixSeconds,
        to: UnixSeconds,
    ) -> StoreResult<Vec<PriceObservation>> {
        (**self).range(instrument, from, to)
    }
}

/// In-memory observation store.
///
/// One time-ordered series per instrument. Series for different instruments
/// live in different map shards, so appends for different instruments do
/// not contend.
pub struct InMemoryObservationStore {
    series: DashMap<InstrumentId, BTreeMap<UnixSeconds, Price>>,
    feed: RwLock<Option<mpsc::UnboundedSender<PriceObservation>>>,
}

impl InMemoryObservationStore {
    /// Create a store without a change feed.
    pub fn new() -> Self {
        Self {
            series: DashMap::new(),
            feed: RwLock::new(None),
        }
    }

    /// Create a store that publishes every append on the returned feed.
    pub fn with_change_feed() -> (Self, ChangeFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Self {
            series: DashMap::new(),
            feed: RwLock::new(Some(tx)),
        };
        (store, rx)
    }

    /// Insert historical observations without publishing change events.
    ///
    /// Used when restoring the store from a journal.
    pub fn load(&self, observations: impl IntoIterator<Item = PriceObservation>) -> usize {
        let mut loaded = 0;
        for obs in observations {
            self.insert(obs);
            loaded += 1;
        }
        debug!(loaded, "Loaded historical observations");
        loaded
    }

    /// Close the change feed. The receiver drains what is already queued
    /// and then observes end-of-stream.
    pub fn close_feed(&self) {
        self.feed.write().take();
    }

    /// Number of instruments with at least one observation.
    pub fn instrument_count(&self) -> usize {
        self.series.len()
    }

    /// Total number of stored observations.
    pub fn len(&self) -> usize {
        self.series.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, obs: PriceObservation) {
        self.series
            .entry(obs.instrument)
            .or_default()
            .insert(obs.time, obs.value);
    }
}

impl Default for InMemoryObservationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservationStore for InMemoryObservationStore {
    fn append(&self, observation: PriceObservation) -> StoreResult<()> {
        trace!(
            instrument = %observation.instrument,
            time = observation.time,
            value = %observation.value,
            "Appending observation"
        );
        self.insert(observation.clone());

        if let Some(feed) = self.feed.read().as_ref() {
            if feed.send(observation).is_err() {
                debug!("Change feed receiver dropped, event not delivered");
            }
        }
        Ok(())
    }

    fn range(
        &self,
        instrument: &InstrumentId,
        from: UnixSeconds,
        to: UnixSeconds,
    ) -> StoreResult<Vec<PriceObservation>> {
        if from > to {
            return Err(StoreError::InvalidRange { from, to });
        }
        let Some(series) = self.series.get(instrument) else {
            return Ok(Vec::new());
        };
        Ok(series
            .range(from..=to)
            .map(|(&time, &value)| PriceObservation::new(instrument.clone(), time, value))
            .collect())
    }
}

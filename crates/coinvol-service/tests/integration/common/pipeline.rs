//! In-process pipeline with manual change-feed delivery.

use std::collections::HashSet;
use std::sync::Arc;

use coinvol_aggregator::{AggregatorConfig, DeliveryReport, WindowAggregator, WritePolicy};
use coinvol_api::QueryService;
use coinvol_core::{InstrumentId, Price, PriceObservation, Quote, UnixSeconds};
use coinvol_ingest::{IngestionReport, IngestionWriter};
use coinvol_store::{
    BatchMarkerCell, BatchProgress, ChangeFeed, InMemoryObservationStore, InMemoryStatisticStore,
    ObservationStore, StoreError, StoreResult,
};
use rust_decimal::Decimal;

pub fn id(pair: &str) -> InstrumentId {
    InstrumentId::new(pair).unwrap()
}

pub fn quote(pair: &str, price: Decimal) -> Quote {
    Quote::new(id(pair), Price::new(price))
}

/// Observation store that refuses appends for selected instruments.
pub struct RefusingStore {
    inner: Arc<InMemoryObservationStore>,
    refused: HashSet<InstrumentId>,
}

impl ObservationStore for RefusingStore {
    fn append(&self, observation: PriceObservation) -> StoreResult<()> {
        if self.refused.contains(&observation.instrument) {
            return Err(StoreError::Unavailable("refused".to_string()));
        }
        self.inner.append(observation)
    }

    fn range(
        &self,
        instrument: &InstrumentId,
        from: UnixSeconds,
        to: UnixSeconds,
    ) -> StoreResult<Vec<PriceObservation>> {
        self.inner.range(instrument, from, to)
    }
}

pub struct Pipeline {
    pub observations: Arc<InMemoryObservationStore>,
    pub marker: Arc<BatchMarkerCell>,
    pub progress: Arc<BatchProgress>,
    pub writer: IngestionWriter,
    pub aggregator: WindowAggregator,
    pub query: QueryService,
    feed: ChangeFeed,
}

impl Pipeline {
    pub fn new(write_policy: WritePolicy) -> Self {
        Self::build(write_policy, &[])
    }

    /// Pipeline whose ingestion writer fails to append `refused`.
    pub fn refusing(refused: &[&str]) -> Self {
        Self::build(WritePolicy::Conditional, refused)
    }

    fn build(write_policy: WritePolicy, refused: &[&str]) -> Self {
        let (observations, feed) = InMemoryObservationStore::with_change_feed();
        let observations = Arc::new(observations);
        let statistics = Arc::new(InMemoryStatisticStore::new());
        let marker = Arc::new(BatchMarkerCell::new());
        let progress = Arc::new(BatchProgress::new());

        let write_store: Arc<dyn ObservationStore> = if refused.is_empty() {
            observations.clone()
        } else {
            Arc::new(RefusingStore {
                inner: observations.clone(),
                refused: refused.iter().map(|pair| id(pair)).collect(),
            })
        };

        let config = AggregatorConfig {
            write_policy,
            ..Default::default()
        };

        Self {
            writer: IngestionWriter::new(marker.clone(), write_store, progress.clone()),
            aggregator: WindowAggregator::new(
                observations.clone(),
                statistics.clone(),
                progress.clone(),
                config,
            ),
            query: QueryService::new(statistics, marker.clone(), progress.clone()),
            observations,
            marker,
            progress,
            feed,
        }
    }

    pub fn ingest(&self, quotes: &[Quote], capture_time: UnixSeconds) -> IngestionReport {
        self.writer.write_batch(quotes, capture_time).unwrap()
    }

    /// Change events queued since the last call, in append order.
    pub fn take_events(&mut self) -> Vec<PriceObservation> {
        let mut events = Vec::new();
        while let Ok(event) = self.feed.try_recv() {
            events.push(event);
        }
        events
    }

    /// Deliver every queued change event as one batch.
    pub fn drain(&mut self) -> DeliveryReport {
        let events = self.take_events();
        self.aggregator.process_batch(events)
    }
}

//! Change-feed consumer.
//!
//! Pulls change events in delivery batches and hands each event to its own
//! blocking task. A panic or error in one event's task is logged and
//! counted; the other events of the batch still complete.

use coinvol_core::PriceObservation;
use coinvol_store::ChangeFeed;
use coinvol_telemetry::Metrics;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::aggregator::{DeliveryReport, WindowAggregator};

pub struct AggregationWorker {
    aggregator: WindowAggregator,
    feed: ChangeFeed,
    batch_size: usize,
}

impl AggregationWorker {
    pub fn new(aggregator: WindowAggregator, feed: ChangeFeed) -> Self {
        let batch_size = aggregator.config().delivery_batch_size.max(1);
        Self {
            aggregator,
            feed,
            batch_size,
        }
    }

    /// Consume the feed until it is closed and drained.
    ///
    /// Returns the accumulated outcome counts.
    pub async fn run(mut self) -> DeliveryReport {
        info!(batch_size = self.batch_size, "Aggregation worker started");

        let mut total = DeliveryReport::default();
        let mut buffer = Vec::with_capacity(self.batch_size);
        let mut deliveries = 0u64;

        loop {
            let received = self.feed.recv_many(&mut buffer, self.batch_size).await;
            if received == 0 {
                break;
            }

            let events: Vec<PriceObservation> = buffer.drain(..).collect();
            let report = self.deliver(events).await;
            deliveries += 1;
            debug!(
                received,
                written = report.written,
                skipped = report.skipped,
                rejected_stale = report.rejected_stale,
                failed = report.failed,
                "Delivery batch processed"
            );
            total.merge(&report);
        }

        info!(
            deliveries,
            written = total.written,
            skipped = total.skipped,
            rejected_stale = total.rejected_stale,
            failed = total.failed,
            "Change feed closed, aggregation worker stopped"
        );
        total
    }

    async fn deliver(&self, events: Vec<PriceObservation>) -> DeliveryReport {
        let mut tasks = JoinSet::new();
        for event in events {
            let aggregator = self.aggregator.clone();
            tasks.spawn_blocking(move || aggregator.on_observation(&event));
        }

        let mut report = DeliveryReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => report.record(&result),
                Err(e) => {
                    error!(error = %e, "Aggregation task aborted");
                    Metrics::aggregation("failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

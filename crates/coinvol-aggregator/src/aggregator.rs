//! Per-event window aggregation.

use std::sync::Arc;

use coinvol_core::{PriceObservation, Statistic, StatisticRecord, UnixSeconds};
use coinvol_store::{
    BatchProgress, ObservationStore, ProgressOutcome, StatisticStore, UpsertOutcome,
};
use coinvol_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::{AggregatorConfig, WritePolicy};
use crate::error::AggregatorResult;
use crate::window::{sample_std_dev, WindowBounds};

/// What happened to one change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationOutcome {
    /// A statistic was written for the event's batch.
    Written {
        statistic: Statistic,
        window_size: usize,
    },
    /// Too few observations in the window; nothing written.
    SkippedInsufficient { window_size: usize },
    /// A statistic from a newer batch is already stored.
    RejectedStale { stored_batch: UnixSeconds },
}

impl AggregationOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Written { .. } => "written",
            Self::SkippedInsufficient { .. } => "skipped",
            Self::RejectedStale { .. } => "rejected_stale",
        }
    }

    fn progress(&self) -> ProgressOutcome {
        match self {
            Self::Written { .. } => ProgressOutcome::Written,
            Self::SkippedInsufficient { .. } => ProgressOutcome::Skipped,
            Self::RejectedStale { .. } => ProgressOutcome::Superseded,
        }
    }
}

/// Outcome counts for a set of change events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub written: usize,
    pub skipped: usize,
    pub rejected_stale: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn record(&mut self, result: &AggregatorResult<AggregationOutcome>) {
        match result {
            Ok(AggregationOutcome::Written { .. }) => self.written += 1,
            Ok(AggregationOutcome::SkippedInsufficient { .. }) => self.skipped += 1,
            Ok(AggregationOutcome::RejectedStale { .. }) => self.rejected_stale += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &DeliveryReport) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.rejected_stale += other.rejected_stale;
        self.failed += other.failed;
    }

    pub fn total(&self) -> usize {
        self.written + self.skipped + self.rejected_stale + self.failed
    }
}

/// Recomputes the trailing-window statistic of an instrument.
///
/// Stateless apart from the stores it holds: the window is re-read from the
/// observation store on every event, so replaying an event yields the same
/// value.
#[derive(Clone)]
pub struct WindowAggregator {
    observations: Arc<dyn ObservationStore>,
    statistics: Arc<dyn StatisticStore>,
    progress: Arc<BatchProgress>,
    config: AggregatorConfig,
}

impl WindowAggregator {
    pub fn new(
        observations: Arc<dyn ObservationStore>,
        statistics: Arc<dyn StatisticStore>,
        progress: Arc<BatchProgress>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            observations,
            statistics,
            progress,
            config,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Handle one appended observation.
    ///
    /// The outcome (or failure) is recorded against the observation's batch
    /// and counted in metrics before being returned.
    pub fn on_observation(&self, observation: &PriceObservation) -> AggregatorResult<AggregationOutcome> {
        let result = self.aggregate(observation);

        let progress = match &result {
            Ok(outcome) => {
                Metrics::aggregation(outcome.label());
                outcome.progress()
            }
            Err(e) => {
                warn!(
                    instrument = %observation.instrument,
                    time = observation.time,
                    error = %e,
                    "Aggregation failed"
                );
                Metrics::aggregation("failed");
                ProgressOutcome::Failed
            }
        };
        self.progress
            .record(observation.time, &observation.instrument, progress);

        result
    }

    /// Handle a delivery batch in order. A failing event does not stop the
    /// rest of the batch.
    pub fn process_batch(&self, events: Vec<PriceObservation>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for event in &events {
            report.record(&self.on_observation(event));
        }
        report
    }

    fn aggregate(&self, observation: &PriceObservation) -> AggregatorResult<AggregationOutcome> {
        let bounds = WindowBounds::trailing(observation.time, self.config.window_secs);
        let window = self
            .observations
            .range(&observation.instrument, bounds.from, bounds.to)?;
        let window_size = window.len();
        Metrics::window_size(window_size);

        if window_size < self.config.effective_min_observations() {
            debug!(
                instrument = %observation.instrument,
                window_size,
                "Not enough observations in window"
            );
            return Ok(AggregationOutcome::SkippedInsufficient { window_size });
        }

        let values: Vec<Decimal> = window.iter().map(|o| o.value.inner()).collect();
        let Some(statistic) = sample_std_dev(&values)? else {
            return Ok(AggregationOutcome::SkippedInsufficient { window_size });
        };

        let record = StatisticRecord::new(observation.instrument.clone(), statistic, observation.time);
        let outcome = match self.config.write_policy {
            WritePolicy::Conditional => match self.statistics.upsert_if_newer(record)? {
                UpsertOutcome::Written => AggregationOutcome::Written {
                    statistic,
                    window_size,
                },
                UpsertOutcome::Rejected { stored_batch } => {
                    AggregationOutcome::RejectedStale { stored_batch }
                }
            },
            WritePolicy::LastWriteWins => {
                self.statistics.upsert(record)?;
                AggregationOutcome::Written {
                    statistic,
                    window_size,
                }
            }
        };

        debug!(
            instrument = %observation.instrument,
            batch = observation.time,
            window_size,
            outcome = outcome.label(),
            "Aggregated window"
        );
        Ok(outcome)
    }
}

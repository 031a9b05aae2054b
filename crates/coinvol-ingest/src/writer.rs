//! Batch-stamped ingestion writer.

use std::sync::Arc;

use coinvol_core::{BatchMarker, InstrumentId, PriceObservation, Quote, UnixSeconds};
use coinvol_store::{BatchMarkerCell, BatchProgress, ObservationStore};
use coinvol_telemetry::Metrics;
use tracing::{info, warn};

use crate::error::IngestResult;

/// Result of writing one batch.
#[derive(Debug, Clone)]
pub struct IngestionReport {
    /// Marker published for the batch.
    pub marker: BatchMarker,
    pub appended: usize,
    /// Instruments whose append failed after the marker was published.
    /// They will not converge for this batch.
    pub failed: Vec<(InstrumentId, String)>,
}

impl IngestionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes one ingestion batch.
///
/// The batch marker is published first, then one observation per quote is
/// appended with the shared capture time. Neither the marker nor successful
/// appends are rolled back when a later append fails.
pub struct IngestionWriter {
    marker: Arc<BatchMarkerCell>,
    observations: Arc<dyn ObservationStore>,
    progress: Arc<BatchProgress>,
}

impl IngestionWriter {
    pub fn new(
        marker: Arc<BatchMarkerCell>,
        observations: Arc<dyn ObservationStore>,
        progress: Arc<BatchProgress>,
    ) -> Self {
        Self {
            marker,
            observations,
            progress,
        }
    }

    /// Write `quotes` as the batch captured at `capture_time`.
    ///
    /// Fails without appending anything if `capture_time` is older than the
    /// current marker. Per-instrument append failures are collected in the
    /// report rather than returned as an error.
    pub fn write_batch(&self, quotes: &[Quote], capture_time: UnixSeconds) -> IngestResult<IngestionReport> {
        let marker = self.marker.publish(capture_time)?;
        Metrics::batch_marker(marker.time);

        // Registered before the first append so no aggregation outcome for
        // this batch can arrive untracked.
        self.progress.register(capture_time, quotes.len());

        let mut report = IngestionReport {
            marker,
            appended: 0,
            failed: Vec::new(),
        };

        for quote in quotes {
            let observation =
                PriceObservation::new(quote.instrument.clone(), capture_time, quote.price);
            match self.observations.append(observation) {
                Ok(()) => report.appended += 1,
                Err(e) => {
                    warn!(
                        instrument = %quote.instrument,
                        batch = capture_time,
                        error = %e,
                        "Observation append failed"
                    );
                    report.failed.push((quote.instrument.clone(), e.to_string()));
                }
            }
        }

        Metrics::observations_appended(report.appended as u64);
        if !report.is_complete() {
            self.progress
                .record_failed_appends(capture_time, report.failed.len());
            Metrics::append_failures(report.failed.len() as u64);
            warn!(
                batch = capture_time,
                appended = report.appended,
                failed = report.failed.len(),
                "Partial ingestion, batch will not converge"
            );
        } else {
            info!(
                batch = capture_time,
                version = marker.version,
                appended = report.appended,
                "Batch ingested"
            );
        }

        Ok(report)
    }
}

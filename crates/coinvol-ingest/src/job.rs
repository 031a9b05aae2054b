//! Scheduled ingestion job.

use chrono::Utc;
use coinvol_core::{Quote, UnixSeconds};
use coinvol_telemetry::Metrics;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::client::MarketDataClient;
use crate::config::IngestConfig;
use crate::error::{IngestError, IngestResult};
use crate::writer::{IngestionReport, IngestionWriter};

pub struct IngestionJob {
    client: MarketDataClient,
    writer: IngestionWriter,
    config: IngestConfig,
}

impl IngestionJob {
    pub fn new(client: MarketDataClient, writer: IngestionWriter, config: IngestConfig) -> Self {
        Self {
            client,
            writer,
            config,
        }
    }

    /// Run one cycle stamped with the time the quotes arrived.
    pub async fn run_once(&self) -> IngestResult<IngestionReport> {
        let quotes = self.fetch().await?;
        self.write(&quotes, Utc::now().timestamp())
    }

    /// Run one cycle stamped with `capture_time`.
    ///
    /// A fetch failure aborts the cycle before anything is written.
    pub async fn run_once_at(&self, capture_time: UnixSeconds) -> IngestResult<IngestionReport> {
        let quotes = self.fetch().await?;
        self.write(&quotes, capture_time)
    }

    async fn fetch(&self) -> IngestResult<Vec<Quote>> {
        let result = self.client.fetch_quotes().await;
        if result.is_err() {
            Metrics::ingest_cycle("upstream_error");
        }
        result
    }

    fn write(&self, quotes: &[Quote], capture_time: UnixSeconds) -> IngestResult<IngestionReport> {
        match self.writer.write_batch(quotes, capture_time) {
            Ok(report) => {
                Metrics::ingest_cycle(if report.is_complete() { "ok" } else { "partial" });
                Ok(report)
            }
            Err(e) => {
                Metrics::ingest_cycle("marker_error");
                Err(e)
            }
        }
    }

    /// Run cycles every `interval_secs` until `shutdown` is cancelled.
    ///
    /// The first cycle starts immediately. A failed cycle is logged and the
    /// schedule continues.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.config.interval_secs,
            url = %self.config.api_url,
            "Ingestion job started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Ingestion job stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(report) if report.is_complete() => {}
                        Ok(report) => {
                            warn!(
                                batch = report.marker.time,
                                failed = report.failed.len(),
                                "Ingestion cycle partially failed"
                            );
                        }
                        Err(IngestError::Store(e)) => {
                            error!(error = %e, "Ingestion cycle rejected by store");
                        }
                        Err(e) => {
                            warn!(error = %e, "Ingestion cycle aborted");
                        }
                    }
                }
            }
        }
    }
}

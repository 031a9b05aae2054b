//! Application wiring and lifecycle.

use std::sync::Arc;

use chrono::Utc;
use coinvol_aggregator::{AggregationWorker, DeliveryReport, WindowAggregator};
use coinvol_api::{AppState, QueryService};
use coinvol_ingest::{IngestionJob, IngestionWriter, MarketDataClient};
use coinvol_persistence::{replay_window, JournaledObservationStore, ObservationJournal};
use coinvol_store::{
    BatchMarkerCell, BatchProgress, ChangeFeed, InMemoryObservationStore, InMemoryStatisticStore,
    ObservationStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

type Journaled = JournaledObservationStore<Arc<InMemoryObservationStore>>;

/// Main application.
pub struct Application {
    config: AppConfig,
    observations: Arc<InMemoryObservationStore>,
    journaled: Option<Arc<Journaled>>,
    statistics: Arc<InMemoryStatisticStore>,
    marker: Arc<BatchMarkerCell>,
    progress: Arc<BatchProgress>,
    feed: ChangeFeed,
}

impl Application {
    /// Build the stores. With persistence enabled, the trailing window is
    /// replayed from the journal before any change event can be emitted.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let (observations, feed) = InMemoryObservationStore::with_change_feed();
        let observations = Arc::new(observations);

        let journaled = if config.persistence.enabled {
            let dir = &config.persistence.data_dir;
            let history = replay_window(dir, Utc::now().timestamp(), config.aggregator.window_secs)?;
            let restored = observations.load(history);
            info!(
                dir = %dir.display(),
                restored,
                instruments = observations.instrument_count(),
                "Restored observation window from journal"
            );

            let journal = ObservationJournal::new(dir, config.persistence.buffer_size)?;
            Some(Arc::new(JournaledObservationStore::new(
                observations.clone(),
                journal,
            )))
        } else {
            None
        };

        Ok(Self {
            config,
            observations,
            journaled,
            statistics: Arc::new(InMemoryStatisticStore::new()),
            marker: Arc::new(BatchMarkerCell::new()),
            progress: Arc::new(BatchProgress::new()),
            feed,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Store the ingestion path appends to (journaled when enabled).
    fn write_store(&self) -> Arc<dyn ObservationStore> {
        match &self.journaled {
            Some(journaled) => journaled.clone() as Arc<dyn ObservationStore>,
            None => self.observations.clone(),
        }
    }

    pub fn ingestion_writer(&self) -> IngestionWriter {
        IngestionWriter::new(self.marker.clone(), self.write_store(), self.progress.clone())
    }

    pub fn query_service(&self) -> QueryService {
        QueryService::new(
            self.statistics.clone(),
            self.marker.clone(),
            self.progress.clone(),
        )
    }

    fn window_aggregator(&self) -> WindowAggregator {
        WindowAggregator::new(
            self.observations.clone(),
            self.statistics.clone(),
            self.progress.clone(),
            self.config.aggregator.clone(),
        )
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received");
                    trigger.cancel();
                }
                Err(e) => error!(?e, "Failed to listen for shutdown signal"),
            }
        });

        self.run_until(shutdown).await.map(|_| ())
    }

    /// Run every component until `shutdown` is cancelled, then drain.
    ///
    /// Shutdown order: stop ingestion and the HTTP server, close the change
    /// feed so the worker finishes what is queued, flush the journal.
    pub async fn run_until(self, shutdown: CancellationToken) -> AppResult<DeliveryReport> {
        let aggregator = self.window_aggregator();
        let writer = self.ingestion_writer();
        let query = self.query_service();
        let Self {
            config,
            observations,
            journaled,
            feed,
            ..
        } = self;

        let worker = tokio::spawn(AggregationWorker::new(aggregator, feed).run());

        let server = if config.api.enabled {
            let listener = coinvol_api::bind(&config.api).await?;
            let state = AppState::new(query, config.api.clone());
            Some(tokio::spawn(coinvol_api::run_server(
                listener,
                state,
                shutdown.clone(),
            )))
        } else {
            info!("HTTP API disabled");
            None
        };

        let ingestion = if config.ingest.enabled {
            let client = MarketDataClient::new(config.ingest.clone())?;
            let job = IngestionJob::new(client, writer, config.ingest.clone());
            Some(tokio::spawn(job.run(shutdown.clone())))
        } else {
            info!("Ingestion disabled");
            None
        };

        info!(
            window_secs = config.aggregator.window_secs,
            write_policy = ?config.aggregator.write_policy,
            "Application running"
        );
        shutdown.cancelled().await;
        info!("Shutting down");

        if let Some(handle) = ingestion {
            if let Err(e) = handle.await {
                warn!(?e, "Ingestion task ended abnormally");
            }
        }
        if let Some(handle) = server {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "HTTP server error"),
                Err(e) => warn!(?e, "HTTP server task ended abnormally"),
            }
        }

        observations.close_feed();
        let report = match worker.await {
            Ok(report) => report,
            Err(e) => {
                error!(?e, "Aggregation worker ended abnormally");
                DeliveryReport::default()
            }
        };

        if let Some(journaled) = journaled {
            journaled.flush()?;
        }

        info!(
            written = report.written,
            skipped = report.skipped,
            rejected_stale = report.rejected_stale,
            failed = report.failed,
            "Shutdown complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use coinvol_core::{InstrumentId, Price, Quote};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.ingest.enabled = false;
        config.api.enabled = false;
        config
    }

    fn quote(pair: &str, price: rust_decimal::Decimal) -> Quote {
        Quote::new(InstrumentId::new(pair).unwrap(), Price::new(price))
    }

    #[tokio::test]
    async fn test_run_until_drains_feed_on_shutdown() {
        let app = Application::new(offline_config()).unwrap();
        let writer = app.ingestion_writer();
        let query = app.query_service();

        writer.write_batch(&[quote("a/usd", dec!(1))], 940).unwrap();
        writer.write_batch(&[quote("a/usd", dec!(3))], 1000).unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let report = tokio::time::timeout(Duration::from_secs(5), app.run_until(shutdown))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.total(), 2);
        assert_eq!(report.written, 1);
        let record = query
            .get_one(&InstrumentId::new("a/usd").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(record.batch, 1000);
    }

    #[tokio::test]
    async fn test_journal_restores_window_without_events() {
        let dir = TempDir::new().unwrap();
        let mut config = offline_config();
        config.persistence.enabled = true;
        config.persistence.data_dir = dir.path().to_path_buf();

        let now = Utc::now().timestamp();
        {
            let app = Application::new(config.clone()).unwrap();
            app.ingestion_writer()
                .write_batch(&[quote("a/usd", dec!(10))], now - 120)
                .unwrap();
            let shutdown = CancellationToken::new();
            shutdown.cancel();
            app.run_until(shutdown).await.unwrap();
        }

        let app = Application::new(config).unwrap();
        let a = InstrumentId::new("a/usd").unwrap();
        assert_eq!(app.observations.range(&a, now - 86_400, now).unwrap().len(), 1);

        // the restored point joins the window of the next observation
        app.ingestion_writer()
            .write_batch(&[quote("a/usd", dec!(12))], now - 60)
            .unwrap();
        let query = app.query_service();
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let report = app.run_until(shutdown).await.unwrap();

        assert_eq!(report.total(), 1, "replayed observations emit no events");
        assert_eq!(report.written, 1);
        let record = query.get_one(&a).unwrap().unwrap();
        let diff = (record.statistic.inner() - dec!(1.4142135623730950488)).abs();
        assert!(diff < dec!(0.000000000000000001), "got {}", record.statistic.inner());
    }
}

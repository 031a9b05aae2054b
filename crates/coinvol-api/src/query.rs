//! Query service.
//!
//! Every read starts from the batch marker. A statistic record is only
//! served when its batch equals the marker's time; anything else is stale
//! or still in flight and reads as absent. Reads never wait for
//! aggregation, so right after a new marker is published the ranking can
//! be short or empty.

use std::sync::Arc;

use coinvol_core::{BatchMarker, InstrumentId, StatisticRecord, UnixSeconds};
use coinvol_store::{BatchMarkerCell, BatchProgress, BatchStatus, StatisticStore};
use serde::Serialize;
use tracing::debug;

use crate::error::{QueryError, QueryResult};

/// Latest marker together with the convergence of its batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    pub time: UnixSeconds,
    pub version: u64,
    /// `None` when the batch is no longer (or was never) tracked.
    pub progress: Option<BatchStatus>,
    pub converged: bool,
}

#[derive(Clone)]
pub struct QueryService {
    statistics: Arc<dyn StatisticStore>,
    marker: Arc<BatchMarkerCell>,
    progress: Arc<BatchProgress>,
}

impl QueryService {
    pub fn new(
        statistics: Arc<dyn StatisticStore>,
        marker: Arc<BatchMarkerCell>,
        progress: Arc<BatchProgress>,
    ) -> Self {
        Self {
            statistics,
            marker,
            progress,
        }
    }

    fn latest(&self) -> QueryResult<BatchMarker> {
        self.marker.current().ok_or(QueryError::NoBatchMarker)
    }

    /// Up to `limit` records of the latest batch, statistic descending.
    pub fn rank_top(&self, limit: usize) -> QueryResult<Vec<StatisticRecord>> {
        let marker = self.latest()?;
        let rows = self.statistics.top_by_batch(marker.time, limit)?;
        debug!(batch = marker.time, limit, returned = rows.len(), "Ranked latest batch");
        Ok(rows)
    }

    /// The instrument's record if it is fresh for the latest batch.
    pub fn get_one(&self, instrument: &InstrumentId) -> QueryResult<Option<StatisticRecord>> {
        let marker = self.latest()?;
        self.fresh_record(&marker, instrument)
    }

    /// Like [`get_one`](Self::get_one) for a raw pair string. The marker is
    /// checked first; a pair that is not a valid instrument id reads as
    /// absent.
    pub fn get_by_pair(&self, pair: &str) -> QueryResult<Option<StatisticRecord>> {
        let marker = self.latest()?;
        match InstrumentId::new(pair) {
            Ok(instrument) => self.fresh_record(&marker, &instrument),
            Err(_) => Ok(None),
        }
    }

    fn fresh_record(
        &self,
        marker: &BatchMarker,
        instrument: &InstrumentId,
    ) -> QueryResult<Option<StatisticRecord>> {
        let record = self
            .statistics
            .get(instrument)?
            .filter(|record| marker.is_fresh(record.batch));
        Ok(record)
    }

    pub fn batch_status(&self) -> QueryResult<BatchView> {
        let marker = self.latest()?;
        let progress = self.progress.status(marker.time);
        let converged = progress.as_ref().is_some_and(BatchStatus::is_converged);
        Ok(BatchView {
            time: marker.time,
            version: marker.version,
            progress,
            converged,
        })
    }
}

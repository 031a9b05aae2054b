//! Observation store that journals every append.

use coinvol_core::{InstrumentId, PriceObservation, UnixSeconds};
use coinvol_store::{ObservationStore, StoreError, StoreResult};
use parking_lot::Mutex;
use tracing::warn;

use crate::error::PersistenceResult;
use crate::journal::ObservationJournal;

/// Wraps an observation store with a journal.
///
/// The journal line is written before the inner append, so an observation
/// visible to the aggregator is never missing from the journal. A failed
/// journal write fails the append.
pub struct JournaledObservationStore<S> {
    inner: S,
    journal: Mutex<ObservationJournal>,
}

impl<S: ObservationStore> JournaledObservationStore<S> {
    pub fn new(inner: S, journal: ObservationJournal) -> Self {
        Self {
            inner,
            journal: Mutex::new(journal),
        }
    }

    /// Flush buffered journal lines to disk.
    pub fn flush(&self) -> PersistenceResult<()> {
        self.journal.lock().flush()
    }
}

impl<S: ObservationStore> ObservationStore for JournaledObservationStore<S> {
    fn append(&self, observation: PriceObservation) -> StoreResult<()> {
        if let Err(e) = self.journal.lock().record(observation.clone()) {
            warn!(
                instrument = %observation.instrument,
                time = observation.time,
                error = %e,
                "Journal write failed"
            );
            return Err(StoreError::Unavailable(format!("journal: {e}")));
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

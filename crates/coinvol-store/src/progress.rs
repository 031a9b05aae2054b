//! Per-batch convergence accounting.
//!
//! The ingestion writer registers how many instruments it is about to
//! append for a batch; the aggregator reports one outcome per instrument.
//! A batch is converged once every expected instrument has a fresh
//! statistic.

use std::collections::{BTreeMap, HashMap};

use coinvol_core::{InstrumentId, UnixSeconds};
use parking_lot::Mutex;
use serde::Serialize;

/// Number of most recent batches retained.
const RETAINED_BATCHES: usize = 16;

/// Outcome of one aggregation for a tracked batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    /// A fresh statistic was written.
    Written,
    /// Fewer than the minimum observations in the window.
    Skipped,
    /// A newer statistic was already stored.
    Superseded,
    /// Computing or writing the statistic failed.
    Failed,
}

#[derive(Debug, Default)]
struct BatchLedger {
    expected: usize,
    failed_appends: usize,
    outcomes: HashMap<InstrumentId, ProgressOutcome>,
}

/// Snapshot of a batch's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    pub batch: UnixSeconds,
    pub expected: usize,
    pub failed_appends: usize,
    pub written: usize,
    pub skipped: usize,
    pub superseded: usize,
    pub failed: usize,
}

impl BatchStatus {
    /// Every expected instrument has reported an outcome or was never
    /// appended.
    pub fn is_settled(&self) -> bool {
        self.pending() == 0
    }

    /// Every instrument of the batch has a fresh statistic.
    pub fn is_converged(&self) -> bool {
        self.failed_appends == 0 && self.written >= self.expected
    }

    /// Expected instruments still without an outcome.
    pub fn pending(&self) -> usize {
        self.expected.saturating_sub(
            self.written + self.skipped + self.superseded + self.failed + self.failed_appends,
        )
    }
}

#[derive(Default)]
pub struct BatchProgress {
    batches: Mutex<BTreeMap<UnixSeconds, BatchLedger>>,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a batch of `expected` instruments.
    ///
    /// Re-registering a batch (a re-run cycle with the same capture time)
    /// keeps the larger expected count.
    pub fn register(&self, batch: UnixSeconds, expected: usize) {
        let mut batches = self.batches.lock();
        let ledger = batches.entry(batch).or_default();
        ledger.expected = ledger.expected.max(expected);

        while batches.len() > RETAINED_BATCHES {
            batches.pop_first();
        }
    }

    /// Count appends of a tracked batch that never reached the store.
    pub fn record_failed_appends(&self, batch: UnixSeconds, count: usize) {
        if let Some(ledger) = self.batches.lock().get_mut(&batch) {
            ledger.failed_appends += count;
        }
    }

    /// Record an aggregation outcome. Untracked batches are ignored.
    pub fn record(&self, batch: UnixSeconds, instrument: &InstrumentId, outcome: ProgressOutcome) {
        if let Some(ledger) = self.batches.lock().get_mut(&batch) {
            ledger.outcomes.insert(instrument.clone(), outcome);
        }
    }

    pub fn status(&self, batch: UnixSeconds) -> Option<BatchStatus> {
        let batches = self.batches.lock();
        let ledger = batches.get(&batch)?;

        let count = |wanted: ProgressOutcome| {
            ledger
                .outcomes
                .values()
                .filter(|&&outcome| outcome == wanted)
                .count()
        };

        Some(BatchStatus {
            batch,
            expected: ledger.expected,
            failed_appends: ledger.failed_appends,
            written: count(ProgressOutcome::Written),
            skipped: count(ProgressOutcome::Skipped),
            superseded: count(ProgressOutcome::Superseded),
            failed: count(ProgressOutcome::Failed),
        })
    }
}

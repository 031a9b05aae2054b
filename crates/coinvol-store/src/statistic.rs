//! Statistic store.
//!
//! Holds one `StatisticRecord` per instrument (primary key) and a secondary
//! index ordered by `(batch, statistic desc, instrument)` for ranking.
//! Both are kept under one lock so a reader never sees the index and the
//! primary table disagree.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use coinvol_core::{InstrumentId, Statistic, StatisticRecord, UnixSeconds};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::StoreResult;

/// Result of a conditional upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The record was stored.
    Written,
    /// A record from a newer batch is already stored; nothing changed.
    Rejected { stored_batch: UnixSeconds },
}

/// Statistic store boundary.
pub trait StatisticStore: Send + Sync {
    /// Unconditional write (last write wins on the instrument key).
    fn upsert(&self, record: StatisticRecord) -> StoreResult<()>;

    /// Atomic compare-and-set: write only if no record exists or the stored
    /// record's batch is `<=` the incoming batch.
    fn upsert_if_newer(&self, record: StatisticRecord) -> StoreResult<UpsertOutcome>;

    /// Fetch the record for one instrument.
    fn get(&self, instrument: &InstrumentId) -> StoreResult<Option<StatisticRecord>>;

    /// Records tagged with `batch`, statistic descending, at most `limit`.
    fn top_by_batch(&self, batch: UnixSeconds, limit: usize) -> StoreResult<Vec<StatisticRecord>>;
}

impl<T: StatisticStore + ?Sized> StatisticStore for Arc<T> {
    fn upsert(&self, record: StatisticRecord) -> StoreResult<()> {
        (**self).upsert(record)
    }

    fn upsert_if_newer(&self, record: StatisticRecord) -> StoreResult<UpsertOutcome> {
        (**self).upsert_if_newer(record)
    }

    fn get(&self, instrument: &InstrumentId) -> StoreResult<Option<StatisticRecord>> {
        (**self).get(instrument)
    }

    fn top_by_batch(&self, batch: UnixSeconds, limit: usize) -> StoreResult<Vec<StatisticRecord>> {
        (**self).top_by_batch(batch, limit)
    }
}

type RankKey = (Reverse<Statistic>, InstrumentId);

#[derive(Default)]
struct StatisticTable {
    records: HashMap<InstrumentId, StatisticRecord>,
    by_batch: HashMap<UnixSeconds, BTreeSet<RankKey>>,
}

impl StatisticTable {
    fn put(&mut self, record: StatisticRecord) {
        if let Some(old) = self.records.get(&record.instrument) {
            let old_key = (Reverse(old.statistic), old.instrument.clone());
            if let Some(set) = self.by_batch.get_mut(&old.batch) {
                set.remove(&old_key);
                if set.is_empty() {
                    self.by_batch.remove(&old.batch);
                }
            }
        }

        self.by_batch
            .entry(record.batch)
            .or_default()
            .insert((Reverse(record.statistic), record.instrument.clone()));
        self.records.insert(record.instrument.clone(), record);
    }
}

/// In-memory statistic store.
#[derive(Default)]
pub struct InMemoryStatisticStore {
    table: RwLock<StatisticTable>,
}

impl InMemoryStatisticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instruments with a stored statistic.
    pub fn len(&self) -> usize {
        self.table.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatisticStore for InMemoryStatisticStore {
    fn upsert(&self, record: StatisticRecord) -> StoreResult<()> {
        self.table.write().put(record);
        Ok(())
    }

    fn upsert_if_newer(&self, record: StatisticRecord) -> StoreResult<UpsertOutcome> {
        let mut table = self.table.write();
        if let Some(stored) = table.records.get(&record.instrument) {
            if stored.batch > record.batch {
                debug!(
                    instrument = %record.instrument,
                    stored_batch = stored.batch,
                    incoming_batch = record.batch,
                    "Rejected statistic from older batch"
                );
                return Ok(UpsertOutcome::Rejected {
                    stored_batch: stored.batch,
                });
            }
        }
        table.put(record);
        Ok(UpsertOutcome::Written)
    }

    fn get(&self, instrument: &InstrumentId) -> StoreResult<Option<StatisticRecord>> {
        Ok(self.table.read().records.get(instrument).cloned())
    }

    fn top_by_batch(&self, batch: UnixSeconds, limit: usize) -> StoreResult<Vec<StatisticRecord>> {
        let table = self.table.read();
        let Some(set) = table.by_batch.get(&batch) else {
            return Ok(Vec::new());
        };
        Ok(set
            .iter()
            .take(limit)
            .filter_map(|(_, instrument)| table.records.get(instrument).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(id: &str, stat: rust_decimal::Decimal, batch: UnixSeconds) -> StatisticRecord {
        StatisticRecord::new(InstrumentId::new(id).unwrap(), Statistic::new(stat), batch)
    }

    fn id(s: &str) -> InstrumentId {
        InstrumentId::new(s).unwrap()
    }

    #[test]
    fn test_top_by_batch_orders_descending_and_truncates() {
        let store = InMemoryStatisticStore::new();
        store.upsert(record("a/usd", dec!(2.5), 1000)).unwrap();
        store.upsert(record("b/usd", dec!(7.1), 1000)).unwrap();
        store.upsert(record("c/usd", dec!(0.3), 1000)).unwrap();

        let top = store.top_by_batch(1000, 2).unwrap();
        let names: Vec<_> = top.iter().map(|r| r.instrument.as_str()).collect();
        assert_eq!(names, vec!["b/usd", "a/usd"]);
    }

    #[test]
    fn test_top_by_batch_only_returns_matching_batch() {
        let store = InMemoryStatisticStore::new();
        store.upsert(record("a/usd", dec!(2.5), 1000)).unwrap();
        store.upsert(record("b/usd", dec!(9.0), 940)).unwrap();

        let top = store.top_by_batch(1000, 10).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].instrument.as_str(), "a/usd");
        assert!(store.top_by_batch(2000, 10).unwrap().is_empty());
    }

    #[test]
    fn test_equal_statistics_tie_break_by_instrument() {
        let store = InMemoryStatisticStore::new();
        store.upsert(record("z/usd", dec!(1), 1000)).unwrap();
        store.upsert(record("m/usd", dec!(1), 1000)).unwrap();

        let top = store.top_by_batch(1000, 10).unwrap();
        let names: Vec<_> = top.iter().map(|r| r.instrument.as_str()).collect();
        assert_eq!(names, vec!["m/usd", "z/usd"]);
    }

    #[test]
    fn test_upsert_moves_index_entry() {
        let store = InMemoryStatisticStore::new();
        store.upsert(record("a/usd", dec!(2.5), 1000)).unwrap();
        store.upsert(record("a/usd", dec!(3.5), 1060)).unwrap();

        assert!(store.top_by_batch(1000, 10).unwrap().is_empty());
        let top = store.top_by_batch(1060, 10).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].statistic.inner(), dec!(3.5));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unconditional_upsert_allows_regression() {
        let store = InMemoryStatisticStore::new();
        store.upsert(record("a/usd", dec!(3.5), 1060)).unwrap();
        store.upsert(record("a/usd", dec!(2.5), 1000)).unwrap();

        assert_eq!(store.get(&id("a/usd")).unwrap().unwrap().batch, 1000);
    }

    #[test]
    fn test_conditional_upsert_rejects_older_batch() {
        let store = InMemoryStatisticStore::new();
        assert_eq!(
            store.upsert_if_newer(record("a/usd", dec!(3.5), 1060)).unwrap(),
            UpsertOutcome::Written
        );
        assert_eq!(
            store.upsert_if_newer(record("a/usd", dec!(2.5), 1000)).unwrap(),
            UpsertOutcome::Rejected { stored_batch: 1060 }
        );

        let stored = store.get(&id("a/usd")).unwrap().unwrap();
        assert_eq!(stored.batch, 1060);
        assert_eq!(stored.statistic.inner(), dec!(3.5));
    }

    #[test]
    fn test_conditional_upsert_accepts_equal_batch() {
        let store = InMemoryStatisticStore::new();
        store.upsert_if_newer(record("a/usd", dec!(3.5), 1060)).unwrap();
        let outcome = store.upsert_if_newer(record("a/usd", dec!(3.5), 1060)).unwrap();

        assert_eq!(outcome, UpsertOutcome::Written);
        assert_eq!(store.top_by_batch(1060, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = InMemoryStatisticStore::new();
        assert!(store.get(&id("nope/usd")).unwrap().is_none());
    }
}

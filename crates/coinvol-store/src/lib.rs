//! Keyed stores for coinvol.
//!
//! Each store is a trait describing the storage boundary plus an in-memory
//! engine implementing it:
//! - `ObservationStore`: append-only price observations with a change feed
//! - `StatisticStore`: one statistic per instrument, ranked per batch
//! - `BatchMarkerCell`: single-writer pointer to the latest batch
//! - `BatchProgress`: per-batch convergence accounting
//!
//! # Data flow
//!
//! ```text
//! IngestionWriter ──publish──▶ BatchMarkerCell ◀──read── QueryService
//!        │                                                   │
//!        └──append──▶ ObservationStore ──change feed──▶ WindowAggregator
//!                                                            │
//!                          StatisticStore ◀──upsert──────────┘
//! ```

pub mod error;
pub mod marker;
pub mod observation;
pub mod progress;
pub mod statistic;

pub use error::{StoreError, StoreResult};
pub use marker::BatchMarkerCell;
pub use observation::{ChangeFeed, InMemoryObservationStore, ObservationStore};
pub use progress::{BatchProgress, BatchStatus, ProgressOutcome};
pub use statistic::{InMemoryStatisticStore, StatisticStore, UpsertOutcome};

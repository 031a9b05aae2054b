//! Observation journal for coinvol.
//!
//! The observation store is in memory; this crate makes it survive
//! restarts. Every appended observation is also written to a JSON Lines
//! file per UTC day, and on startup the trailing window is read back so
//! aggregation has its history again.

pub mod error;
pub mod journal;
pub mod replay;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use journal::{journal_file_name, ObservationJournal};
pub use replay::replay_window;
pub use store::JournaledObservationStore;

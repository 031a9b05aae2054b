//! Ingestion for coinvol.
//!
//! One ingestion cycle:
//! 1. `MarketDataClient` fetches the current price of every instrument
//! 2. `IngestionWriter` publishes the batch marker for the shared capture
//!    time, then appends one observation per instrument
//!
//! `IngestionJob` runs cycles on a fixed interval until cancelled.

pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod writer;

pub use client::MarketDataClient;
pub use config::IngestConfig;
pub use error::{IngestError, IngestResult};
pub use job::IngestionJob;
pub use writer::{IngestionReport, IngestionWriter};

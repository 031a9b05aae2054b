//! coinvol service.
//!
//! Wires the components into one process:
//! - scheduled ingestion (market data -> batch marker + observations)
//! - change-feed aggregation worker (observations -> statistics)
//! - HTTP read API (statistics cross-checked against the batch marker)
//! - optional observation journal, replayed on startup

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, ConfigSource};
pub use error::{AppError, AppResult};

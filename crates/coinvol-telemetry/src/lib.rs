//! Prometheus metrics and structured logging for coinvol.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters for ingestion, aggregation and reads
//! - Text exposition for the `/metrics` endpoint

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;

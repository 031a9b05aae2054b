//! Trailing-window aggregation for coinvol.
//!
//! Recomputes an instrument's sample standard deviation over the trailing
//! 24 hours every time a new observation is appended.
//!
//! # Architecture
//!
//! ```text
//! ObservationStore ──change feed──▶ AggregationWorker
//!                                     │ delivery batch (≤ 25 events)
//!                                     ├─ task per event (JoinSet)
//!                                     │    └─ WindowAggregator::on_observation
//!                                     │         ├─ range query [t - 86400, t]
//!                                     │         ├─ sample_std_dev
//!                                     │         └─ StatisticStore upsert (policy)
//!                                     └─ DeliveryReport
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod window;
pub mod worker;

pub use aggregator::{AggregationOutcome, DeliveryReport, WindowAggregator};
pub use config::{AggregatorConfig, WritePolicy};
pub use error::{AggregatorError, AggregatorResult};
pub use window::{sample_std_dev, WindowBounds};
pub use worker::AggregationWorker;

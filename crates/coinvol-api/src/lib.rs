//! Read path for coinvol.
//!
//! `QueryService` answers "top instruments of the latest batch" and "one
//! instrument's statistic if fresh" by cross-checking the statistic store
//! against the batch marker. `server` exposes it over HTTP:
//!
//! | Route | Response |
//! |---|---|
//! | `GET /stats?limit=N` | ranked rows of the latest batch |
//! | `GET /stats/{pair}` | one fresh row, 404 if absent or stale |
//! | `GET /batch` | latest marker and its convergence |
//! | `GET /metrics` | Prometheus text |
//! | `GET /health` | liveness |

pub mod config;
pub mod error;
pub mod query;
pub mod server;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, QueryError, QueryResult};
pub use query::{BatchView, QueryService};
pub use server::{bind, create_router, run_server, AppState};

//! Store error types.

use coinvol_core::UnixSeconds;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Batch marker regression: current {current}, attempted {attempted}")]
    MarkerRegression {
        current: UnixSeconds,
        attempted: UnixSeconds,
    },

    #[error("Invalid range: {from} > {to}")]
    InvalidRange { from: UnixSeconds, to: UnixSeconds },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

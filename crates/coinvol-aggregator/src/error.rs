//! Aggregator error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("Store error: {0}")]
    Store(#[from] coinvol_store::StoreError),

    #[error("Numeric error: {0}")]
    Numeric(String),
}

pub type AggregatorResult<T> = Result<T, AggregatorError>;

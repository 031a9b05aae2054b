//! Ingestion error types.

use coinvol_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Malformed upstream response: {0}")]
    Malformed(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type IngestResult<T> = Result<T, IngestError>;

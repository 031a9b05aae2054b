//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] coinvol_store::StoreError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] coinvol_ingest::IngestError),

    #[error("API error: {0}")]
    Api(#[from] coinvol_api::ApiError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] coinvol_persistence::PersistenceError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] coinvol_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

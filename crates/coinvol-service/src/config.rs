//! Application configuration.

use std::path::{Path, PathBuf};

use coinvol_aggregator::AggregatorConfig;
use coinvol_api::ApiConfig;
use coinvol_ingest::IngestConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Overrides `ingest.api_key`.
pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";

/// Observation journal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Journal observations and replay them on startup.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Observations buffered before a flush.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/observations")
}

fn default_buffer_size() -> usize {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            data_dir: default_data_dir(),
            buffer_size: default_buffer_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default log level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Where a loaded configuration came from.
///
/// Returned by [`AppConfig::load`] so the caller can report it once logging
/// is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The file was missing; built-in defaults were used.
    Defaults(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Defaults(path) => path,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load `path` if it exists, otherwise defaults. Environment overrides
    /// are applied either way.
    pub fn load(path: impl AsRef<Path>) -> AppResult<(Self, ConfigSource)> {
        let path = path.as_ref();
        let (mut config, source) = if path.exists() {
            (Self::from_file(path)?, ConfigSource::File(path.to_path_buf()))
        } else {
            (Self::default(), ConfigSource::Defaults(path.to_path_buf()))
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok((config, source))
    }

    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.ingest.api_key = Some(key);
            }
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.aggregator.window_secs <= 0 {
            return Err(AppError::Config(
                "aggregator.window_secs must be positive".to_string(),
            ));
        }
        if self.ingest.enabled && self.ingest.api_url.trim().is_empty() {
            return Err(AppError::Config("ingest.api_url is empty".to_string()));
        }
        Ok(())
    }
}

//! Ingestion configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest page size the markets endpoint accepts.
pub const MAX_PER_PAGE: u32 = 250;

#[derive(Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Run the scheduled ingestion job.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Markets endpoint URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Demo API key, sent as `x-cg-demo-api-key`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
    #[serde(default = "default_order")]
    pub order: String,
    /// Instruments per page (1..=250).
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Maximum pages fetched per cycle.
    #[serde(default = "default_pages")]
    pub pages: u32,
    /// Seconds between ingestion cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_api_url() -> String {
    "https://api.coingecko.com/api/v3/coins/markets".to_string()
}

fn default_vs_currency() -> String {
    "usd".to_string()
}

fn default_order() -> String {
    "market_cap_desc".to_string()
}

fn default_per_page() -> u32 {
    MAX_PER_PAGE
}

fn default_pages() -> u32 {
    1
}

fn default_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            api_url: default_api_url(),
            api_key: None,
            vs_currency: default_vs_currency(),
            order: default_order(),
            per_page: default_per_page(),
            pages: default_pages(),
            interval_secs: default_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl IngestConfig {
    pub fn effective_per_page(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("enabled", &self.enabled)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("vs_currency", &self.vs_currency)
            .field("order", &self.order)
            .field("per_page", &self.per_page)
            .field("pages", &self.pages)
            .field("interval_secs", &self.interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

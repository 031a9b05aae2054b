//! HTTP API configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Serve the HTTP API.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Rows returned by `/stats` without a `limit`.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Upper bound applied to `limit`.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

fn default_limit() -> usize {
    100
}

fn default_max_limit() -> usize {
    1000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: default_port(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl ApiConfig {
    /// Clamp a requested row count to `max_limit`.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ApiConfig = toml::from_str("port = 9000").unwrap();
        assert!(config.enabled);
        assert_eq!(config.port, 9000);
        assert_eq!(config.default_limit, 100);
        assert_eq!(config.max_limit, 1000);
    }

    #[test]
    fn test_clamp_limit() {
        let config = ApiConfig::default();
        assert_eq!(config.clamp_limit(None), 100);
        assert_eq!(config.clamp_limit(Some(5)), 5);
        assert_eq!(config.clamp_limit(Some(50_000)), 1000);
    }
}

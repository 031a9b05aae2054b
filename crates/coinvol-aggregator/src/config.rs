//! Aggregator configuration.

use coinvol_core::{MIN_WINDOW_OBSERVATIONS, WINDOW_SECS};
use serde::{Deserialize, Serialize};

/// How a computed statistic is written over an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Write only if the incoming batch is not older than the stored one.
    #[default]
    Conditional,
    /// Always overwrite. An out-of-order event can replace a newer value.
    LastWriteWins,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Trailing window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
    /// Minimum observations in the window for a statistic to exist.
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
    /// Maximum change events handled per delivery batch.
    #[serde(default = "default_delivery_batch_size")]
    pub delivery_batch_size: usize,
    #[serde(default)]
    pub write_policy: WritePolicy,
}

fn default_window_secs() -> i64 {
    WINDOW_SECS
}

fn default_min_observations() -> usize {
    MIN_WINDOW_OBSERVATIONS
}

fn default_delivery_batch_size() -> usize {
    25
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            min_observations: default_min_observations(),
            delivery_batch_size: default_delivery_batch_size(),
            write_policy: WritePolicy::default(),
        }
    }
}

impl AggregatorConfig {
    /// Sample standard deviation needs at least two points whatever the
    /// configured minimum says.
    pub fn effective_min_observations(&self) -> usize {
        self.min_observations.max(MIN_WINDOW_OBSERVATIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.window_secs, 86_400);
        assert_eq!(config.min_observations, 2);
        assert_eq!(config.delivery_batch_size, 25);
        assert_eq!(config.write_policy, WritePolicy::Conditional);
    }

    #[test]
    fn test_parse_write_policy() {
        let config: AggregatorConfig = toml::from_str(r#"write_policy = "last_write_wins""#).unwrap();
        assert_eq!(config.write_policy, WritePolicy::LastWriteWins);
        assert_eq!(config.window_secs, 86_400);
    }

    #[test]
    fn test_min_observations_floor() {
        let config = AggregatorConfig {
            min_observations: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_min_observations(), 2);
    }
}

//! Resolver configuration.
//!
//! Loaded from YAML with kebab-case keys. Every field has a default, so a
//! file only needs the values it changes:
//!
//! ```yaml
//! latency-budget-ms: 250
//! cache:
//!   capacity: 500
//!   default-ttl-secs: 60
//! ```

use crate::error::{Error, Result};
use crate::graph::critical_path::DEFAULT_BOTTLENECK_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use trellis_cache::CacheConfig;

/// Default latency budget per resolver call.
pub const DEFAULT_LATENCY_BUDGET_MS: u64 = 500;

/// Default fraction of the budget at which health turns `Degraded`.
pub const DEFAULT_DEGRADED_RATIO: f64 = 0.8;

/// Default number of latency samples kept.
pub const DEFAULT_LATENCY_WINDOW: usize = 100;

/// Default duration of an edge without an estimated completion.
pub const DEFAULT_EDGE_DURATION_HOURS: u64 = 24;

/// Configuration for a [`Resolver`](crate::Resolver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResolverConfig {
    /// Graph cache settings
    pub cache: CacheConfig,

    /// Average call latency at which health becomes `Unhealthy`
    pub latency_budget_ms: u64,

    /// Fraction of the budget at which health becomes `Degraded`
    pub degraded_ratio: f64,

    /// Number of recent calls averaged for health
    pub latency_window: usize,

    /// Critical path nodes with more dependents than this are bottlenecks
    pub bottleneck_threshold: usize,

    /// Edge duration used when a dependency has no estimated completion
    pub default_edge_duration_hours: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            latency_budget_ms: DEFAULT_LATENCY_BUDGET_MS,
            degraded_ratio: DEFAULT_DEGRADED_RATIO,
            latency_window: DEFAULT_LATENCY_WINDOW,
            bottleneck_threshold: DEFAULT_BOTTLENECK_THRESHOLD,
            default_edge_duration_hours: DEFAULT_EDGE_DURATION_HOURS,
        }
    }
}

impl ResolverConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config`
    /// if it does not parse or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the text does not parse or fails validation.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if serialization fails and `Error::Io` if the
    /// file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(Error::Config("cache.capacity must be at least 1".to_string()));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(Error::Config(
                "cache.sweep-interval-secs must be at least 1".to_string(),
            ));
        }
        if self.latency_window == 0 {
            return Err(Error::Config("latency-window must be at least 1".to_string()));
        }
        if !(self.degraded_ratio > 0.0 && self.degraded_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "degraded-ratio must be in (0, 1], got {}",
                self.degraded_ratio
            )));
        }
        Ok(())
    }

    /// The latency budget as a [`Duration`].
    #[must_use]
    pub fn latency_budget(&self) -> Duration {
        Duration::from_millis(self.latency_budget_ms)
    }

    /// The default edge duration as a [`Duration`].
    #[must_use]
    pub fn default_edge_duration(&self) -> Duration {
        Duration::from_secs(self.default_edge_duration_hours * 60 * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ResolverConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ResolverConfig::default());
        assert_eq!(config.latency_budget(), Duration::from_millis(500));
        assert_eq!(config.default_edge_duration(), Duration::from_secs(86_400));
    }

    #[test]
    fn partial_document_overrides_only_named_keys() {
        let config = ResolverConfig::from_yaml_str(
            "latency-budget-ms: 250\ncache:\n  capacity: 10\n  default-ttl-secs: 5\n",
        )
        .unwrap();

        assert_eq!(config.latency_budget_ms, 250);
        assert_eq!(config.cache.capacity, 10);
        assert_eq!(config.cache.default_ttl_secs, Some(5));
        assert_eq!(config.cache.sweep_interval_secs, 60);
        assert_eq!(config.bottleneck_threshold, DEFAULT_BOTTLENECK_THRESHOLD);
    }

    #[rstest]
    #[case::zero_capacity("cache:\n  capacity: 0\n", "capacity")]
    #[case::zero_sweep_interval("cache:\n  sweep-interval-secs: 0\n", "sweep-interval-secs")]
    #[case::zero_window("latency-window: 0\n", "latency-window")]
    #[case::zero_ratio("degraded-ratio: 0.0\n", "degraded-ratio")]
    #[case::ratio_above_one("degraded-ratio: 1.5\n", "degraded-ratio")]
    fn invalid_values_are_rejected(#[case] yaml: &str, #[case] field: &str) {
        let err = ResolverConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(field)));
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = ResolverConfig::from_yaml_str("latency-budget-ms: [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("trellis.yaml");
        let config = ResolverConfig {
            latency_budget_ms: 42,
            ..ResolverConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(ResolverConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp = TempDir::new().unwrap();
        let err = ResolverConfig::load(&temp.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

//! # Pipeline Config
//!
//! Window size and anomaly thresholds for a pipeline run. Defaults match the
//! fixed rules of the processor: a two-reading rolling mean, an allowed value
//! range of `[0, 100]` and a spike threshold of 30.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of readings in the trailing rolling-mean window.
    pub window: usize,
    /// Lowest value that is not flagged as out of range.
    pub range_min: f64,
    /// Highest value that is not flagged as out of range.
    pub range_max: f64,
    /// A delta strictly above this is a spike.
    pub spike_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: 2,
            range_min: 0.0,
            range_max: 100.0,
            spike_threshold: 30.0,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("rolling window must hold at least one reading")]
    ZeroWindow,
    #[error("range bounds must be finite, got [{min}, {max}]")]
    NonFiniteRange { min: f64, max: f64 },
    #[error("range_min ({min}) is greater than range_max ({max})")]
    InvertedRange { min: f64, max: f64 },
    #[error("spike threshold must be finite and non-negative, got {0}")]
    InvalidSpikeThreshold(f64),
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if !self.range_min.is_finite() || !self.range_max.is_finite() {
            return Err(ConfigError::NonFiniteRange {
                min: self.range_min,
                max: self.range_max,
            });
        }
        if self.range_min > self.range_max {
            return Err(ConfigError::InvertedRange {
                min: self.range_min,
                max: self.range_max,
            });
        }
        if !self.spike_threshold.is_finite() || self.spike_threshold < 0.0 {
            return Err(ConfigError::InvalidSpikeThreshold(self.spike_threshold));
        }
        Ok(())
    }

    /// Bounds are inclusive on the safe side: `range_min` and `range_max`
    /// themselves are never out of range.
    pub fn is_out_of_range(&self, value: f64) -> bool {
        value < self.range_min || value > self.range_max
    }

    pub fn is_spike(&self, delta: f64) -> bool {
        delta > self.spike_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_fixed_rules() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.window, 2);
        assert_eq!(cfg.range_min, 0.0);
        assert_eq!(cfg.range_max, 100.0);
        assert_eq!(cfg.spike_threshold, 30.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn range_boundaries_are_not_flagged() {
        let cfg = PipelineConfig::default();
        assert!(!cfg.is_out_of_range(0.0));
        assert!(!cfg.is_out_of_range(100.0));
        assert!(cfg.is_out_of_range(-0.001));
        assert!(cfg.is_out_of_range(100.001));
    }

    #[test]
    fn spike_threshold_is_strict() {
        let cfg = PipelineConfig::default();
        assert!(!cfg.is_spike(30.0));
        assert!(cfg.is_spike(30.5));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero = PipelineConfig {
            window: 0,
            ..Default::default()
        };
        assert_eq!(zero.validate(), Err(ConfigError::ZeroWindow));

        let inverted = PipelineConfig {
            range_min: 10.0,
            range_max: 5.0,
            ..Default::default()
        };
        assert_eq!(
            inverted.validate(),
            Err(ConfigError::InvertedRange { min: 10.0, max: 5.0 })
        );

        let infinite = PipelineConfig {
            range_max: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(infinite.validate(), Err(ConfigError::NonFiniteRange { .. })));

        let negative = PipelineConfig {
            spike_threshold: -1.0,
            ..Default::default()
        };
        assert_eq!(negative.validate(), Err(ConfigError::InvalidSpikeThreshold(-1.0)));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: PipelineConfig = toml::from_str("spike_threshold = 12.5\n").unwrap();
        assert_eq!(cfg.spike_threshold, 12.5);
        assert_eq!(cfg.window, 2);
        assert_eq!(cfg.range_max, 100.0);
    }
}

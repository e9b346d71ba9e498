//! Clustering configuration with builder pattern.
//!
//! [`ClusterConfig`] groups every tunable of a clustering run. It is built
//! with `bon` and validated when the builder finishes.
//!
//! # Example
//!
//! ```
//! use statetie::training::{ClusterConfig, GainParams, GrowthStrategy};
//!
//! let config = ClusterConfig::builder()
//!     .gain(GainParams { min_gain: 0.5, min_leaf_size: 2, ..Default::default() })
//!     .growth(GrowthStrategy::BestFirst)
//!     .max_leaves(200)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.max_leaves, Some(200));
//! ```

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::logger::Verbosity;
use super::search::SearchParams;
use super::two_class::TwoClassParams;
use crate::math::LogMode;
use crate::utils::Parallelism;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("min_gain must be positive and finite, got {0}")]
    InvalidMinGain(f64),

    #[error("min_leaf_size must be at least 1")]
    InvalidMinLeafSize,

    #[error("min_occupancy must be non-negative and finite, got {0}")]
    InvalidMinOccupancy(f64),

    #[error("relative_gain must be non-negative and finite, got {0}")]
    InvalidRelativeGain(f64),

    #[error("max_question_terms must be at least 1")]
    InvalidQuestionTerms,

    #[error("max_combinations must be at least 1")]
    InvalidMaxCombinations,

    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("two-class max_iterations must be at least 1")]
    InvalidIterations,

    #[error("max_leaves must be at least 1")]
    InvalidMaxLeaves,

    #[error("stream weights must be non-negative, finite and not all zero: {0:?}")]
    InvalidStreamWeights(Vec<f64>),

    #[error("{field} must be in [{min}, {max}), got {value}")]
    InvalidFloor { field: &'static str, value: f64, min: f64, max: f64 },

    #[error("invalid configuration document: {0}")]
    Parse(String),
}

// =============================================================================
// Parameter groups
// =============================================================================

/// Split acceptance thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainParams {
    /// Minimum weighted entropy reduction (bits) for a split. Must be positive.
    pub min_gain: f64,
    /// Minimum members per node and per child.
    pub min_leaf_size: u32,
    /// Minimum occupancy per child.
    pub min_occupancy: f64,
    /// Stop a node when `gain < relative_gain * node_entropy`.
    pub relative_gain: Option<f64>,
}

impl Default for GainParams {
    fn default() -> Self {
        Self { min_gain: 1e-6, min_leaf_size: 1, min_occupancy: 0.0, relative_gain: None }
    }
}

impl GainParams {
    /// Check child constraints.
    #[inline]
    pub fn is_valid_split(
        &self,
        count_left: usize,
        count_right: usize,
        occ_left: f64,
        occ_right: f64,
    ) -> bool {
        let min_count = self.min_leaf_size as usize;
        count_left >= min_count.max(1)
            && count_right >= min_count.max(1)
            && occ_left >= self.min_occupancy
            && occ_right >= self.min_occupancy
    }
}

/// Order in which pending leaves are expanded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStrategy {
    /// First-in first-out work-list.
    #[default]
    WorkList,
    /// Always expand the pending leaf with the largest gain.
    BestFirst,
}

/// Which statistics drive the entropy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityKind {
    /// Categorical codeword distributions.
    #[default]
    Discrete,
    /// Diagonal Gaussians.
    Continuous,
}

// =============================================================================
// ClusterConfig
// =============================================================================

/// Configuration of a clustering run.
///
/// # Structure
///
/// - **Gain**: split acceptance via [`GainParams`]
/// - **Search**: question enumeration via [`SearchParams`]
/// - **Two-class**: heuristic splitter via [`TwoClassParams`]
/// - **Growth**: expansion order and size caps
/// - **Entropy**: stream weights, floors, density kind, log mode
/// - **Resources**: threading and logging
#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
#[serde(default)]
pub struct ClusterConfig {
    #[builder(default)]
    pub gain: GainParams,

    #[builder(default)]
    pub search: SearchParams,

    #[builder(default)]
    pub two_class: TwoClassParams,

    /// Expansion order. Default: work-list.
    #[builder(default)]
    pub growth: GrowthStrategy,

    /// Stop expanding once the tree has this many leaves.
    pub max_leaves: Option<u32>,

    /// Nodes at this depth are not expanded. The root has depth 0.
    pub max_depth: Option<u32>,

    /// Per-stream entropy weights. `None` weights every stream by 1.
    pub stream_weights: Option<Vec<f64>>,

    #[builder(default)]
    pub density: DensityKind,

    /// Probability floor applied before entropy. Default: 0 (disabled).
    #[builder(default = 0.0)]
    pub density_floor: f64,

    /// Variance floor for continuous densities. Default: 1e-4.
    #[builder(default = 1e-4)]
    pub variance_floor: f64,

    #[builder(default)]
    pub log_mode: LogMode,

    /// Number of threads. 0 = all cores, 1 = sequential. Default: 1.
    #[builder(default = 1)]
    pub n_threads: usize,

    #[builder(default)]
    pub verbosity: Verbosity,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::builder().__build_internal()
    }
}

impl<S: cluster_config_builder::IsComplete> ClusterConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for non-positive `min_gain`, zero sizes or
    /// iteration caps, invalid stream weights, or out-of-range floors.
    pub fn build(self) -> Result<ClusterConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl ClusterConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ClusterConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gain = &self.gain;
        if !(gain.min_gain.is_finite() && gain.min_gain > 0.0) {
            return Err(ConfigError::InvalidMinGain(gain.min_gain));
        }
        if gain.min_leaf_size == 0 {
            return Err(ConfigError::InvalidMinLeafSize);
        }
        if !(gain.min_occupancy.is_finite() && gain.min_occupancy >= 0.0) {
            return Err(ConfigError::InvalidMinOccupancy(gain.min_occupancy));
        }
        if let Some(r) = gain.relative_gain {
            if !(r.is_finite() && r >= 0.0) {
                return Err(ConfigError::InvalidRelativeGain(r));
            }
        }

        if self.search.max_question_terms == 0 {
            return Err(ConfigError::InvalidQuestionTerms);
        }
        if self.search.max_combinations == 0 {
            return Err(ConfigError::InvalidMaxCombinations);
        }
        if self.search.top_k == 0 {
            return Err(ConfigError::InvalidTopK);
        }
        if self.two_class.max_iterations == 0 {
            return Err(ConfigError::InvalidIterations);
        }
        if self.max_leaves == Some(0) {
            return Err(ConfigError::InvalidMaxLeaves);
        }

        if let Some(weights) = &self.stream_weights {
            let valid = !weights.is_empty()
                && weights.iter().all(|w| w.is_finite() && *w >= 0.0)
                && weights.iter().any(|w| *w > 0.0);
            if !valid {
                return Err(ConfigError::InvalidStreamWeights(weights.clone()));
            }
        }

        if !(self.density_floor.is_finite() && (0.0..1.0).contains(&self.density_floor)) {
            return Err(ConfigError::InvalidFloor {
                field: "density_floor",
                value: self.density_floor,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(self.variance_floor.is_finite() && self.variance_floor > 0.0) {
            return Err(ConfigError::InvalidFloor {
                field: "variance_floor",
                value: self.variance_floor,
                min: f64::MIN_POSITIVE,
                max: f64::INFINITY,
            });
        }
        Ok(())
    }

    /// Stream weights for `n_streams` streams.
    pub fn stream_weights_for(&self, n_streams: usize) -> Vec<f64> {
        match &self.stream_weights {
            Some(w) => w.clone(),
            None => vec![1.0; n_streams],
        }
    }

    #[inline]
    pub fn parallelism(&self) -> Parallelism {
        Parallelism::from_threads(self.n_threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{QuestionStrategy, SeedPolicy};

    #[test]
    fn test_default_config_is_valid() {
        let config = ClusterConfig::builder().build().unwrap();
        assert_eq!(config, ClusterConfig::default());
        assert_eq!(config.n_threads, 1);
        assert_eq!(config.parallelism(), Parallelism::Sequential);
        assert_eq!(config.stream_weights_for(3), vec![1.0; 3]);
    }

    #[test]
    fn test_min_gain_must_be_positive() {
        for bad in [0.0, -1.0, f64::NAN] {
            let err = ClusterConfig::builder()
                .gain(GainParams { min_gain: bad, ..Default::default() })
                .build()
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidMinGain(_)));
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ClusterConfig::builder()
            .stream_weights(vec![0.0, 0.0])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStreamWeights(_)));

        let err = ClusterConfig::builder().max_leaves(0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidMaxLeaves);

        let err = ClusterConfig::builder().density_floor(1.0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFloor { field: "density_floor", .. }));

        let err = ClusterConfig::builder()
            .gain(GainParams { min_leaf_size: 0, ..Default::default() })
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidMinLeafSize);
    }

    #[test]
    fn test_from_json_with_defaults() {
        let config = ClusterConfig::from_json(
            r#"{
                "gain": { "min_gain": 0.25 },
                "search": { "max_question_terms": 3, "strategy": "atomic_only" },
                "two_class": { "seed": { "random": { "seed": 7 } } },
                "growth": "best_first",
                "max_leaves": 10
            }"#,
        )
        .unwrap();
        assert_eq!(config.gain.min_gain, 0.25);
        assert_eq!(config.gain.min_leaf_size, 1);
        assert_eq!(config.search.max_question_terms, 3);
        assert_eq!(config.search.strategy, QuestionStrategy::AtomicOnly);
        assert_eq!(config.two_class.seed, SeedPolicy::Random { seed: 7 });
        assert_eq!(config.growth, GrowthStrategy::BestFirst);

        let err = ClusterConfig::from_json(r#"{ "gain": { "min_gain": 0.0 } }"#).unwrap_err();
        assert_eq!(err, ConfigError::InvalidMinGain(0.0));
        assert!(matches!(ClusterConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_split_constraints() {
        let gain = GainParams { min_leaf_size: 2, min_occupancy: 1.0, ..Default::default() };
        assert!(gain.is_valid_split(2, 3, 1.0, 5.0));
        assert!(!gain.is_valid_split(1, 4, 1.0, 5.0));
        assert!(!gain.is_valid_split(2, 3, 0.5, 5.0));
    }
}

//! Node-level entropy measures.
//!
//! [`Metric`] applies the divergence kernels to whole [`NodeDensity`]
//! aggregates: stream weighting, probability and variance floors, and the
//! discrete or continuous entropy model chosen in the configuration.

use super::config::{ClusterConfig, DensityKind};
use crate::data::NodeDensity;
use crate::math::{gaussian_entropy, mixture, LogMode};

/// Weighted entropy of node densities.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    stream_weights: Vec<f64>,
    kind: DensityKind,
    log_mode: LogMode,
    density_floor: f64,
    variance_floor: f64,
}

impl Metric {
    pub fn new(stream_weights: Vec<f64>, kind: DensityKind, log_mode: LogMode) -> Self {
        Self { stream_weights, kind, log_mode, density_floor: 0.0, variance_floor: 1e-4 }
    }

    /// Metric for a corpus with `n_streams` streams under `config`.
    pub fn from_config(config: &ClusterConfig, n_streams: usize) -> Self {
        Self {
            stream_weights: config.stream_weights_for(n_streams),
            kind: config.density,
            log_mode: config.log_mode,
            density_floor: config.density_floor,
            variance_floor: config.variance_floor,
        }
    }

    #[inline]
    pub fn stream_weights(&self) -> &[f64] {
        &self.stream_weights
    }

    #[inline]
    pub fn kind(&self) -> DensityKind {
        self.kind
    }

    /// Stream-weighted sum of per-stream entropies (not scaled by mass).
    pub fn entropy_per_stream(&self, density: &NodeDensity) -> f64 {
        match (self.kind, density.gaussian()) {
            (DensityKind::Continuous, Some(g)) => (0..g.n_streams())
                .zip(&self.stream_weights)
                .map(|(s, w)| w * gaussian_entropy(&g.variance(s, self.variance_floor)))
                .sum(),
            _ => density
                .streams()
                .iter()
                .zip(&self.stream_weights)
                .map(|(d, w)| w * self.log_mode.entropy(&d.probabilities(self.density_floor)))
                .sum(),
        }
    }

    /// Entropy scaled by occupancy, summed over weighted streams.
    ///
    /// Zero for an empty group.
    pub fn weighted_entropy(&self, density: &NodeDensity) -> f64 {
        match (self.kind, density.gaussian()) {
            (DensityKind::Continuous, Some(g)) => {
                if g.occupancy() <= 0.0 {
                    return 0.0;
                }
                g.occupancy() * self.entropy_per_stream(density)
            }
            _ => density
                .streams()
                .iter()
                .zip(&self.stream_weights)
                .filter(|(d, _)| d.mass() > 0.0)
                .map(|(d, w)| {
                    w * d.mass() * self.log_mode.entropy(&d.probabilities(self.density_floor))
                })
                .sum(),
        }
    }

    /// Entropy increase from forcing `a` and `b` to share one distribution.
    pub fn merge_cost(&self, a: &NodeDensity, b: &NodeDensity) -> f64 {
        match (self.kind, a.gaussian(), b.gaussian()) {
            (DensityKind::Continuous, Some(_), Some(_)) => {
                let merged = NodeDensity::merged(a, b);
                self.weighted_entropy(&merged) - self.weighted_entropy(a) - self.weighted_entropy(b)
            }
            _ => a
                .streams()
                .iter()
                .zip(b.streams())
                .zip(&self.stream_weights)
                .map(|((da, db), w)| {
                    let pa = da.probabilities(self.density_floor);
                    let pb = db.probabilities(self.density_floor);
                    let merged = mixture(&pa, da.mass(), &pb, db.mass());
                    w * self.log_mode.weighted_entropy_increase(
                        &pa,
                        da.mass(),
                        &pb,
                        db.mass(),
                        &merged,
                    )
                })
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DistributionVector, GaussianAccumulator, GaussianStats};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn discrete(values: ndarray::Array1<f64>) -> NodeDensity {
        NodeDensity::new(vec![DistributionVector::from_counts(values)], None)
    }

    #[test]
    fn test_weighted_entropy_scales_with_mass() {
        let metric = Metric::new(vec![1.0], DensityKind::Discrete, LogMode::Native);
        let d = discrete(array![2.0, 2.0]);
        assert_abs_diff_eq!(metric.entropy_per_stream(&d), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(metric.weighted_entropy(&d), 4.0, epsilon = 1e-12);
        assert_eq!(metric.weighted_entropy(&discrete(array![0.0, 0.0])), 0.0);
    }

    #[test]
    fn test_stream_weights_apply() {
        let metric = Metric::new(vec![1.0, 0.5], DensityKind::Discrete, LogMode::Native);
        let d = NodeDensity::new(
            vec![
                DistributionVector::from_counts(array![1.0, 1.0]),
                DistributionVector::from_counts(array![1.0, 1.0]),
            ],
            None,
        );
        assert_abs_diff_eq!(metric.weighted_entropy(&d), 2.0 + 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_merge_cost_is_entropy_difference() {
        let metric = Metric::new(vec![1.0], DensityKind::Discrete, LogMode::Native);
        let a = discrete(array![9.0, 1.0, 0.0, 0.0]);
        let b = discrete(array![0.0, 0.0, 1.0, 9.0]);
        let merged = NodeDensity::merged(&a, &b);
        let expected =
            metric.weighted_entropy(&merged) - metric.weighted_entropy(&a) - metric.weighted_entropy(&b);
        assert_abs_diff_eq!(metric.merge_cost(&a, &b), expected, epsilon = 1e-9);
        assert_abs_diff_eq!(metric.merge_cost(&a, &a), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_continuous_entropy() {
        let metric = Metric::new(vec![1.0], DensityKind::Continuous, LogMode::Native);
        let a = GaussianStats::new(2.0, array![[-1.0]], array![[1.0]]);
        let b = GaussianStats::new(2.0, array![[1.0]], array![[1.0]]);
        let da = NodeDensity::new(
            vec![DistributionVector::zeros(1)],
            Some(GaussianAccumulator::from_stats(&a)),
        );
        let db = NodeDensity::new(
            vec![DistributionVector::zeros(1)],
            Some(GaussianAccumulator::from_stats(&b)),
        );
        assert_abs_diff_eq!(
            metric.weighted_entropy(&da),
            2.0 * gaussian_entropy(&[1.0]),
            epsilon = 1e-12
        );
        // Pooled variance is 2, so merging costs 4 * 0.5 * log2(2) = 2 bits.
        assert_abs_diff_eq!(metric.merge_cost(&da, &db), 2.0, epsilon = 1e-9);
    }
}

//! Per-stream categorical distributions and their accumulation.
//!
//! - [`DistributionVector`]: non-negative codeword counts plus an occupancy mass
//! - [`NodeDensity`]: one distribution per stream, optionally with Gaussian statistics
//! - [`DensityMerger`]: builds node densities from corpus members
//!
//! Merging is an element-wise sum, so the aggregate of a group does not depend
//! on merge order beyond floating-point rounding.

use approx::AbsDiffEq;
use ndarray::{Array1, ArrayView1};

use super::corpus::StateCorpus;
use super::gaussian::GaussianAccumulator;

// =============================================================================
// DistributionVector
// =============================================================================

/// Codeword counts for one feature stream with a scalar normalizer.
#[derive(Clone, Debug, PartialEq)]
pub struct DistributionVector {
    values: Array1<f64>,
    mass: f64,
}

impl DistributionVector {
    /// Empty distribution over `n_codewords`.
    pub fn zeros(n_codewords: usize) -> Self {
        Self { values: Array1::zeros(n_codewords), mass: 0.0 }
    }

    /// Counts whose normalizer is their sum.
    pub fn from_counts(values: Array1<f64>) -> Self {
        let mass = values.sum();
        Self { values, mass }
    }

    /// Counts with an explicit normalizer (e.g. state occupancy).
    pub fn with_mass(values: Array1<f64>, mass: f64) -> Self {
        Self { values, mass }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[inline]
    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    /// Normalized probabilities; all zeros when the counts sum to zero.
    ///
    /// Entries below `floor` are raised to it before renormalizing.
    pub fn probabilities(&self, floor: f64) -> Vec<f64> {
        let total = self.values.sum();
        if total <= 0.0 {
            return vec![0.0; self.values.len()];
        }
        let mut p: Vec<f64> = self.values.iter().map(|&v| (v / total).max(floor)).collect();
        if floor > 0.0 {
            let renorm: f64 = p.iter().sum();
            p.iter_mut().for_each(|x| *x /= renorm);
        }
        p
    }

    /// Element-wise add `other` into `self`.
    pub fn merge(&mut self, other: &DistributionVector) {
        debug_assert_eq!(self.len(), other.len());
        self.values += &other.values;
        self.mass += other.mass;
    }

    /// Add `weight * other` into `self` (soft assignment).
    pub fn interpolate(&mut self, other: &DistributionVector, weight: f64) {
        debug_assert_eq!(self.len(), other.len());
        self.values.scaled_add(weight, &other.values);
        self.mass += weight * other.mass;
    }

    /// Remove `other` from `self`, clamping entries at zero.
    pub fn subtract(&mut self, other: &DistributionVector) {
        debug_assert_eq!(self.len(), other.len());
        self.values.zip_mut_with(&other.values, |a, &b| *a = (*a - b).max(0.0));
        self.mass = (self.mass - other.mass).max(0.0);
    }

    /// Sum of two distributions.
    pub fn merged(a: &DistributionVector, b: &DistributionVector) -> Self {
        let mut out = a.clone();
        out.merge(b);
        out
    }
}

impl AbsDiffEq for DistributionVector {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        1e-9
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.len() == other.len()
            && self.mass.abs_diff_eq(&other.mass, epsilon)
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

// =============================================================================
// NodeDensity
// =============================================================================

/// Aggregate statistics of a group of states: one distribution per stream.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDensity {
    streams: Vec<DistributionVector>,
    gaussian: Option<GaussianAccumulator>,
}

impl NodeDensity {
    pub fn new(streams: Vec<DistributionVector>, gaussian: Option<GaussianAccumulator>) -> Self {
        Self { streams, gaussian }
    }

    /// Empty density shaped like `self`.
    pub fn empty_like(&self) -> Self {
        Self {
            streams: self.streams.iter().map(|s| DistributionVector::zeros(s.len())).collect(),
            gaussian: self.gaussian.as_ref().map(GaussianAccumulator::empty_like),
        }
    }

    #[inline]
    pub fn streams(&self) -> &[DistributionVector] {
        &self.streams
    }

    #[inline]
    pub fn n_streams(&self) -> usize {
        self.streams.len()
    }

    #[inline]
    pub fn gaussian(&self) -> Option<&GaussianAccumulator> {
        self.gaussian.as_ref()
    }

    /// Occupancy of the group: Gaussian occupancy if present, else the mass of
    /// the first stream.
    pub fn occupancy(&self) -> f64 {
        match &self.gaussian {
            Some(g) => g.occupancy(),
            None => self.streams.first().map_or(0.0, DistributionVector::mass),
        }
    }

    pub fn merge(&mut self, other: &NodeDensity) {
        debug_assert_eq!(self.n_streams(), other.n_streams());
        for (acc, s) in self.streams.iter_mut().zip(&other.streams) {
            acc.merge(s);
        }
        if let (Some(acc), Some(g)) = (self.gaussian.as_mut(), other.gaussian.as_ref()) {
            acc.merge(g);
        }
    }

    pub fn interpolate(&mut self, other: &NodeDensity, weight: f64) {
        debug_assert_eq!(self.n_streams(), other.n_streams());
        for (acc, s) in self.streams.iter_mut().zip(&other.streams) {
            acc.interpolate(s, weight);
        }
        if let (Some(acc), Some(g)) = (self.gaussian.as_mut(), other.gaussian.as_ref()) {
            acc.interpolate(g, weight);
        }
    }

    pub fn subtract(&mut self, other: &NodeDensity) {
        for (acc, s) in self.streams.iter_mut().zip(&other.streams) {
            acc.subtract(s);
        }
        if let (Some(acc), Some(g)) = (self.gaussian.as_mut(), other.gaussian.as_ref()) {
            acc.subtract(g);
        }
    }

    pub fn merged(a: &NodeDensity, b: &NodeDensity) -> Self {
        let mut out = a.clone();
        out.merge(b);
        out
    }
}

// =============================================================================
// DensityMerger
// =============================================================================

/// Accumulates member statistics from a corpus into node-level densities.
#[derive(Clone, Copy, Debug)]
pub struct DensityMerger<'a> {
    corpus: &'a StateCorpus,
}

impl<'a> DensityMerger<'a> {
    pub fn new(corpus: &'a StateCorpus) -> Self {
        Self { corpus }
    }

    /// Density of a single corpus row.
    pub fn state_density(&self, row: u32) -> NodeDensity {
        let counts = self.corpus.counts(row);
        let mass = self.corpus.mass(row);
        let streams = counts
            .outer_iter()
            .map(|stream| DistributionVector::with_mass(stream.to_owned(), mass))
            .collect();
        let gaussian = self.corpus.gaussian(row).map(GaussianAccumulator::from_stats);
        NodeDensity::new(streams, gaussian)
    }

    /// Merge `row` into `acc`.
    pub fn merge(&self, acc: &mut NodeDensity, row: u32) {
        let counts = self.corpus.counts(row);
        let mass = self.corpus.mass(row);
        for (dist, stream) in acc.streams.iter_mut().zip(counts.outer_iter()) {
            dist.values += &stream;
            dist.mass += mass;
        }
        if let (Some(g), Some(stats)) = (acc.gaussian.as_mut(), self.corpus.gaussian(row)) {
            g.add_stats(stats);
        }
    }

    /// Merge `weight * row` into `acc`.
    pub fn interpolate(&self, acc: &mut NodeDensity, row: u32, weight: f64) {
        acc.interpolate(&self.state_density(row), weight);
    }

    /// Empty accumulator shaped for this corpus.
    pub fn empty(&self) -> NodeDensity {
        let streams = (0..self.corpus.n_streams())
            .map(|_| DistributionVector::zeros(self.corpus.n_codewords()))
            .collect();
        let gaussian = self
            .corpus
            .gaussian_dims()
            .map(|dim| GaussianAccumulator::zeros(self.corpus.n_streams(), dim));
        NodeDensity::new(streams, gaussian)
    }

    /// Density of a group of rows.
    pub fn accumulate(&self, rows: &[u32]) -> NodeDensity {
        let mut acc = self.empty();
        for &row in rows {
            self.merge(&mut acc, row);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_merge_sums_counts_and_mass() {
        let mut a = DistributionVector::from_counts(array![1.0, 2.0, 0.0]);
        let b = DistributionVector::with_mass(array![0.5, 0.0, 3.0], 2.0);
        a.merge(&b);
        assert_eq!(a.values(), array![1.5, 2.0, 3.0].view());
        assert_eq!(a.mass(), 5.0);
    }

    #[test]
    fn test_interpolate_is_weighted_merge() {
        let mut acc = DistributionVector::zeros(2);
        let x = DistributionVector::from_counts(array![2.0, 6.0]);
        acc.interpolate(&x, 0.25);
        assert_abs_diff_eq!(acc, DistributionVector::with_mass(array![0.5, 1.5], 2.0));
    }

    #[test]
    fn test_soft_assignment_splits_a_merge() {
        let mut corpus = crate::testing::random_corpus(6, 2, 4, 3, 5);
        crate::testing::attach_random_gaussians(&mut corpus, 2, 6);
        let merger = DensityMerger::new(&corpus);
        let rows = [0u32, 1, 2];
        let hard = merger.accumulate(&rows);

        // Every row split 0.3 / 0.7 between two accumulators.
        let mut a = merger.empty();
        let mut b = merger.empty();
        for &row in &rows {
            merger.interpolate(&mut a, row, 0.3);
            merger.interpolate(&mut b, row, 0.7);
        }
        assert_abs_diff_eq!(a.occupancy(), 0.3 * hard.occupancy(), epsilon = 1e-9);
        a.merge(&b);
        for (soft, full) in a.streams().iter().zip(hard.streams()) {
            assert_abs_diff_eq!(soft, full, epsilon = 1e-9);
        }

        let (soft_g, hard_g) = (a.gaussian().unwrap(), hard.gaussian().unwrap());
        assert_abs_diff_eq!(soft_g.occupancy(), hard_g.occupancy(), epsilon = 1e-9);
        for stream in 0..2 {
            for (x, y) in soft_g.mean(stream).iter().zip(hard_g.mean(stream)) {
                assert_abs_diff_eq!(*x, y, epsilon = 1e-9);
            }
            for (x, y) in soft_g.variance(stream, 0.0).iter().zip(hard_g.variance(stream, 0.0)) {
                assert_abs_diff_eq!(*x, y, epsilon = 1e-9);
            }
        }

        // A single partially assigned state keeps its own mean.
        let mut partial = merger.empty();
        merger.interpolate(&mut partial, 4, 0.25);
        let own = merger.state_density(4);
        let (pg, og) = (partial.gaussian().unwrap(), own.gaussian().unwrap());
        assert_abs_diff_eq!(pg.occupancy(), 0.25 * og.occupancy(), epsilon = 1e-12);
        for (x, y) in pg.mean(0).iter().zip(og.mean(0)) {
            assert_abs_diff_eq!(*x, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_probabilities_with_floor() {
        let d = DistributionVector::from_counts(array![9.0, 1.0, 0.0, 0.0]);
        assert_eq!(d.probabilities(0.0), vec![0.9, 0.1, 0.0, 0.0]);

        let floored = d.probabilities(0.01);
        assert!(floored.iter().all(|&p| p > 0.0));
        assert_abs_diff_eq!(floored.iter().sum::<f64>(), 1.0, epsilon = 1e-12);

        let empty = DistributionVector::zeros(3);
        assert_eq!(empty.probabilities(0.01), vec![0.0; 3]);
    }

    #[test]
    fn test_subtract_clamps_at_zero() {
        let mut a = DistributionVector::from_counts(array![1.0, 1.0]);
        a.subtract(&DistributionVector::from_counts(array![1.5, 0.5]));
        assert_eq!(a.values(), array![0.0, 0.5].view());
        assert_eq!(a.mass(), 0.0);
    }
}

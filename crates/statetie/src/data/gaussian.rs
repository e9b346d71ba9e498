//! Diagonal Gaussian statistics for continuous-density states.

use ndarray::{Array2, ArrayView2, Axis};

/// Per-state diagonal Gaussians: one `(mean, variance)` row per stream.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianStats {
    /// Occupancy (expected frame count) of the state.
    pub occupancy: f64,
    /// `[n_streams, dim]` means.
    pub mean: Array2<f64>,
    /// `[n_streams, dim]` variances.
    pub var: Array2<f64>,
}

impl GaussianStats {
    pub fn new(occupancy: f64, mean: Array2<f64>, var: Array2<f64>) -> Self {
        Self { occupancy, mean, var }
    }

    /// `(n_streams, dim)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.mean.dim()
    }
}

/// Sufficient statistics of a group of Gaussians.
///
/// Accumulates `occ * mean` and `occ * (var + mean^2)` so that the pooled
/// mean and variance of any group follow from a plain sum.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianAccumulator {
    occupancy: f64,
    sum: Array2<f64>,
    sum_sq: Array2<f64>,
}

impl GaussianAccumulator {
    pub fn zeros(n_streams: usize, dim: usize) -> Self {
        Self {
            occupancy: 0.0,
            sum: Array2::zeros((n_streams, dim)),
            sum_sq: Array2::zeros((n_streams, dim)),
        }
    }

    pub fn from_stats(stats: &GaussianStats) -> Self {
        let (n_streams, dim) = stats.shape();
        let mut acc = Self::zeros(n_streams, dim);
        acc.add_stats(stats);
        acc
    }

    pub fn empty_like(&self) -> Self {
        let (n_streams, dim) = self.sum.dim();
        Self::zeros(n_streams, dim)
    }

    /// Rebuild from raw sums, as stored by [`sums`](Self::sums).
    pub fn from_sums(occupancy: f64, sum: Array2<f64>, sum_sq: Array2<f64>) -> Self {
        Self { occupancy, sum, sum_sq }
    }

    #[inline]
    pub fn occupancy(&self) -> f64 {
        self.occupancy
    }

    /// `(occ * mean, occ * (var + mean^2))` sums, `[n_streams, dim]` each.
    #[inline]
    pub fn sums(&self) -> (ArrayView2<'_, f64>, ArrayView2<'_, f64>) {
        (self.sum.view(), self.sum_sq.view())
    }

    /// Add one state's Gaussian, weighted by its occupancy.
    pub fn add_stats(&mut self, stats: &GaussianStats) {
        let occ = stats.occupancy;
        self.occupancy += occ;
        self.sum.scaled_add(occ, &stats.mean);
        let second = &stats.var + &stats.mean.mapv(|m| m * m);
        self.sum_sq.scaled_add(occ, &second);
    }

    pub fn merge(&mut self, other: &GaussianAccumulator) {
        self.occupancy += other.occupancy;
        self.sum += &other.sum;
        self.sum_sq += &other.sum_sq;
    }

    pub fn interpolate(&mut self, other: &GaussianAccumulator, weight: f64) {
        self.occupancy += weight * other.occupancy;
        self.sum.scaled_add(weight, &other.sum);
        self.sum_sq.scaled_add(weight, &other.sum_sq);
    }

    pub fn subtract(&mut self, other: &GaussianAccumulator) {
        self.occupancy = (self.occupancy - other.occupancy).max(0.0);
        self.sum -= &other.sum;
        self.sum_sq -= &other.sum_sq;
    }

    /// Pooled mean of `stream`; zeros for an empty group.
    pub fn mean(&self, stream: usize) -> Vec<f64> {
        let row = self.sum.index_axis(Axis(0), stream);
        if self.occupancy <= 0.0 {
            return vec![0.0; row.len()];
        }
        row.iter().map(|&s| s / self.occupancy).collect()
    }

    /// Pooled variance of `stream`, floored at `floor`.
    pub fn variance(&self, stream: usize, floor: f64) -> Vec<f64> {
        let sum = self.sum.index_axis(Axis(0), stream);
        let sum_sq = self.sum_sq.index_axis(Axis(0), stream);
        if self.occupancy <= 0.0 {
            return vec![floor; sum.len()];
        }
        sum.iter()
            .zip(sum_sq.iter())
            .map(|(&s, &sq)| {
                let mean = s / self.occupancy;
                (sq / self.occupancy - mean * mean).max(floor)
            })
            .collect()
    }

    #[inline]
    pub fn n_streams(&self) -> usize {
        self.sum.nrows()
    }
}

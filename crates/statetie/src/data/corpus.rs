//! The set of states to be clustered.
//!
//! A [`StateCorpus`] holds, for every state, its codeword counts per stream,
//! its occupancy, its phonetic context and (for continuous models) its
//! Gaussian statistics. External state ids may be sparse; rows are dense and
//! assigned by an [`IdRemapper`] in insertion order.

use ndarray::{Array2, ArrayView2};

use super::context::StateContext;
use super::gaussian::GaussianStats;
use super::remap::IdRemapper;
use crate::math::{LogMath, MIN_LOG};

// =============================================================================
// CorpusError
// =============================================================================

/// Errors raised while adding states to a corpus.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorpusError {
    #[error("state {id}: expected counts of shape [{expected_streams}, {expected_codewords}], got [{streams}, {codewords}]")]
    ShapeMismatch {
        id: u32,
        expected_streams: usize,
        expected_codewords: usize,
        streams: usize,
        codewords: usize,
    },

    #[error("state {0} was already added")]
    DuplicateId(u32),

    #[error("state {id}: counts must be finite and non-negative, found {value}")]
    InvalidCount { id: u32, value: f64 },

    #[error("state {id}: occupancy must be finite and non-negative, got {value}")]
    InvalidOccupancy { id: u32, value: f64 },

    #[error("state {id}: gaussian shape [{streams}, {dim}] does not match corpus")]
    GaussianMismatch { id: u32, streams: usize, dim: usize },

    #[error("state {0} is not in the corpus")]
    UnknownState(u32),
}

// =============================================================================
// StateCorpus
// =============================================================================

/// Per-state statistics indexed by dense row.
#[derive(Clone, Debug)]
pub struct StateCorpus {
    n_streams: usize,
    n_codewords: usize,
    ids: IdRemapper,
    counts: Vec<Array2<f64>>,
    masses: Vec<f64>,
    contexts: Vec<StateContext>,
    gaussians: Vec<Option<GaussianStats>>,
    gaussian_dim: Option<usize>,
}

impl StateCorpus {
    /// Empty corpus with `n_streams` streams of `n_codewords` codewords each.
    pub fn new(n_streams: usize, n_codewords: usize) -> Self {
        Self::with_capacity(n_streams, n_codewords, 0)
    }

    pub fn with_capacity(n_streams: usize, n_codewords: usize, n_states: usize) -> Self {
        Self {
            n_streams,
            n_codewords,
            ids: IdRemapper::with_capacity(n_states),
            counts: Vec::with_capacity(n_states),
            masses: Vec::with_capacity(n_states),
            contexts: Vec::with_capacity(n_states),
            gaussians: Vec::with_capacity(n_states),
            gaussian_dim: None,
        }
    }

    /// Add a state whose occupancy is the total count of its first stream.
    ///
    /// Returns the dense row assigned to `id`.
    pub fn push(
        &mut self,
        id: u32,
        context: StateContext,
        counts: Array2<f64>,
    ) -> Result<u32, CorpusError> {
        let mass = if counts.nrows() > 0 { counts.row(0).sum() } else { 0.0 };
        self.push_with_mass(id, context, counts, mass)
    }

    /// Add a state with an explicit occupancy.
    pub fn push_with_mass(
        &mut self,
        id: u32,
        context: StateContext,
        counts: Array2<f64>,
        mass: f64,
    ) -> Result<u32, CorpusError> {
        let (streams, codewords) = counts.dim();
        if streams != self.n_streams || codewords != self.n_codewords {
            return Err(CorpusError::ShapeMismatch {
                id,
                expected_streams: self.n_streams,
                expected_codewords: self.n_codewords,
                streams,
                codewords,
            });
        }
        if let Some(&value) = counts.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(CorpusError::InvalidCount { id, value });
        }
        if !mass.is_finite() || mass < 0.0 {
            return Err(CorpusError::InvalidOccupancy { id, value: mass });
        }
        if self.ids.contains(id) {
            return Err(CorpusError::DuplicateId(id));
        }

        let row = self.ids.remap(id);
        self.counts.push(counts);
        self.masses.push(mass);
        self.contexts.push(context);
        self.gaussians.push(None);
        Ok(row)
    }

    /// Add a state from log-domain mixture weights.
    ///
    /// Each stream's weights are normalized in the log domain and scaled by
    /// `mass`, so the stored counts are expected codeword occupancies.
    pub fn push_log_weights(
        &mut self,
        id: u32,
        context: StateContext,
        log_weights: &Array2<i32>,
        mass: f64,
        logmath: &LogMath,
    ) -> Result<u32, CorpusError> {
        let mut counts = Array2::zeros(log_weights.dim());
        for (mut out, stream) in counts.rows_mut().into_iter().zip(log_weights.rows()) {
            let total = logmath.log_sum(stream.iter().copied());
            if total <= MIN_LOG {
                continue;
            }
            for (c, &w) in out.iter_mut().zip(stream.iter()) {
                *c = mass * logmath.from_log(logmath.divide(w, total));
            }
        }
        self.push_with_mass(id, context, counts, mass)
    }

    /// Attach continuous-density statistics to an existing state.
    pub fn attach_gaussian(&mut self, id: u32, stats: GaussianStats) -> Result<(), CorpusError> {
        let row = self.ids.get(id).ok_or(CorpusError::UnknownState(id))?;
        let (streams, dim) = stats.shape();
        let dim_ok = self.gaussian_dim.map_or(true, |d| d == dim);
        if streams != self.n_streams || !dim_ok || stats.var.dim() != (streams, dim) {
            return Err(CorpusError::GaussianMismatch { id, streams, dim });
        }
        if !stats.occupancy.is_finite() || stats.occupancy < 0.0 {
            return Err(CorpusError::InvalidOccupancy { id, value: stats.occupancy });
        }
        self.gaussian_dim = Some(dim);
        self.gaussians[row as usize] = Some(stats);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    #[inline]
    pub fn n_streams(&self) -> usize {
        self.n_streams
    }

    #[inline]
    pub fn n_codewords(&self) -> usize {
        self.n_codewords
    }

    /// Gaussian dimension per stream, once any state carries Gaussians.
    #[inline]
    pub fn gaussian_dims(&self) -> Option<usize> {
        self.gaussian_dim
    }

    #[inline]
    pub fn counts(&self, row: u32) -> ArrayView2<'_, f64> {
        self.counts[row as usize].view()
    }

    #[inline]
    pub fn mass(&self, row: u32) -> f64 {
        self.masses[row as usize]
    }

    #[inline]
    pub fn context(&self, row: u32) -> &StateContext {
        &self.contexts[row as usize]
    }

    #[inline]
    pub fn gaussian(&self, row: u32) -> Option<&GaussianStats> {
        self.gaussians[row as usize].as_ref()
    }

    /// External id of a row.
    #[inline]
    pub fn external_id(&self, row: u32) -> u32 {
        self.ids.ids()[row as usize]
    }

    /// Row of an external id.
    #[inline]
    pub fn row_of(&self, id: u32) -> Option<u32> {
        self.ids.get(id)
    }

    /// External ids in row order.
    #[inline]
    pub fn ids(&self) -> &[u32] {
        self.ids.ids()
    }

    /// First external id lacking Gaussian statistics, if any.
    pub fn missing_gaussian(&self) -> Option<u32> {
        self.gaussians
            .iter()
            .position(Option::is_none)
            .map(|row| self.external_id(row as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::WordPosition;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn ctx() -> StateContext {
        StateContext::triphone(0, 1, 2, WordPosition::Internal)
    }

    #[test]
    fn test_push_assigns_dense_rows() {
        let mut corpus = StateCorpus::new(1, 2);
        assert_eq!(corpus.push(900, ctx(), array![[1.0, 3.0]]).unwrap(), 0);
        assert_eq!(corpus.push(12, ctx(), array![[2.0, 0.0]]).unwrap(), 1);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.row_of(12), Some(1));
        assert_eq!(corpus.external_id(0), 900);
        assert_eq!(corpus.mass(0), 4.0);
    }

    #[test]
    fn test_push_rejects_bad_input() {
        let mut corpus = StateCorpus::new(1, 2);
        corpus.push(1, ctx(), array![[1.0, 1.0]]).unwrap();

        assert_eq!(
            corpus.push(1, ctx(), array![[1.0, 1.0]]),
            Err(CorpusError::DuplicateId(1))
        );
        assert!(matches!(
            corpus.push(2, ctx(), array![[1.0, 1.0, 1.0]]),
            Err(CorpusError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            corpus.push(3, ctx(), array![[-1.0, 1.0]]),
            Err(CorpusError::InvalidCount { .. })
        ));
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_push_log_weights_normalizes() {
        let lm = LogMath::shared();
        let mut corpus = StateCorpus::new(1, 3);
        let weights = array![[lm.to_log(0.2), lm.to_log(0.2), MIN_LOG]];
        corpus.push_log_weights(5, ctx(), &weights, 10.0, lm).unwrap();

        let counts = corpus.counts(0);
        assert_abs_diff_eq!(counts[[0, 0]], 5.0, epsilon = 1e-2);
        assert_abs_diff_eq!(counts[[0, 1]], 5.0, epsilon = 1e-2);
        assert_eq!(counts[[0, 2]], 0.0);
        assert_eq!(corpus.mass(0), 10.0);
    }

    #[test]
    fn test_attach_gaussian() {
        let mut corpus = StateCorpus::new(1, 2);
        corpus.push(1, ctx(), array![[1.0, 1.0]]).unwrap();
        corpus.push(2, ctx(), array![[1.0, 1.0]]).unwrap();
        assert_eq!(corpus.missing_gaussian(), Some(1));

        let stats = GaussianStats::new(2.0, array![[0.0, 1.0]], array![[1.0, 1.0]]);
        corpus.attach_gaussian(1, stats.clone()).unwrap();
        assert_eq!(corpus.gaussian_dims(), Some(2));
        assert_eq!(corpus.missing_gaussian(), Some(2));
        assert_eq!(corpus.attach_gaussian(3, stats), Err(CorpusError::UnknownState(3)));

        let wrong = GaussianStats::new(1.0, array![[0.0]], array![[1.0]]);
        assert!(matches!(
            corpus.attach_gaussian(2, wrong),
            Err(CorpusError::GaussianMismatch { .. })
        ));
    }
}

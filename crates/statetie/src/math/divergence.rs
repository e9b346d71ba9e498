//! Entropy and divergence over categorical distributions.
//!
//! All quantities are in bits. Inputs are probability vectors; entries that
//! are zero (or negative) contribute nothing. The free functions use native
//! `f64` logarithms; [`LogMode`] selects between native and table-quantized
//! logarithms for the same kernels.

use serde::{Deserialize, Serialize};

use super::logmath::LogMath;

/// Probabilities at or below this value are treated as zero.
const PROB_EPSILON: f64 = 1e-300;

/// `0.5 * log2(2 * pi * e)`, the per-dimension constant of Gaussian entropy.
const HALF_LOG2_TWO_PI_E: f64 = 2.047_095_585_180_641;

/// How logarithms are evaluated inside the entropy kernels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMode {
    /// Native double-precision `log2`.
    #[default]
    Native,
    /// Quantized logarithms through the shared [`LogMath`] tables.
    Quantized,
}

impl LogMode {
    /// `log2(x)` under this mode.
    #[inline]
    pub fn log2(self, x: f64) -> f64 {
        match self {
            LogMode::Native => x.log2(),
            LogMode::Quantized => {
                let lm = LogMath::shared();
                lm.to_bits(lm.to_log(x))
            }
        }
    }

    /// Entropy of `p`.
    pub fn entropy(self, p: &[f64]) -> f64 {
        -p.iter()
            .filter(|&&pi| pi > PROB_EPSILON)
            .map(|&pi| pi * self.log2(pi))
            .sum::<f64>()
    }

    /// Directed divergence `D(p || q)`.
    ///
    /// Infinite when `p` puts mass where `q` has none.
    pub fn divergence(self, p: &[f64], q: &[f64]) -> f64 {
        debug_assert_eq!(p.len(), q.len());
        let mut total = 0.0;
        for (&pi, &qi) in p.iter().zip(q) {
            if pi <= PROB_EPSILON {
                continue;
            }
            if qi <= PROB_EPSILON {
                return f64::INFINITY;
            }
            total += pi * (self.log2(pi) - self.log2(qi));
        }
        total
    }

    /// Weighted entropy increase of forcing `a` and `b` onto `merged`.
    ///
    /// `a_mass * D(a || merged) + b_mass * D(b || merged)`. A side with zero
    /// mass contributes nothing.
    pub fn weighted_entropy_increase(
        self,
        a: &[f64],
        a_mass: f64,
        b: &[f64],
        b_mass: f64,
        merged: &[f64],
    ) -> f64 {
        let mut total = 0.0;
        if a_mass > 0.0 {
            total += a_mass * self.divergence(a, merged);
        }
        if b_mass > 0.0 {
            total += b_mass * self.divergence(b, merged);
        }
        total
    }
}

/// Entropy of `p` in bits.
#[inline]
pub fn entropy(p: &[f64]) -> f64 {
    LogMode::Native.entropy(p)
}

/// Directed (Kullback-Leibler) divergence `D(p || q)` in bits.
#[inline]
pub fn directed_divergence(p: &[f64], q: &[f64]) -> f64 {
    LogMode::Native.divergence(p, q)
}

/// `D(p || q) + D(q || p)`.
#[inline]
pub fn symmetric_divergence(p: &[f64], q: &[f64]) -> f64 {
    directed_divergence(p, q) + directed_divergence(q, p)
}

/// See [`LogMode::weighted_entropy_increase`].
#[inline]
pub fn weighted_entropy_increase(
    a: &[f64],
    a_mass: f64,
    b: &[f64],
    b_mass: f64,
    merged: &[f64],
) -> f64 {
    LogMode::Native.weighted_entropy_increase(a, a_mass, b, b_mass, merged)
}

/// Mass-weighted mixture of two distributions.
///
/// Returns all zeros when both masses are zero.
pub fn mixture(a: &[f64], a_mass: f64, b: &[f64], b_mass: f64) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    let total = a_mass + b_mass;
    if total <= 0.0 {
        return vec![0.0; a.len()];
    }
    a.iter()
        .zip(b)
        .map(|(&ai, &bi)| (a_mass * ai + b_mass * bi) / total)
        .collect()
}

/// Differential entropy (bits) of a diagonal Gaussian with variances `var`.
///
/// Additive over dimensions: `sum_d 0.5 * log2(2 * pi * e * var_d)`.
pub fn gaussian_entropy(var: &[f64]) -> f64 {
    var.iter()
        .map(|&v| HALF_LOG2_TWO_PI_E + 0.5 * v.log2())
        .sum()
}

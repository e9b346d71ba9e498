//! Fixed-point log-domain arithmetic.
//!
//! Probabilities are stored as integers `l = trunc(log_b(p))` for a base `b`
//! slightly above one (default `1.0001`). Truncation is toward zero, so for
//! `p < 1` the stored value rounds up. Multiplication becomes integer
//! addition; addition and subtraction use two precomputed correction tables:
//!
//! ```text
//! add[d] = round(log_b(1 + b^-d))
//! sub[d] = round(-log_b(1 - b^-d))
//! ```
//!
//! Both tables are sized to the first difference `d` at which the addition
//! correction rounds to zero (99 042 entries for the default base). Beyond that
//! the dominated operand is treated as exactly zero.
//!
//! [`MIN_LOG`] represents "effectively zero probability". Every operation
//! saturates at it instead of overflowing.

use std::sync::OnceLock;

/// Log value used for zero (and underflowing) probabilities.
pub const MIN_LOG: i32 = -(1 << 27);

/// Default logarithm base.
pub const DEFAULT_BASE: f64 = 1.0001;

/// Upper bound on the correction table length.
const MAX_TABLE_SIZE: usize = 1 << 24;

/// Errors raised while building log tables.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogMathError {
    #[error("log base must be finite and greater than 1, got {0}")]
    InvalidBase(f64),

    #[error("log base {base} needs a correction table of more than {max} entries")]
    TableTooLarge { base: f64, max: usize },
}

/// Quantized log-domain arithmetic with table-corrected addition.
///
/// Tables are immutable after construction. Use [`LogMath::shared`] for a
/// process-wide instance with the default base.
#[derive(Clone, Debug)]
pub struct LogMath {
    base: f64,
    ln_base: f64,
    add_table: Box<[i32]>,
    sub_table: Box<[i32]>,
}

impl LogMath {
    /// Build tables for `base`.
    pub fn with_base(base: f64) -> Result<Self, LogMathError> {
        if !base.is_finite() || base <= 1.0 {
            return Err(LogMathError::InvalidBase(base));
        }
        let ln_base = base.ln();

        let mut add_table = Vec::new();
        loop {
            let d = add_table.len() as f64;
            let correction = ((-d * ln_base).exp().ln_1p() / ln_base).round() as i32;
            add_table.push(correction);
            if correction == 0 {
                break;
            }
            if add_table.len() >= MAX_TABLE_SIZE {
                return Err(LogMathError::TableTooLarge { base, max: MAX_TABLE_SIZE });
            }
        }

        // sub[0] is never read: equal operands short-circuit to MIN_LOG.
        let sub_table: Vec<i32> = (0..add_table.len())
            .map(|d| {
                if d == 0 {
                    return i32::MAX;
                }
                let x = -(d as f64) * ln_base;
                let correction = -(-x.exp()).ln_1p() / ln_base;
                correction.round().min(i32::MAX as f64) as i32
            })
            .collect();

        Ok(Self {
            base,
            ln_base,
            add_table: add_table.into_boxed_slice(),
            sub_table: sub_table.into_boxed_slice(),
        })
    }

    /// Process-wide instance for [`DEFAULT_BASE`], built on first use.
    pub fn shared() -> &'static LogMath {
        static SHARED: OnceLock<LogMath> = OnceLock::new();
        SHARED.get_or_init(|| match LogMath::with_base(DEFAULT_BASE) {
            Ok(lm) => lm,
            Err(err) => unreachable!("default log base is valid: {err}"),
        })
    }

    #[inline]
    pub fn base(&self) -> f64 {
        self.base
    }

    /// Natural logarithm of the base (the size of one integer unit).
    #[inline]
    pub fn ln_base(&self) -> f64 {
        self.ln_base
    }

    /// Number of entries in each correction table.
    #[inline]
    pub fn table_size(&self) -> usize {
        self.add_table.len()
    }

    /// Convert a probability to the log domain. `x <= 0` maps to [`MIN_LOG`].
    #[inline]
    pub fn to_log(&self, x: f64) -> i32 {
        if x <= 0.0 || x.is_nan() {
            return MIN_LOG;
        }
        let l = x.ln() / self.ln_base;
        if l <= MIN_LOG as f64 {
            MIN_LOG
        } else {
            l as i32
        }
    }

    /// Convert a log value back to a probability.
    #[inline]
    pub fn from_log(&self, l: i32) -> f64 {
        if l <= MIN_LOG {
            0.0
        } else {
            (l as f64 * self.ln_base).exp()
        }
    }

    /// Log value expressed in bits (`log2` of the represented probability).
    #[inline]
    pub fn to_bits(&self, l: i32) -> f64 {
        l as f64 * self.ln_base / std::f64::consts::LN_2
    }

    /// Product of two probabilities.
    #[inline]
    pub fn multiply(&self, a: i32, b: i32) -> i32 {
        if a <= MIN_LOG || b <= MIN_LOG {
            return MIN_LOG;
        }
        saturate(a as i64 + b as i64)
    }

    /// Quotient `a / b`. Dividing by zero probability saturates to `i32::MAX`.
    #[inline]
    pub fn divide(&self, a: i32, b: i32) -> i32 {
        if a <= MIN_LOG {
            return MIN_LOG;
        }
        if b <= MIN_LOG {
            return i32::MAX;
        }
        saturate(a as i64 - b as i64)
    }

    /// Sum of two probabilities.
    #[inline]
    pub fn add(&self, a: i32, b: i32) -> i32 {
        let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
        if lo <= MIN_LOG {
            return hi;
        }
        let d = (hi as i64 - lo as i64) as usize;
        match self.add_table.get(d) {
            Some(&correction) => hi.saturating_add(correction),
            None => hi,
        }
    }

    /// Difference `a - b`. Yields [`MIN_LOG`] when `b >= a`.
    #[inline]
    pub fn subtract(&self, a: i32, b: i32) -> i32 {
        if a <= b {
            return MIN_LOG;
        }
        if b <= MIN_LOG {
            return a;
        }
        let d = (a as i64 - b as i64) as usize;
        match self.sub_table.get(d) {
            Some(&correction) => saturate(a as i64 - correction as i64),
            None => a,
        }
    }

    /// Sum of many probabilities.
    pub fn log_sum<I>(&self, values: I) -> i32
    where
        I: IntoIterator<Item = i32>,
    {
        values.into_iter().fold(MIN_LOG, |acc, v| self.add(acc, v))
    }
}

#[inline]
fn saturate(v: i64) -> i32 {
    v.clamp(MIN_LOG as i64, i32::MAX as i64) as i32
}

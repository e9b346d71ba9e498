//! Numeric kernels: quantized log arithmetic and entropy measures.

pub mod divergence;
pub mod logmath;

pub use divergence::{
    directed_divergence, entropy, gaussian_entropy, mixture, symmetric_divergence,
    weighted_entropy_increase, LogMode,
};
pub use logmath::{LogMath, LogMathError, DEFAULT_BASE, MIN_LOG};

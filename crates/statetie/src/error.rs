//! Errors raised before tree growth starts.

use crate::training::ConfigError;

/// Precondition failures of a clustering run.
///
/// Degenerate candidate splits and numeric edge cases are handled inside the
/// search and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("question set is empty")]
    EmptyQuestionSet,

    #[error("no states to cluster")]
    EmptyCorpus,

    #[error("expected {expected} stream weights, got {got}")]
    StreamWeightMismatch { expected: usize, got: usize },

    #[error("continuous densities requested but state {id} has no gaussian statistics")]
    MissingGaussian { id: u32 },

    #[error("state {0} is not in the corpus")]
    UnknownMember(u32),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

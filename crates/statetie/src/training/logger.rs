//! Growth logging.
//!
//! [`GrowthLogger`] filters messages by [`Verbosity`] and emits them as
//! `tracing` events, so the caller decides where they go by installing a
//! subscriber.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::repr::NodeId;

/// How much the grower reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    #[default]
    Silent,
    Warning,
    Info,
    Debug,
}

/// Why a node stopped growing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    TooFewMembers,
    NoImprovingSplit,
    BelowRelativeGain,
    MaxDepth,
    MaxLeaves,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::TooFewMembers => "too few members",
            StopReason::NoImprovingSplit => "no improving split",
            StopReason::BelowRelativeGain => "gain below relative threshold",
            StopReason::MaxDepth => "max depth reached",
            StopReason::MaxLeaves => "max leaves reached",
        }
    }
}

/// Verbosity-gated logger for tree growth.
#[derive(Clone, Copy, Debug)]
pub struct GrowthLogger {
    verbosity: Verbosity,
}

impl GrowthLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    pub fn log_start(&self, n_members: usize, n_questions: usize, root_entropy: f64) {
        if self.enabled(Verbosity::Info) {
            info!(n_members, n_questions, root_entropy, "growing tree");
        }
    }

    pub fn log_split(&self, node: NodeId, question: &str, gain: f64, n_left: usize, n_right: usize) {
        if self.enabled(Verbosity::Info) {
            info!(node, question, gain, n_left, n_right, "split");
        }
    }

    pub fn log_terminal(&self, node: NodeId, n_members: usize, reason: StopReason) {
        if self.enabled(Verbosity::Debug) {
            debug!(node, n_members, reason = reason.as_str(), "terminal");
        }
    }

    pub fn log_candidates(&self, node: NodeId, evaluated: usize, ranked: &[(String, f64)]) {
        if self.enabled(Verbosity::Debug) {
            debug!(node, evaluated, "candidates");
            for (rank, (question, gain)) in ranked.iter().enumerate() {
                debug!(node, rank, question = question.as_str(), gain, "candidate");
            }
        }
    }

    pub fn log_heuristic(&self, node: NodeId, n_terms: u32, n_relevant: usize) {
        if self.enabled(Verbosity::Debug) {
            debug!(node, n_terms, n_relevant, "combination count too large, using two-class split");
        }
    }

    pub fn log_finish(&self, n_nodes: usize, n_leaves: usize, total_entropy: f64) {
        if self.enabled(Verbosity::Info) {
            info!(n_nodes, n_leaves, total_entropy, "tree grown");
        }
    }

    pub fn log_unknown_phone(&self, line: usize, question: &str, phone: &str) {
        if self.enabled(Verbosity::Warning) {
            warn!(line, question, phone, "unknown phone skipped");
        }
    }

    pub fn log_empty_question(&self, line: usize, question: &str) {
        if self.enabled(Verbosity::Warning) {
            warn!(line, question, "question has no known phones, skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering() {
        assert!(Verbosity::Debug > Verbosity::Info);
        assert!(Verbosity::Info > Verbosity::Warning);
        assert!(Verbosity::Warning > Verbosity::Silent);
        assert_eq!(Verbosity::default(), Verbosity::Silent);
    }

    #[test]
    fn test_gating() {
        let logger = GrowthLogger::new(Verbosity::Info);
        assert!(logger.enabled(Verbosity::Warning));
        assert!(logger.enabled(Verbosity::Info));
        assert!(!logger.enabled(Verbosity::Debug));
        assert!(!GrowthLogger::new(Verbosity::Silent).enabled(Verbosity::Warning));
        // Emitting without a subscriber is a no-op.
        logger.log_split(0, "NASAL -1", 1.5, 2, 2);
        logger.log_terminal(1, 2, StopReason::NoImprovingSplit);
        logger.log_unknown_phone(3, "NASAL", "XX");
    }
}

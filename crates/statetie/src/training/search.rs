//! Best question search at a single node.
//!
//! For a node's members, every candidate question is turned into a member
//! bipartition and scored by the weighted entropy reduction it achieves:
//!
//! ```text
//! gain = W(node) - (W(yes) + W(no))
//! ```
//!
//! Candidates are unions of up to `max_question_terms` relevant atomic
//! questions, enumerated exhaustively while the total combination count stays
//! within `max_combinations`. Past that ceiling (or when configured to), a
//! cluster-membership question synthesized by [`TwoClassSplitter`] is scored
//! as well.
//!
//! Only the smaller side of each bipartition is accumulated; the larger side
//! is the parent density minus the smaller one.

use std::collections::HashSet;

use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};

use super::config::{ClusterConfig, GainParams};
use super::heap::{HeapOrder, HeapSelector};
use super::metric::Metric;
use super::two_class::{TwoClassParams, TwoClassSplitter};
use crate::data::{DensityMerger, NodeDensity, StateCorpus};
use crate::questions::{n_choose_r, Combinations, CompositeQuestion, Question, QuestionSet};
use crate::repr::NodeSeed;
use crate::utils::Parallelism;

// =============================================================================
// Parameters
// =============================================================================

/// Which kinds of candidate questions are scored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStrategy {
    /// Exhaustive composites, plus a two-class question when the combination
    /// ceiling is hit.
    #[default]
    Auto,
    /// Exhaustive composites only, truncated at the ceiling.
    AtomicOnly,
    /// Only the two-class question.
    TwoClassOnly,
}

/// Candidate enumeration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Largest number of atomic questions in one composite.
    pub max_question_terms: u32,
    /// Ceiling on the total number of enumerated composites per node.
    pub max_combinations: u64,
    /// Candidates retained for reporting. Only the best is committed.
    pub top_k: usize,
    pub strategy: QuestionStrategy,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_question_terms: 2,
            max_combinations: 10_000,
            top_k: 8,
            strategy: QuestionStrategy::Auto,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// The winning split of a node.
#[derive(Clone, Debug)]
pub struct SplitCandidate {
    pub question: Question,
    pub gain: f64,
    /// Members answering "yes".
    pub yes: NodeSeed,
    pub no: NodeSeed,
}

/// Everything a search produced.
#[derive(Clone, Debug, Default)]
pub struct SearchOutcome {
    /// Best split, if any candidate reached the minimum gain.
    pub best: Option<SplitCandidate>,
    /// Candidates producing a valid bipartition.
    pub evaluated: usize,
    /// Best `top_k` valid candidates, best first.
    pub ranked: Vec<(Question, f64)>,
    /// Atomic questions that split the members non-trivially.
    pub n_relevant: usize,
    /// Composite size at which the combination ceiling was hit.
    pub truncated_at: Option<u32>,
}

/// A candidate before scoring.
#[derive(Clone, Debug)]
enum Candidate {
    /// Positions into the relevant question list.
    Terms(Vec<u32>),
    /// Member positions answering "yes".
    Cluster(FixedBitSet),
}

/// A relevant atomic question and its member mask.
#[derive(Clone, Debug)]
struct Relevant {
    index: u32,
    mask: FixedBitSet,
}

// =============================================================================
// BestQuestionSearch
// =============================================================================

/// Scores candidate questions for a node's members.
#[derive(Clone, Copy, Debug)]
pub struct BestQuestionSearch<'a> {
    corpus: &'a StateCorpus,
    questions: &'a QuestionSet,
    metric: &'a Metric,
    params: &'a SearchParams,
    gain: &'a GainParams,
    two_class: &'a TwoClassParams,
    parallelism: Parallelism,
}

impl<'a> BestQuestionSearch<'a> {
    pub fn new(
        corpus: &'a StateCorpus,
        questions: &'a QuestionSet,
        metric: &'a Metric,
        config: &'a ClusterConfig,
        parallelism: Parallelism,
    ) -> Self {
        Self {
            corpus,
            questions,
            metric,
            params: &config.search,
            gain: &config.gain,
            two_class: &config.two_class,
            parallelism,
        }
    }

    /// Find the best split of the corpus `rows`.
    ///
    /// # Arguments
    /// * `rows` - Corpus rows of the node's members
    /// * `parent` - Accumulated density of `rows`
    /// * `parent_entropy` - Weighted entropy of `parent`
    pub fn search(&self, rows: &[u32], parent: &NodeDensity, parent_entropy: f64) -> SearchOutcome {
        let n = rows.len();
        let mut outcome = SearchOutcome::default();
        if n < 2 {
            return outcome;
        }

        let relevant = match self.params.strategy {
            QuestionStrategy::TwoClassOnly => Vec::new(),
            _ => self.relevant_questions(rows),
        };
        outcome.n_relevant = relevant.len();

        let mut candidates = Vec::new();
        let use_two_class = match self.params.strategy {
            QuestionStrategy::TwoClassOnly => true,
            QuestionStrategy::AtomicOnly | QuestionStrategy::Auto => {
                let (enumerated, truncated_at) = self.enumerate(relevant.len());
                candidates = enumerated;
                outcome.truncated_at = truncated_at;
                self.params.strategy == QuestionStrategy::Auto && truncated_at.is_some()
            }
        };
        if use_two_class {
            if let Some(mask) = self.two_class_mask(rows) {
                candidates.push(Candidate::Cluster(mask));
            }
        }

        let scores = self.parallelism.maybe_par_map(0..candidates.len(), |i| {
            let mask = self.mask(&candidates[i], &relevant, n);
            self.score(rows, &mask, parent, parent_entropy)
        });

        let mut heap = HeapSelector::bounded(HeapOrder::Max, self.params.top_k);
        for (ordinal, score) in scores.into_iter().enumerate() {
            if let Some(gain) = score {
                outcome.evaluated += 1;
                heap.push(gain, ordinal as u32);
            }
        }
        let ranked = heap.into_sorted_vec();
        outcome.ranked = ranked
            .iter()
            .map(|e| (self.question(&candidates[e.key as usize], &relevant, rows), e.score))
            .collect();

        let Some(top) = ranked.first() else {
            return outcome;
        };
        if !(top.score >= self.gain.min_gain) {
            return outcome;
        }

        let winner = &candidates[top.key as usize];
        let mask = self.mask(winner, &relevant, n);
        let (yes, no) = self.partition(rows, &mask);
        let gain = parent_entropy - (yes.weighted_entropy + no.weighted_entropy);
        outcome.best = Some(SplitCandidate {
            question: self.question(winner, &relevant, rows),
            gain,
            yes,
            no,
        });
        outcome
    }

    /// Atomic questions that split `rows` non-trivially, with duplicate
    /// bipartitions removed (the lowest index is kept).
    fn relevant_questions(&self, rows: &[u32]) -> Vec<Relevant> {
        let n = rows.len();
        let mut seen: HashSet<FixedBitSet> = HashSet::new();
        let mut out = Vec::new();
        for (index, question) in self.questions.iter().enumerate() {
            let mut mask = FixedBitSet::with_capacity(n);
            for (pos, &row) in rows.iter().enumerate() {
                if question.evaluate(self.corpus.context(row)) {
                    mask.insert(pos);
                }
            }
            let n_yes = mask.count_ones(..);
            if n_yes == 0 || n_yes == n {
                continue;
            }
            if seen.insert(mask.clone()) {
                out.push(Relevant { index: index as u32, mask });
            }
        }
        out
    }

    /// All composites of `1..=max_question_terms` relevant questions, in
    /// (size, lexicographic) order, while the running total stays within the
    /// ceiling. Also returns the size at which the ceiling was hit.
    fn enumerate(&self, n_relevant: usize) -> (Vec<Candidate>, Option<u32>) {
        let m = n_relevant as u32;
        let ceiling = self.params.max_combinations.min(u64::from(u32::MAX));
        let mut out = Vec::new();
        let mut total: u64 = 0;
        for r in 1..=self.params.max_question_terms.min(m) {
            let next = n_choose_r(u64::from(m), u64::from(r)).and_then(|c| total.checked_add(c));
            match next {
                Some(t) if t <= ceiling => {
                    total = t;
                    out.extend(Combinations::new(m, r).map(Candidate::Terms));
                }
                _ => return (out, Some(r)),
            }
        }
        (out, None)
    }

    fn two_class_mask(&self, rows: &[u32]) -> Option<FixedBitSet> {
        let merger = DensityMerger::new(self.corpus);
        let states: Vec<NodeDensity> = rows.iter().map(|&r| merger.state_density(r)).collect();
        let result = TwoClassSplitter::new(self.metric, self.two_class).split(&states)?;
        let mut mask = FixedBitSet::with_capacity(rows.len());
        for pos in result.class_a() {
            mask.insert(pos);
        }
        Some(mask)
    }

    fn mask(&self, candidate: &Candidate, relevant: &[Relevant], n: usize) -> FixedBitSet {
        match candidate {
            Candidate::Terms(terms) => {
                let mut mask = FixedBitSet::with_capacity(n);
                for &t in terms {
                    mask.union_with(&relevant[t as usize].mask);
                }
                mask
            }
            Candidate::Cluster(mask) => mask.clone(),
        }
    }

    fn question(&self, candidate: &Candidate, relevant: &[Relevant], rows: &[u32]) -> Question {
        match candidate {
            Candidate::Terms(terms) => Question::Composite(CompositeQuestion::new(
                terms.iter().map(|&t| relevant[t as usize].index).collect(),
            )),
            Candidate::Cluster(mask) => {
                Question::cluster(mask.ones().map(|p| self.corpus.external_id(rows[p])).collect())
            }
        }
    }

    /// Gain of the bipartition `mask`, or `None` if it is degenerate or
    /// violates the child constraints.
    fn score(
        &self,
        rows: &[u32],
        mask: &FixedBitSet,
        parent: &NodeDensity,
        parent_entropy: f64,
    ) -> Option<f64> {
        let n_yes = mask.count_ones(..);
        let n_no = rows.len() - n_yes;
        if n_yes == 0 || n_no == 0 {
            return None;
        }

        // The accumulated side depends only on the bipartition, never on which
        // side answers yes, so a question and its complement score identically.
        let merger = DensityMerger::new(self.corpus);
        let mut smaller = merger.empty();
        let yes_is_smaller = n_yes < n_no || (n_yes == n_no && !mask.contains(0));
        if yes_is_smaller {
            mask.ones().for_each(|p| merger.merge(&mut smaller, rows[p]));
        } else {
            mask.zeroes().for_each(|p| merger.merge(&mut smaller, rows[p]));
        }
        let mut larger = parent.clone();
        larger.subtract(&smaller);
        let (yes, no) = if yes_is_smaller { (smaller, larger) } else { (larger, smaller) };

        if !self.gain.is_valid_split(n_yes, n_no, yes.occupancy(), no.occupancy()) {
            return None;
        }
        let children = self.metric.weighted_entropy(&yes) + self.metric.weighted_entropy(&no);
        Some(parent_entropy - children)
    }

    /// Child seeds of the bipartition `mask`, accumulated directly.
    fn partition(&self, rows: &[u32], mask: &FixedBitSet) -> (NodeSeed, NodeSeed) {
        let n_yes = mask.count_ones(..);
        let mut yes = Vec::with_capacity(n_yes);
        let mut no = Vec::with_capacity(rows.len() - n_yes);
        for (pos, &row) in rows.iter().enumerate() {
            if mask.contains(pos) {
                yes.push(row);
            } else {
                no.push(row);
            }
        }
        (self.seed(&yes), self.seed(&no))
    }

    fn seed(&self, rows: &[u32]) -> NodeSeed {
        let density = DensityMerger::new(self.corpus).accumulate(rows);
        let weighted_entropy = self.metric.weighted_entropy(&density);
        NodeSeed {
            members: rows.iter().map(|&r| self.corpus.external_id(r)).collect(),
            density,
            weighted_entropy,
        }
    }
}

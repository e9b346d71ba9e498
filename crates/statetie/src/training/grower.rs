//! Top-down tree growth.
//!
//! Every node is searched once, when it is created; the resulting candidate
//! waits in a pending queue. Popping a candidate either commits its split
//! (creating two searched children) or marks the node terminal. The queue
//! order is set by [`GrowthStrategy`]: FIFO for the work-list, highest gain
//! first for best-first growth.

use std::collections::VecDeque;

use super::config::{ClusterConfig, DensityKind, GrowthStrategy};
use super::heap::{HeapOrder, HeapSelector};
use super::logger::{GrowthLogger, StopReason};
use super::metric::Metric;
use super::search::{BestQuestionSearch, QuestionStrategy, SplitCandidate};
use crate::data::{DensityMerger, StateCorpus};
use crate::error::ClusterError;
use crate::questions::QuestionSet;
use crate::repr::{ClusterTree, NodeId, NodeSeed, NodeState};
use crate::utils::{run_with_threads, Parallelism};

// =============================================================================
// Pending queue
// =============================================================================

/// A searched node awaiting a decision.
#[derive(Debug)]
struct NodeCandidate {
    node: NodeId,
    outcome: Result<SplitCandidate, StopReason>,
}

impl NodeCandidate {
    /// Queue priority: terminal nodes first, then by gain.
    fn priority(&self) -> f64 {
        match &self.outcome {
            Ok(split) => split.gain,
            Err(_) => f64::INFINITY,
        }
    }
}

enum Pending {
    WorkList(VecDeque<NodeCandidate>),
    BestFirst { heap: HeapSelector, slots: Vec<Option<NodeCandidate>> },
}

impl Pending {
    fn new(strategy: GrowthStrategy) -> Self {
        match strategy {
            GrowthStrategy::WorkList => Pending::WorkList(VecDeque::new()),
            GrowthStrategy::BestFirst => Pending::BestFirst {
                heap: HeapSelector::unbounded(HeapOrder::Max),
                slots: Vec::new(),
            },
        }
    }

    fn push(&mut self, candidate: NodeCandidate) {
        match self {
            Pending::WorkList(queue) => queue.push_back(candidate),
            Pending::BestFirst { heap, slots } => {
                let idx = candidate.node as usize;
                if slots.len() <= idx {
                    slots.resize_with(idx + 1, || None);
                }
                heap.push(candidate.priority(), candidate.node);
                slots[idx] = Some(candidate);
            }
        }
    }

    fn pop(&mut self) -> Option<NodeCandidate> {
        match self {
            Pending::WorkList(queue) => queue.pop_front(),
            Pending::BestFirst { heap, slots } => {
                let entry = heap.pop()?;
                slots.get_mut(entry.key as usize).and_then(Option::take)
            }
        }
    }
}

// =============================================================================
// TreeGrower
// =============================================================================

/// Grows a clustering tree over a corpus.
///
/// # Example
///
/// ```
/// use statetie::testing::{four_state_corpus, four_state_questions};
/// use statetie::training::{ClusterConfig, TreeGrower};
///
/// let corpus = four_state_corpus();
/// let questions = four_state_questions();
/// let grower = TreeGrower::new(&corpus, &questions, ClusterConfig::default()).unwrap();
/// let tree = grower.grow().unwrap();
/// assert_eq!(tree.clusters(), vec![vec![0, 1], vec![2, 3]]);
/// ```
pub struct TreeGrower<'a> {
    corpus: &'a StateCorpus,
    questions: &'a QuestionSet,
    config: ClusterConfig,
    metric: Metric,
    logger: GrowthLogger,
}

impl<'a> TreeGrower<'a> {
    /// Validate inputs and prepare a grower.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration, an empty question set or corpus,
    /// stream weights that do not match the corpus, or missing Gaussian
    /// statistics in continuous mode.
    pub fn new(
        corpus: &'a StateCorpus,
        questions: &'a QuestionSet,
        config: ClusterConfig,
    ) -> Result<Self, ClusterError> {
        config.validate()?;
        if questions.is_empty() {
            return Err(ClusterError::EmptyQuestionSet);
        }
        if corpus.is_empty() {
            return Err(ClusterError::EmptyCorpus);
        }
        if let Some(weights) = &config.stream_weights {
            if weights.len() != corpus.n_streams() {
                return Err(ClusterError::StreamWeightMismatch {
                    expected: corpus.n_streams(),
                    got: weights.len(),
                });
            }
        }
        if config.density == DensityKind::Continuous {
            if let Some(id) = corpus.missing_gaussian() {
                return Err(ClusterError::MissingGaussian { id });
            }
        }

        let metric = Metric::from_config(&config, corpus.n_streams());
        let logger = GrowthLogger::new(config.verbosity);
        Ok(Self { corpus, questions, config, metric, logger })
    }

    #[inline]
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    #[inline]
    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    /// Grow a tree over every state in the corpus.
    pub fn grow(&self) -> Result<ClusterTree, ClusterError> {
        let rows: Vec<u32> = (0..self.corpus.len() as u32).collect();
        self.grow_rows(rows)
    }

    /// Grow a tree over a subset of states, given by external id.
    ///
    /// Duplicate ids are ignored.
    pub fn grow_members(&self, ids: &[u32]) -> Result<ClusterTree, ClusterError> {
        let mut rows = ids
            .iter()
            .map(|&id| self.corpus.row_of(id).ok_or(ClusterError::UnknownMember(id)))
            .collect::<Result<Vec<u32>, _>>()?;
        rows.sort_unstable();
        rows.dedup();
        if rows.is_empty() {
            return Err(ClusterError::EmptyCorpus);
        }
        self.grow_rows(rows)
    }

    fn grow_rows(&self, rows: Vec<u32>) -> Result<ClusterTree, ClusterError> {
        let tree = run_with_threads(self.config.n_threads, |parallelism| {
            self.grow_with(&rows, parallelism)
        })?;
        Ok(tree)
    }

    fn grow_with(&self, rows: &[u32], parallelism: Parallelism) -> ClusterTree {
        let search =
            BestQuestionSearch::new(self.corpus, self.questions, &self.metric, &self.config, parallelism);

        let density = DensityMerger::new(self.corpus).accumulate(rows);
        let weighted_entropy = self.metric.weighted_entropy(&density);
        let members = rows.iter().map(|&r| self.corpus.external_id(r)).collect();
        let mut tree = ClusterTree::new(NodeSeed { members, density, weighted_entropy });
        self.logger.log_start(rows.len(), self.questions.len(), weighted_entropy);

        let mut pending = Pending::new(self.config.growth);
        let root = tree.root();
        pending.push(self.evaluate(&mut tree, &search, root));
        let mut n_leaves = 1usize;

        while let Some(candidate) = pending.pop() {
            let node = candidate.node;
            let split = match candidate.outcome {
                Ok(split) => split,
                Err(reason) => {
                    self.make_terminal(&mut tree, node, reason);
                    continue;
                }
            };
            if self.config.max_leaves.is_some_and(|max| n_leaves >= max as usize) {
                self.make_terminal(&mut tree, node, StopReason::MaxLeaves);
                continue;
            }

            let SplitCandidate { question, gain, yes, no } = split;
            self.logger.log_split(
                node,
                &question.describe(self.questions),
                gain,
                yes.members.len(),
                no.members.len(),
            );
            let (yes_id, no_id) = tree.split(node, question, gain, yes, no);
            n_leaves += 1;

            pending.push(self.evaluate(&mut tree, &search, yes_id));
            pending.push(self.evaluate(&mut tree, &search, no_id));
        }

        self.logger.log_finish(tree.n_nodes(), n_leaves, tree.total_leaf_entropy());
        tree
    }

    /// Search a freshly created node.
    fn evaluate(
        &self,
        tree: &mut ClusterTree,
        search: &BestQuestionSearch<'_>,
        node: NodeId,
    ) -> NodeCandidate {
        let stop = |reason| NodeCandidate { node, outcome: Err(reason) };

        let stats = tree.node(node);
        let min_leaf = (self.config.gain.min_leaf_size as usize).max(1);
        if stats.members().len() < 2 * min_leaf {
            return stop(StopReason::TooFewMembers);
        }
        if self.config.max_depth.is_some_and(|max| stats.depth() >= max) {
            return stop(StopReason::MaxDepth);
        }

        tree.set_state(node, NodeState::Searching);
        let stats = tree.node(node);
        let rows: Vec<u32> = stats.members().iter().filter_map(|&id| self.corpus.row_of(id)).collect();
        let outcome = search.search(&rows, stats.density(), stats.weighted_entropy());

        if let Some(n_terms) = outcome.truncated_at {
            if self.config.search.strategy == QuestionStrategy::Auto {
                self.logger.log_heuristic(node, n_terms, outcome.n_relevant);
            }
        }
        let ranked: Vec<(String, f64)> = outcome
            .ranked
            .iter()
            .map(|(q, gain)| (q.describe(self.questions), *gain))
            .collect();
        self.logger.log_candidates(node, outcome.evaluated, &ranked);

        match outcome.best {
            None => stop(StopReason::NoImprovingSplit),
            Some(split) => match self.config.gain.relative_gain {
                Some(r) if split.gain < r * stats.weighted_entropy() => {
                    stop(StopReason::BelowRelativeGain)
                }
                _ => NodeCandidate { node, outcome: Ok(split) },
            },
        }
    }

    fn make_terminal(&self, tree: &mut ClusterTree, node: NodeId, reason: StopReason) {
        tree.set_state(node, NodeState::Terminal);
        self.logger.log_terminal(node, tree.node(node).members().len(), reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{four_state_corpus, four_state_questions, random_corpus, random_questions};
    use crate::training::GainParams;

    #[test]
    fn test_four_states_make_two_leaves() {
        let corpus = four_state_corpus();
        let questions = four_state_questions();
        let tree = TreeGrower::new(&corpus, &questions, ClusterConfig::default())
            .unwrap()
            .grow()
            .unwrap();
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.clusters(), vec![vec![0, 1], vec![2, 3]]);
        for leaf in tree.leaves() {
            assert_eq!(tree.node(leaf).state(), NodeState::Terminal);
        }
        assert_eq!(tree.node(0).state(), NodeState::Split);
    }

    #[test]
    fn test_validation_errors() {
        let corpus = four_state_corpus();
        let questions = four_state_questions();

        let empty = QuestionSet::new(Vec::new());
        assert!(matches!(
            TreeGrower::new(&corpus, &empty, ClusterConfig::default()),
            Err(ClusterError::EmptyQuestionSet)
        ));

        let no_states = StateCorpus::new(1, 4);
        assert!(matches!(
            TreeGrower::new(&no_states, &questions, ClusterConfig::default()),
            Err(ClusterError::EmptyCorpus)
        ));

        let config = ClusterConfig { stream_weights: Some(vec![1.0, 1.0]), ..Default::default() };
        assert!(matches!(
            TreeGrower::new(&corpus, &questions, config),
            Err(ClusterError::StreamWeightMismatch { expected: 1, got: 2 })
        ));

        let config = ClusterConfig {
            gain: GainParams { min_gain: 0.0, ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(
            TreeGrower::new(&corpus, &questions, config),
            Err(ClusterError::Config(_))
        ));

        let config = ClusterConfig { density: DensityKind::Continuous, ..Default::default() };
        assert!(matches!(
            TreeGrower::new(&corpus, &questions, config),
            Err(ClusterError::MissingGaussian { .. })
        ));
    }

    #[test]
    fn test_unknown_member() {
        let corpus = four_state_corpus();
        let questions = four_state_questions();
        let grower = TreeGrower::new(&corpus, &questions, ClusterConfig::default()).unwrap();
        assert!(matches!(grower.grow_members(&[0, 99]), Err(ClusterError::UnknownMember(99))));
        assert!(matches!(grower.grow_members(&[]), Err(ClusterError::EmptyCorpus)));
    }

    #[test]
    fn test_caps_limit_growth() {
        let corpus = random_corpus(80, 1, 8, 10, 7);
        let questions = random_questions(10, 24, 9);

        let config = ClusterConfig::builder()
            .growth(GrowthStrategy::BestFirst)
            .max_leaves(4)
            .build()
            .unwrap();
        let tree = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();
        assert!(tree.n_leaves() <= 4);

        let config = ClusterConfig::builder().max_depth(1).build().unwrap();
        let tree = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();
        assert!(tree.max_depth() <= 1);
        assert!(tree.n_leaves() <= 2);
    }

    #[test]
    fn test_best_first_reaches_same_partition_without_cap() {
        let corpus = random_corpus(50, 1, 6, 8, 21);
        let questions = random_questions(8, 16, 22);
        let work_list = TreeGrower::new(&corpus, &questions, ClusterConfig::default())
            .unwrap()
            .grow()
            .unwrap();
        let config = ClusterConfig { growth: GrowthStrategy::BestFirst, ..Default::default() };
        let best_first = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();

        let mut a = work_list.clusters();
        let mut b = best_first.clusters();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_relative_gain_stops_early() {
        let corpus = random_corpus(60, 1, 6, 8, 4);
        let questions = random_questions(8, 16, 5);
        let baseline = TreeGrower::new(&corpus, &questions, ClusterConfig::default())
            .unwrap()
            .grow()
            .unwrap();
        let config = ClusterConfig {
            gain: GainParams { relative_gain: Some(0.5), ..Default::default() },
            ..Default::default()
        };
        let strict = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();
        assert!(strict.n_leaves() <= baseline.n_leaves());
    }

    #[test]
    fn test_parallel_growth_matches_sequential() {
        let corpus = random_corpus(60, 2, 6, 8, 31);
        let questions = random_questions(8, 16, 32);
        let seq = TreeGrower::new(&corpus, &questions, ClusterConfig::default())
            .unwrap()
            .grow()
            .unwrap();
        let config = ClusterConfig { n_threads: 2, ..Default::default() };
        let par = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();
        assert_eq!(seq.assignments(), par.assignments());
    }
}

//! Two-way clustering of a node's members.
//!
//! When exhaustive question search is too expensive, the members of a node are
//! split directly: two centroids are seeded, then every member is assigned to
//! the centroid whose merge cost is lower and centroids are recomputed from
//! their members, until assignments stop changing or the iteration cap is
//! reached. The result is a local optimum.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::metric::Metric;
use crate::data::NodeDensity;

/// How the two initial centroids are chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// The pair of members with the largest merge cost (lowest pair on ties).
    #[default]
    Extremes,
    /// Members at these positions, taken modulo the member count.
    Fixed(u32, u32),
    /// Two distinct members drawn from a seeded generator.
    Random { seed: u64 },
}

/// Two-class splitter parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoClassParams {
    pub seed: SeedPolicy,
    /// Maximum reassignment rounds. Reaching it is not an error.
    pub max_iterations: u32,
}

impl Default for TwoClassParams {
    fn default() -> Self {
        Self { seed: SeedPolicy::Extremes, max_iterations: 50 }
    }
}

/// Outcome of a two-class split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TwoClassResult {
    /// `true` for members assigned to class A, by position.
    pub in_class_a: Vec<bool>,
    /// Reassignment rounds performed.
    pub iterations: u32,
    /// Whether assignments stopped changing before the cap.
    pub converged: bool,
}

impl TwoClassResult {
    /// Positions of class A members.
    pub fn class_a(&self) -> impl Iterator<Item = usize> + '_ {
        self.in_class_a.iter().enumerate().filter(|(_, &a)| a).map(|(i, _)| i)
    }
}

/// Iterative two-way splitter.
#[derive(Clone, Copy, Debug)]
pub struct TwoClassSplitter<'a> {
    metric: &'a Metric,
    params: &'a TwoClassParams,
}

impl<'a> TwoClassSplitter<'a> {
    pub fn new(metric: &'a Metric, params: &'a TwoClassParams) -> Self {
        Self { metric, params }
    }

    /// Split `items` into two non-empty classes. `None` for fewer than two items.
    pub fn split(&self, items: &[NodeDensity]) -> Option<TwoClassResult> {
        let n = items.len();
        if n < 2 {
            return None;
        }

        let (a, b) = self.seeds(items);
        let mut centroids = [items[a].clone(), items[b].clone()];
        let mut assignment: Vec<bool> = Vec::new();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.params.max_iterations {
            iterations += 1;

            let mut next: Vec<bool> = items
                .iter()
                .map(|item| {
                    let cost_a = self.metric.merge_cost(&centroids[0], item);
                    let cost_b = self.metric.merge_cost(&centroids[1], item);
                    cost_a <= cost_b
                })
                .collect();
            self.reseed_empty_class(items, &mut next);

            let changed = next != assignment;
            assignment = next;
            centroids = self.centroids(items, &assignment);
            if !changed {
                converged = true;
                break;
            }
        }

        Some(TwoClassResult { in_class_a: assignment, iterations, converged })
    }

    fn seeds(&self, items: &[NodeDensity]) -> (usize, usize) {
        let n = items.len();
        match self.params.seed {
            SeedPolicy::Fixed(i, j) => (i as usize % n, j as usize % n),
            SeedPolicy::Random { seed } => {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
                let i = rng.gen_range(0..n);
                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                (i, j)
            }
            SeedPolicy::Extremes => {
                let mut best = (0, 1);
                let mut best_cost = f64::NEG_INFINITY;
                for i in 0..n {
                    for j in i + 1..n {
                        let cost = self.metric.merge_cost(&items[i], &items[j]);
                        if cost > best_cost {
                            best_cost = cost;
                            best = (i, j);
                        }
                    }
                }
                best
            }
        }
    }

    /// Move the member farthest from the occupied class into an empty one.
    fn reseed_empty_class(&self, items: &[NodeDensity], assignment: &mut [bool]) {
        let n_a = assignment.iter().filter(|&&a| a).count();
        let empty_is_a = match n_a {
            0 => true,
            n if n == assignment.len() => false,
            _ => return,
        };
        let [a, b] = self.centroids(items, assignment);
        let occupied = if empty_is_a { b } else { a };

        let mut farthest = 0;
        let mut farthest_cost = f64::NEG_INFINITY;
        for (i, item) in items.iter().enumerate() {
            let cost = self.metric.merge_cost(&occupied, item);
            if cost > farthest_cost {
                farthest_cost = cost;
                farthest = i;
            }
        }
        assignment[farthest] = empty_is_a;
    }

    /// `[class A centroid, class B centroid]`.
    fn centroids(&self, items: &[NodeDensity], assignment: &[bool]) -> [NodeDensity; 2] {
        let mut a = items[0].empty_like();
        let mut b = items[0].empty_like();
        for (item, &in_a) in items.iter().zip(assignment) {
            if in_a {
                a.merge(item);
            } else {
                b.merge(item);
            }
        }
        [a, b]
    }
}

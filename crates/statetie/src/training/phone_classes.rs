//! Phone-class questions derived from a corpus.
//!
//! Every base phone is summarized by the merged density of the states it is
//! the base phone of. Phones are then clustered bottom up: the pair of classes
//! whose merge raises weighted entropy the least is joined until one class is
//! left. Each intermediate class becomes a phone-set question, asked at every
//! configured context offset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::metric::Metric;
use crate::data::{DensityMerger, NodeDensity, StateCorpus};
use crate::questions::{AtomicQuestion, QuestionError, QuestionSet};

/// Parameters of [`PhoneClassBuilder`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneClassParams {
    /// Context offsets each class is asked about.
    pub offsets: Vec<i32>,
    /// Also emit the negation of every question.
    pub negations: bool,
    /// Keep only the coarsest classes. `None` keeps every class.
    pub max_classes: Option<usize>,
    /// Question names are `{prefix}{k}`.
    pub prefix: String,
}

impl Default for PhoneClassParams {
    fn default() -> Self {
        Self { offsets: vec![-1, 1], negations: true, max_classes: None, prefix: "CLASS".into() }
    }
}

/// Agglomerative clustering of base phones into question classes.
pub struct PhoneClassBuilder<'a> {
    corpus: &'a StateCorpus,
    metric: &'a Metric,
    params: PhoneClassParams,
}

impl<'a> PhoneClassBuilder<'a> {
    pub fn new(corpus: &'a StateCorpus, metric: &'a Metric, params: PhoneClassParams) -> Self {
        Self { corpus, metric, params }
    }

    /// Merged density of the states of each base phone.
    pub fn phone_densities(&self) -> BTreeMap<u32, NodeDensity> {
        let merger = DensityMerger::new(self.corpus);
        let mut out: BTreeMap<u32, NodeDensity> = BTreeMap::new();
        for row in 0..self.corpus.len() as u32 {
            let Some(phone) = self.corpus.context(row).phone_at(0) else {
                continue;
            };
            let acc = out.entry(phone).or_insert_with(|| merger.empty());
            merger.merge(acc, row);
        }
        out
    }

    /// Classes in merge order, finest first. Each class is sorted; the final
    /// class holding every phone is omitted.
    pub fn classes(&self) -> Vec<Vec<u32>> {
        let mut clusters: Vec<(Vec<u32>, NodeDensity)> = self
            .phone_densities()
            .into_iter()
            .map(|(phone, density)| (vec![phone], density))
            .collect();

        let mut out = Vec::new();
        while clusters.len() > 2 {
            let (i, j) = self.closest_pair(&clusters);
            let (phones, density) = clusters.remove(j);
            let target = &mut clusters[i];
            target.0.extend(phones);
            target.0.sort_unstable();
            target.1.merge(&density);
            out.push(target.0.clone());
        }
        out
    }

    /// Question set over [`classes`](Self::classes).
    ///
    /// # Errors
    ///
    /// [`QuestionError::NoOffsets`] when no context offset is configured.
    pub fn build(&self) -> Result<QuestionSet, QuestionError> {
        if self.params.offsets.is_empty() {
            return Err(QuestionError::NoOffsets);
        }
        let mut classes = self.classes();
        if let Some(max) = self.params.max_classes {
            let skip = classes.len().saturating_sub(max);
            classes.drain(..skip);
        }

        let mut questions = QuestionSet::default();
        for (k, class) in classes.iter().enumerate() {
            let name = format!("{}{k}", self.params.prefix);
            for &offset in &self.params.offsets {
                let question =
                    AtomicQuestion::membership(name.as_str(), offset, class.iter().copied());
                let negated = self.params.negations.then(|| question.negate());
                questions.push(question);
                if let Some(negated) = negated {
                    questions.push(negated);
                }
            }
        }
        Ok(questions)
    }

    /// Cheapest pair to merge; ties go to the lowest pair.
    fn closest_pair(&self, clusters: &[(Vec<u32>, NodeDensity)]) -> (usize, usize) {
        let mut best = (0, 1);
        let mut best_cost = f64::INFINITY;
        for i in 0..clusters.len() {
            for j in i + 1..clusters.len() {
                let cost = self.metric.merge_cost(&clusters[i].1, &clusters[j].1);
                if cost < best_cost {
                    best_cost = cost;
                    best = (i, j);
                }
            }
        }
        best
    }
}

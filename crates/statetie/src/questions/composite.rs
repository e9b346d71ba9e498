//! Composite and synthesized questions.
//!
//! A [`CompositeQuestion`] is the union of one or more atomic questions: it
//! answers "yes" when any constituent does. A [`Question`] is what the tree
//! commits at a split, either a composite or a cluster membership produced by
//! two-class splitting.

use std::fmt;

use super::atomic::AtomicQuestion;
use super::set::QuestionSet;
use crate::data::StateContext;

/// Ordered, de-duplicated set of atomic question indices.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeQuestion {
    terms: Vec<u32>,
}

impl CompositeQuestion {
    /// Sorts and de-duplicates `terms`.
    pub fn new(mut terms: Vec<u32>) -> Self {
        terms.sort_unstable();
        terms.dedup();
        Self { terms }
    }

    pub fn single(term: u32) -> Self {
        Self { terms: vec![term] }
    }

    #[inline]
    pub fn terms(&self) -> &[u32] {
        &self.terms
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Union of the constituent answers. Unknown indices answer "no".
    pub fn evaluate(&self, questions: &QuestionSet, context: &StateContext) -> bool {
        self.atoms(questions).any(|q| q.evaluate(context))
    }

    fn atoms<'a>(&'a self, questions: &'a QuestionSet) -> impl Iterator<Item = &'a AtomicQuestion> {
        self.terms.iter().filter_map(move |&t| questions.get(t))
    }

    /// Human-readable form, e.g. `NASAL -1 | STOP +1`.
    pub fn describe(&self, questions: &QuestionSet) -> String {
        self.terms
            .iter()
            .map(|&t| match questions.get(t) {
                Some(q) => q.to_string(),
                None => format!("#{t}"),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// A split question committed to the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Question {
    /// Union of atomic questions.
    Composite(CompositeQuestion),
    /// Membership in an explicit set of external state ids (sorted).
    Cluster(Vec<u32>),
}

impl Question {
    /// Cluster membership question; `members` are sorted and de-duplicated.
    pub fn cluster(mut members: Vec<u32>) -> Self {
        members.sort_unstable();
        members.dedup();
        Question::Cluster(members)
    }

    /// Answer for the state `id` with `context`.
    pub fn evaluate(&self, questions: &QuestionSet, id: u32, context: &StateContext) -> bool {
        match self {
            Question::Composite(c) => c.evaluate(questions, context),
            Question::Cluster(members) => members.binary_search(&id).is_ok(),
        }
    }

    pub fn describe(&self, questions: &QuestionSet) -> String {
        match self {
            Question::Composite(c) => c.describe(questions),
            Question::Cluster(members) => ClusterLabel(members).to_string(),
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Question::Composite(c) => {
                let terms: Vec<String> = c.terms.iter().map(|t| format!("#{t}")).collect();
                f.write_str(&terms.join(" | "))
            }
            Question::Cluster(members) => ClusterLabel(members).fmt(f),
        }
    }
}

struct ClusterLabel<'a>(&'a [u32]);

impl fmt::Display for ClusterLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CLUSTER{{")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str("}")
    }
}

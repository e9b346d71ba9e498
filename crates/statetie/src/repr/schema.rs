//! Serialization schema for clustering trees.
//!
//! Schema types are kept apart from the runtime arena so the stored format
//! can be validated on load and evolve on its own. Trees are written as JSON
//! through `serde_json`.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::tree::{ClusterTree, NodeState, NodeStats, NO_NODE};
use crate::data::{DistributionVector, GaussianAccumulator, NodeDensity};
use crate::questions::{CompositeQuestion, Question, QuestionSet};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors raised while reading a stored tree.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema version {0}")]
    Version(u32),

    #[error("invalid tree: {0}")]
    Validation(String),
}

/// Committed question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionSchema {
    Composite {
        /// Atomic question indices.
        terms: Vec<u32>,
        /// Readable form, informational only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Cluster {
        members: Vec<u32>,
    },
}

/// One stream's distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSchema {
    pub counts: Vec<f64>,
    pub mass: f64,
}

/// Gaussian sufficient statistics, `[n_streams][dim]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianSchema {
    pub occupancy: f64,
    pub sum: Vec<Vec<f64>>,
    pub sum_sq: Vec<Vec<f64>>,
}

/// Node density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensitySchema {
    pub streams: Vec<StreamSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaussian: Option<GaussianSchema>,
}

/// One tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    pub members: Vec<u32>,
    pub weighted_entropy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    /// `[yes, no]` child ids for split nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionSchema>,
    #[serde(default)]
    pub gain: f64,
    pub depth: u32,
    pub state: NodeState,
    pub density: DensitySchema,
}

/// A whole tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSchema {
    pub version: u32,
    pub num_nodes: u32,
    pub nodes: Vec<NodeSchema>,
}

impl TreeSchema {
    /// Schema of `tree`; composite questions get readable text when
    /// `questions` is given.
    pub fn from_tree(tree: &ClusterTree, questions: Option<&QuestionSet>) -> Self {
        let nodes = tree
            .nodes()
            .iter()
            .map(|node| NodeSchema {
                members: node.members().to_vec(),
                weighted_entropy: node.weighted_entropy(),
                parent: node.parent(),
                children: node.children().map(|(yes, no)| [yes, no]),
                question: node.question().map(|q| question_schema(q, questions)),
                gain: node.gain(),
                depth: node.depth(),
                state: node.state(),
                density: density_schema(node.density()),
            })
            .collect::<Vec<_>>();
        Self { version: SCHEMA_VERSION, num_nodes: nodes.len() as u32, nodes }
    }

    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl From<&ClusterTree> for TreeSchema {
    fn from(tree: &ClusterTree) -> Self {
        Self::from_tree(tree, None)
    }
}

impl TryFrom<TreeSchema> for ClusterTree {
    type Error = SchemaError;

    fn try_from(schema: TreeSchema) -> Result<Self, Self::Error> {
        if schema.version != SCHEMA_VERSION {
            return Err(SchemaError::Version(schema.version));
        }
        let n = schema.nodes.len();
        if n == 0 || schema.num_nodes as usize != n {
            return Err(SchemaError::Validation(format!(
                "num_nodes is {} but {} nodes are stored",
                schema.num_nodes, n
            )));
        }
        validate_links(&schema.nodes)?;

        let nodes = schema
            .nodes
            .into_iter()
            .map(|node| {
                let (left, right) = node.children.map_or((NO_NODE, NO_NODE), |[yes, no]| (yes, no));
                let question = node.question.map(|q| match q {
                    QuestionSchema::Composite { terms, .. } => {
                        Question::Composite(CompositeQuestion::new(terms))
                    }
                    QuestionSchema::Cluster { members } => Question::cluster(members),
                });
                let mut members = node.members;
                members.sort_unstable();
                Ok(NodeStats {
                    members,
                    density: density_from_schema(node.density)?,
                    weighted_entropy: node.weighted_entropy,
                    parent: node.parent.unwrap_or(NO_NODE),
                    left,
                    right,
                    question,
                    gain: node.gain,
                    depth: node.depth,
                    state: node.state,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(ClusterTree::from_nodes(nodes))
    }
}

impl ClusterTree {
    /// JSON form of the tree.
    pub fn to_json(&self, questions: Option<&QuestionSet>) -> Result<String, SchemaError> {
        TreeSchema::from_tree(self, questions).to_json()
    }

    /// Read a tree written by [`to_json`](Self::to_json).
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        ClusterTree::try_from(TreeSchema::from_json(text)?)
    }
}

// =============================================================================
// Conversion helpers
// =============================================================================

fn question_schema(question: &Question, questions: Option<&QuestionSet>) -> QuestionSchema {
    match question {
        Question::Composite(c) => QuestionSchema::Composite {
            terms: c.terms().to_vec(),
            text: questions.map(|qs| c.describe(qs)),
        },
        Question::Cluster(members) => QuestionSchema::Cluster { members: members.clone() },
    }
}

fn density_schema(density: &NodeDensity) -> DensitySchema {
    DensitySchema {
        streams: density
            .streams()
            .iter()
            .map(|s| StreamSchema { counts: s.values().to_vec(), mass: s.mass() })
            .collect(),
        gaussian: density.gaussian().map(|g| {
            let (sum, sum_sq) = g.sums();
            GaussianSchema {
                occupancy: g.occupancy(),
                sum: sum.outer_iter().map(|r| r.to_vec()).collect(),
                sum_sq: sum_sq.outer_iter().map(|r| r.to_vec()).collect(),
            }
        }),
    }
}

fn density_from_schema(schema: DensitySchema) -> Result<NodeDensity, SchemaError> {
    let streams = schema
        .streams
        .into_iter()
        .map(|s| DistributionVector::with_mass(Array1::from(s.counts), s.mass))
        .collect();
    let gaussian = schema
        .gaussian
        .map(|g| {
            Ok::<_, SchemaError>(GaussianAccumulator::from_sums(
                g.occupancy,
                matrix(g.sum)?,
                matrix(g.sum_sq)?,
            ))
        })
        .transpose()?;
    Ok(NodeDensity::new(streams, gaussian))
}

fn matrix(rows: Vec<Vec<f64>>) -> Result<Array2<f64>, SchemaError> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| SchemaError::Validation(format!("ragged gaussian statistics: {e}")))
}

fn validate_links(nodes: &[NodeSchema]) -> Result<(), SchemaError> {
    let n = nodes.len() as u32;
    if nodes[0].parent.is_some() {
        return Err(SchemaError::Validation("root has a parent".into()));
    }
    for (id, node) in nodes.iter().enumerate() {
        let id = id as u32;
        match (node.children, &node.question) {
            (Some([yes, no]), Some(_)) => {
                for child in [yes, no] {
                    if child >= n || child == id {
                        return Err(SchemaError::Validation(format!(
                            "node {id}: child {child} out of range"
                        )));
                    }
                    if nodes[child as usize].parent != Some(id) {
                        return Err(SchemaError::Validation(format!(
                            "node {child}: parent does not point back to {id}"
                        )));
                    }
                }
                let n_children =
                    nodes[yes as usize].members.len() + nodes[no as usize].members.len();
                if n_children != node.members.len() {
                    return Err(SchemaError::Validation(format!(
                        "node {id}: children do not partition its members"
                    )));
                }
            }
            (None, None) => {}
            _ => {
                return Err(SchemaError::Validation(format!(
                    "node {id}: question and children must be present together"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{four_state_corpus, four_state_questions};
    use crate::training::{ClusterConfig, TreeGrower};

    fn grown() -> ClusterTree {
        let corpus = four_state_corpus();
        let questions = four_state_questions();
        TreeGrower::new(&corpus, &questions, ClusterConfig::default())
            .unwrap()
            .grow()
            .unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let tree = grown();
        let questions = four_state_questions();
        let json = tree.to_json(Some(&questions)).unwrap();
        assert!(json.contains("\"type\":\"composite\""));

        let restored = ClusterTree::from_json(&json).unwrap();
        assert_eq!(restored.n_nodes(), tree.n_nodes());
        assert_eq!(restored.assignments(), tree.assignments());
        assert_eq!(restored.node(0).question(), tree.node(0).question());
        for id in 0..tree.n_nodes() as u32 {
            assert_eq!(restored.node(id).members(), tree.node(id).members());
            assert_eq!(restored.node(id).state(), tree.node(id).state());
        }
    }

    #[test]
    fn test_rejects_broken_links() {
        let mut schema = TreeSchema::from(&grown());
        schema.nodes[1].parent = Some(2);
        assert!(matches!(ClusterTree::try_from(schema), Err(SchemaError::Validation(_))));

        let mut schema = TreeSchema::from(&grown());
        schema.nodes[0].question = None;
        assert!(matches!(ClusterTree::try_from(schema), Err(SchemaError::Validation(_))));

        let mut schema = TreeSchema::from(&grown());
        schema.version = 99;
        assert!(matches!(ClusterTree::try_from(schema), Err(SchemaError::Version(99))));

        assert!(matches!(ClusterTree::from_json("{"), Err(SchemaError::Json(_))));
    }
}

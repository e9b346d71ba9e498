//! Arena-owned clustering tree.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`] index;
//! the root is always node 0. A node is created once, when its parent's split
//! is committed, and afterwards only its state, question and child links are
//! recorded. Leaves (nodes without children) define the final clusters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{NodeDensity, StateContext};
use crate::questions::{Question, QuestionSet};

/// Type alias for tree node indices.
pub type NodeId = u32;

/// Sentinel for "no node" (missing parent or child).
pub const NO_NODE: NodeId = u32::MAX;

/// Growth state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Unvisited,
    Searching,
    Split,
    Terminal,
}

/// Traversal order for [`ClusterTree::traverse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraversalOrder {
    PreOrder,
    InOrder,
    PostOrder,
}

/// Contents of a node about to be created.
#[derive(Clone, Debug)]
pub struct NodeSeed {
    /// External state ids.
    pub members: Vec<u32>,
    pub density: NodeDensity,
    pub weighted_entropy: f64,
}

/// A tree node: the states it covers and their merged statistics.
#[derive(Clone, Debug)]
pub struct NodeStats {
    pub(crate) members: Vec<u32>,
    pub(crate) density: NodeDensity,
    pub(crate) weighted_entropy: f64,
    pub(crate) parent: NodeId,
    pub(crate) left: NodeId,
    pub(crate) right: NodeId,
    pub(crate) question: Option<Question>,
    pub(crate) gain: f64,
    pub(crate) depth: u32,
    pub(crate) state: NodeState,
}

impl NodeStats {
    fn from_seed(seed: NodeSeed, parent: NodeId, depth: u32) -> Self {
        let mut members = seed.members;
        members.sort_unstable();
        Self {
            members,
            density: seed.density,
            weighted_entropy: seed.weighted_entropy,
            parent,
            left: NO_NODE,
            right: NO_NODE,
            question: None,
            gain: 0.0,
            depth,
            state: NodeState::Unvisited,
        }
    }

    /// External ids of the member states, sorted.
    #[inline]
    pub fn members(&self) -> &[u32] {
        &self.members
    }

    #[inline]
    pub fn density(&self) -> &NodeDensity {
        &self.density
    }

    #[inline]
    pub fn weighted_entropy(&self) -> f64 {
        self.weighted_entropy
    }

    #[inline]
    pub fn occupancy(&self) -> f64 {
        self.density.occupancy()
    }

    /// Parent id, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        (self.parent != NO_NODE).then_some(self.parent)
    }

    /// `(yes, no)` children of a split node.
    #[inline]
    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        (self.left != NO_NODE).then_some((self.left, self.right))
    }

    #[inline]
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    /// Entropy reduction achieved by this node's split (0 for leaves).
    #[inline]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn state(&self) -> NodeState {
        self.state
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left == NO_NODE
    }
}

/// Binary clustering tree.
#[derive(Clone, Debug)]
pub struct ClusterTree {
    nodes: Vec<NodeStats>,
}

impl ClusterTree {
    /// Tree with a single root node.
    pub fn new(root: NodeSeed) -> Self {
        Self { nodes: vec![NodeStats::from_seed(root, NO_NODE, 0)] }
    }

    pub(crate) fn from_nodes(nodes: Vec<NodeStats>) -> Self {
        Self { nodes }
    }

    /// Root node id (always 0).
    #[inline]
    pub fn root(&self) -> NodeId {
        0
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &NodeStats {
        &self.nodes[id as usize]
    }

    #[inline]
    pub fn nodes(&self) -> &[NodeStats] {
        &self.nodes
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Deepest node depth.
    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    #[inline]
    pub(crate) fn set_state(&mut self, id: NodeId, state: NodeState) {
        self.nodes[id as usize].state = state;
    }

    /// Commit a split of `parent`, creating its two children.
    ///
    /// Returns `(yes, no)` child ids.
    pub fn split(
        &mut self,
        parent: NodeId,
        question: Question,
        gain: f64,
        yes: NodeSeed,
        no: NodeSeed,
    ) -> (NodeId, NodeId) {
        let depth = self.nodes[parent as usize].depth + 1;
        let yes_id = self.nodes.len() as NodeId;
        let no_id = yes_id + 1;
        self.nodes.push(NodeStats::from_seed(yes, parent, depth));
        self.nodes.push(NodeStats::from_seed(no, parent, depth));

        let node = &mut self.nodes[parent as usize];
        node.left = yes_id;
        node.right = no_id;
        node.question = Some(question);
        node.gain = gain;
        node.state = NodeState::Split;
        (yes_id, no_id)
    }

    /// Node ids in the requested order.
    pub fn traverse(&self, order: TraversalOrder) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return out;
        }
        match order {
            TraversalOrder::PreOrder => {
                let mut stack = vec![self.root()];
                while let Some(id) = stack.pop() {
                    out.push(id);
                    if let Some((yes, no)) = self.node(id).children() {
                        stack.push(no);
                        stack.push(yes);
                    }
                }
            }
            TraversalOrder::InOrder => {
                let mut stack = Vec::new();
                let mut current = Some(self.root());
                while current.is_some() || !stack.is_empty() {
                    while let Some(id) = current {
                        stack.push(id);
                        current = self.node(id).children().map(|(yes, _)| yes);
                    }
                    if let Some(id) = stack.pop() {
                        out.push(id);
                        current = self.node(id).children().map(|(_, no)| no);
                    }
                }
            }
            TraversalOrder::PostOrder => {
                let mut stack = vec![self.root()];
                while let Some(id) = stack.pop() {
                    out.push(id);
                    if let Some((yes, no)) = self.node(id).children() {
                        stack.push(yes);
                        stack.push(no);
                    }
                }
                out.reverse();
            }
        }
        out
    }

    /// Call `f` on every node in the requested order.
    pub fn visit<F>(&self, order: TraversalOrder, mut f: F)
    where
        F: FnMut(NodeId, &NodeStats),
    {
        for id in self.traverse(order) {
            f(id, self.node(id));
        }
    }

    /// Leaf ids in pre-order. A leaf's position is its cluster id.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.traverse(TraversalOrder::PreOrder)
            .into_iter()
            .filter(|&id| self.node(id).is_leaf())
            .collect()
    }

    /// Member sets of the leaves, by cluster id.
    pub fn clusters(&self) -> Vec<Vec<u32>> {
        self.leaves().into_iter().map(|id| self.node(id).members.clone()).collect()
    }

    /// Map from external state id to cluster id.
    pub fn assignments(&self) -> BTreeMap<u32, u32> {
        let mut out = BTreeMap::new();
        for (cluster, leaf) in self.leaves().into_iter().enumerate() {
            for &member in &self.node(leaf).members {
                out.insert(member, cluster as u32);
            }
        }
        out
    }

    /// Sum of leaf weighted entropies.
    pub fn total_leaf_entropy(&self) -> f64 {
        self.leaves().into_iter().map(|id| self.node(id).weighted_entropy).sum()
    }

    /// Leaf reached by a state, following committed questions from the root.
    pub fn classify(&self, questions: &QuestionSet, id: u32, context: &StateContext) -> NodeId {
        let mut current = self.root();
        while let (Some(question), Some((yes, no))) =
            (self.node(current).question(), self.node(current).children())
        {
            current = if question.evaluate(questions, id, context) { yes } else { no };
        }
        current
    }

    /// Copy of the tree in which every node flagged in `collapse` becomes a
    /// leaf. Nodes below a collapsed node are dropped and ids are reassigned in
    /// pre-order.
    pub(crate) fn collapsed(&self, collapse: &[bool]) -> ClusterTree {
        let mut nodes: Vec<NodeStats> = Vec::with_capacity(self.nodes.len());
        // (old id, new parent id, is yes-child)
        let mut stack = vec![(self.root(), NO_NODE, true)];
        while let Some((old, new_parent, is_yes)) = stack.pop() {
            let new_id = nodes.len() as NodeId;
            let source = self.node(old);
            let mut node = source.clone();
            node.parent = new_parent;
            node.left = NO_NODE;
            node.right = NO_NODE;

            let cut = collapse.get(old as usize).copied().unwrap_or(false);
            if cut || source.is_leaf() {
                node.question = None;
                node.gain = 0.0;
                node.state = NodeState::Terminal;
            }
            nodes.push(node);

            if new_parent != NO_NODE {
                let parent = &mut nodes[new_parent as usize];
                if is_yes {
                    parent.left = new_id;
                } else {
                    parent.right = new_id;
                }
            }
            if !cut {
                if let Some((yes, no)) = source.children() {
                    stack.push((no, new_id, false));
                    stack.push((yes, new_id, true));
                }
            }
        }
        ClusterTree { nodes }
    }

    /// Printable dump with question names resolved against `questions`.
    pub fn dump(&self, questions: &QuestionSet) -> String {
        let mut out = String::new();
        let _ = self.write_dump(&mut out, |q| q.describe(questions));
        out
    }

    fn write_dump<W, D>(&self, w: &mut W, describe: D) -> fmt::Result
    where
        W: fmt::Write,
        D: Fn(&Question) -> String,
    {
        writeln!(w, "n_node {}", self.nodes.len())?;
        for (id, node) in self.nodes.iter().enumerate() {
            match (node.children(), node.question()) {
                (Some((yes, no)), Some(q)) => writeln!(
                    w,
                    "{id} {yes} {no} {:.6e} {:.6e} ({})",
                    node.gain,
                    node.occupancy(),
                    describe(q)
                )?,
                _ => writeln!(
                    w,
                    "{id} - - {:.6e} {:.6e}",
                    node.weighted_entropy,
                    node.occupancy()
                )?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for ClusterTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_dump(f, |q| q.to_string())
    }
}

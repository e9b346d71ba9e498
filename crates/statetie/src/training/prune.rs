//! Post-growth pruning.
//!
//! Both passes decide which split nodes become leaves and then rebuild a
//! compacted tree. A collapsed node keeps its members, so the leaves still
//! partition the root's members.

use super::heap::{HeapOrder, HeapSelector};
use crate::repr::{ClusterTree, NodeId, TraversalOrder};

/// Collapse the lowest-gain twigs until at most `n_leaves` leaves remain.
///
/// A twig is a split node whose children are both leaves. Collapsing one can
/// turn its parent into a twig, which then competes with the rest. Equal gains
/// collapse the lower node id first.
pub fn prune_to_leaves(tree: &ClusterTree, n_leaves: usize) -> ClusterTree {
    let target = n_leaves.max(1);
    let mut leaves = tree.n_leaves();
    if leaves <= target {
        return tree.clone();
    }

    let mut is_leaf: Vec<bool> = tree.nodes().iter().map(|n| n.is_leaf()).collect();
    let mut collapse = vec![false; tree.n_nodes()];
    let mut twigs = HeapSelector::unbounded(HeapOrder::Min);
    for id in 0..tree.n_nodes() as NodeId {
        if is_twig(tree, &is_leaf, id) {
            twigs.push(tree.node(id).gain(), id);
        }
    }

    while leaves > target {
        let Some(entry) = twigs.pop() else {
            break;
        };
        let id = entry.key;
        collapse[id as usize] = true;
        is_leaf[id as usize] = true;
        leaves -= 1;

        if let Some(parent) = tree.node(id).parent() {
            if is_twig(tree, &is_leaf, parent) {
                twigs.push(tree.node(parent).gain(), parent);
            }
        }
    }
    tree.collapsed(&collapse)
}

/// Collapse every split that leaves a child with occupancy below
/// `min_occupancy`.
pub fn prune_low_occupancy(tree: &ClusterTree, min_occupancy: f64) -> ClusterTree {
    let mut collapse = vec![false; tree.n_nodes()];
    tree.visit(TraversalOrder::PreOrder, |id, node| {
        if let Some((yes, no)) = node.children() {
            let low = tree.node(yes).occupancy() < min_occupancy
                || tree.node(no).occupancy() < min_occupancy;
            collapse[id as usize] = low;
        }
    });
    tree.collapsed(&collapse)
}

fn is_twig(tree: &ClusterTree, is_leaf: &[bool], id: NodeId) -> bool {
    match tree.node(id).children() {
        Some((yes, no)) => !is_leaf[id as usize] && is_leaf[yes as usize] && is_leaf[no as usize],
        None => false,
    }
}

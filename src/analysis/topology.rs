//! Canonical traversal over a `FormulaTree`.
//!
//! Every id-based lookup in the crate walks the tree in the same order: roots in
//! sequence, each visited pre-order with its slots taken left to right. When two
//! nodes share an id, the one reached first in this order is the one found.

use crate::store::{FormulaTree, NodeId, OperatorNode};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Position of a node: the root index, then the slot taken at each level below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    pub root: usize,
    pub slots: Vec<usize>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("node {node_id} declares arity {arity} but holds {actual} inputs")]
    ArityMismatch { node_id: NodeId, arity: usize, actual: usize },
    #[error("node id {node_id} appears {occurrences} times")]
    DuplicateId { node_id: NodeId, occurrences: usize },
    #[error("node id {node_id} leaves no room for new ids")]
    IdSpaceExhausted { node_id: NodeId },
}

/// All operator nodes in canonical order.
pub fn preorder(tree: &FormulaTree) -> Vec<&OperatorNode> {
    let mut order = Vec::new();
    for root in tree.roots() {
        visit(root, &mut order);
    }
    order
}

fn visit<'a>(node: &'a OperatorNode, order: &mut Vec<&'a OperatorNode>) {
    order.push(node);
    for (_, child) in node.children() {
        visit(child, order);
    }
}

/// Finds the first node with `id` in canonical order.
pub fn locate(tree: &FormulaTree, id: NodeId) -> Option<NodePath> {
    let mut slots = Vec::new();
    for (root_idx, root) in tree.roots().iter().enumerate() {
        if search(root, id, &mut slots) {
            return Some(NodePath { root: root_idx, slots });
        }
    }
    None
}

fn search(node: &OperatorNode, id: NodeId, path: &mut Vec<usize>) -> bool {
    if node.id() == id {
        return true;
    }
    for (slot, child) in node.children() {
        path.push(slot);
        if search(child, id, path) {
            return true;
        }
        path.pop();
    }
    false
}

pub fn node_at<'a>(tree: &'a FormulaTree, path: &NodePath) -> Option<&'a OperatorNode> {
    let mut node = tree.roots().get(path.root)?.as_ref();
    for &slot in &path.slots {
        node = node.children().find(|(i, _)| *i == slot)?.1;
    }
    Some(node)
}

/// Ids from the root down to and including the node at `path`.
pub fn lineage(tree: &FormulaTree, path: &NodePath) -> Vec<NodeId> {
    let Some(mut node) = tree.roots().get(path.root).map(|r| r.as_ref()) else {
        return Vec::new();
    };
    let mut ids = vec![node.id()];
    for &slot in &path.slots {
        match node.children().find(|(i, _)| *i == slot) {
            Some((_, child)) => {
                ids.push(child.id());
                node = child;
            }
            None => break,
        }
    }
    ids
}

/// Ids of `subtree` in canonical order, the subtree root first.
pub fn subtree_ids(subtree: &OperatorNode) -> Vec<NodeId> {
    let mut order = Vec::new();
    visit(subtree, &mut order);
    order.into_iter().map(OperatorNode::id).collect()
}

/// First node of `subtree` (canonical order) whose id is in `ids`.
pub fn find_any(subtree: &OperatorNode, ids: &HashSet<NodeId>) -> Option<NodeId> {
    subtree_ids(subtree).into_iter().find(|id| ids.contains(id))
}

/// How many times each id occurs across the whole tree.
pub fn id_counts(tree: &FormulaTree) -> HashMap<NodeId, usize> {
    let mut counts = HashMap::new();
    for node in preorder(tree) {
        *counts.entry(node.id()).or_insert(0) += 1;
    }
    counts
}

/// Checks every node's slot count against its arity and reports id collisions.
pub fn verify(tree: &FormulaTree) -> Result<(), Vec<StructuralError>> {
    let nodes = preorder(tree);
    let mut errors = Vec::new();
    let mut counts: HashMap<NodeId, usize> = HashMap::new();
    let mut first_seen = Vec::new();

    for node in &nodes {
        if node.inputs().len() != node.arity() {
            errors.push(StructuralError::ArityMismatch {
                node_id: node.id(),
                arity: node.arity(),
                actual: node.inputs().len(),
            });
        }
        let count = counts.entry(node.id()).or_insert(0);
        if *count == 0 {
            first_seen.push(node.id());
        }
        *count += 1;
    }

    // Report collisions in the order the ids were first met.
    for id in first_seen {
        let occurrences = counts[&id];
        if occurrences > 1 {
            errors.push(StructuralError::DuplicateId { node_id: id, occurrences });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Constant, Operation};

    fn k(value: f64) -> Constant {
        Constant { id: format!("k{}", value), name: format!("K{}", value), value }
    }

    // Shape:
    //   root 1 (+): [ 2 (×): [ 3 (min), k ], 4 (max) ]
    //   root 5 (-)
    fn sample_tree() -> FormulaTree {
        let three = OperatorNode::new(NodeId(3), Operation::Min);
        let two = OperatorNode::new(NodeId(2), Operation::Multiply)
            .with_input(0, three)
            .unwrap()
            .with_input(1, k(1.0))
            .unwrap();
        let four = OperatorNode::new(NodeId(4), Operation::Max);
        let one = OperatorNode::new(NodeId(1), Operation::Add)
            .with_input(0, two)
            .unwrap()
            .with_input(1, four)
            .unwrap();
        FormulaTree::from_roots([one, OperatorNode::new(NodeId(5), Operation::Subtract)])
    }

    #[test]
    fn test_preorder_is_depth_first_left_to_right() {
        let tree = sample_tree();
        let ids: Vec<u64> = preorder(&tree).iter().map(|n| n.id().raw()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_locate_and_lineage() {
        let tree = sample_tree();
        let path = locate(&tree, NodeId(3)).expect("node 3 exists");
        assert_eq!(path, NodePath { root: 0, slots: vec![0, 0] });
        assert_eq!(node_at(&tree, &path).unwrap().id(), NodeId(3));
        assert_eq!(lineage(&tree, &path), vec![NodeId(1), NodeId(2), NodeId(3)]);

        assert_eq!(locate(&tree, NodeId(5)), Some(NodePath { root: 1, slots: vec![] }));
        assert_eq!(locate(&tree, NodeId(99)), None);
    }

    #[test]
    fn test_first_match_wins_on_colliding_ids() {
        // id 9 appears nested in root 0 (slot 1) and again as root 1.
        let nested = OperatorNode::new(NodeId(9), Operation::Max);
        let root = OperatorNode::new(NodeId(1), Operation::Add).with_input(1, nested).unwrap();
        let tree = FormulaTree::from_roots([root, OperatorNode::new(NodeId(9), Operation::Min)]);

        let path = locate(&tree, NodeId(9)).unwrap();
        assert_eq!(path, NodePath { root: 0, slots: vec![1] });
        assert_eq!(node_at(&tree, &path).unwrap().op(), Operation::Max);
    }

    #[test]
    fn test_verify_reports_duplicate_ids() {
        assert!(verify(&sample_tree()).is_ok());

        let tree = FormulaTree::from_roots([
            OperatorNode::new(NodeId(1), Operation::Add),
            OperatorNode::new(NodeId(1), Operation::Min),
        ]);
        let errs = verify(&tree).unwrap_err();
        assert_eq!(errs, vec![StructuralError::DuplicateId { node_id: NodeId(1), occurrences: 2 }]);
    }

    #[test]
    fn test_find_any_in_subtree() {
        let tree = sample_tree();
        let root = tree.first_root().unwrap();
        let wanted: HashSet<NodeId> = [NodeId(4), NodeId(3)].into_iter().collect();
        // 3 precedes 4 in canonical order.
        assert_eq!(find_any(root, &wanted), Some(NodeId(3)));
        assert_eq!(find_any(root, &HashSet::from([NodeId(5)])), None);
    }

    #[test]
    fn test_subtree_ids_and_id_counts() {
        let tree = sample_tree();
        let two = node_at(&tree, &NodePath { root: 0, slots: vec![0] }).unwrap();
        assert_eq!(subtree_ids(two), vec![NodeId(2), NodeId(3)]);

        let tree = FormulaTree::from_roots([
            OperatorNode::new(NodeId(1), Operation::Add),
            OperatorNode::new(NodeId(1), Operation::Min),
            OperatorNode::new(NodeId(2), Operation::Max),
        ]);
        let counts = id_counts(&tree);
        assert_eq!(counts[&NodeId(1)], 2);
        assert_eq!(counts[&NodeId(2)], 1);
        assert!(!counts.contains_key(&NodeId(3)));
    }
}

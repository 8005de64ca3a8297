//! The tree mutation engine.
//!
//! Every operation takes a snapshot by reference and hands back a new one; the input
//! is never touched. Untouched subtrees are shared between the two snapshots and only
//! the path from the edited node up to its root is copied.
//!
//! Nodes are located with `topology::locate`, so the first match in canonical order
//! (roots in sequence, pre-order, slots left to right) is the node that gets edited.

use super::error::EditError;
use crate::analysis::topology::{self, NodePath};
use crate::store::{FormulaTree, IdGenerator, Input, NodeId, Operation, OperatorNode, Slot};
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStatus {
    Applied,
    /// No node carried the requested id; the returned tree is the input unchanged.
    NodeNotFound,
}

/// Result of a search-based mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub tree: FormulaTree,
    pub status: EditStatus,
}

impl Edit {
    fn applied(tree: FormulaTree) -> Self { Self { tree, status: EditStatus::Applied } }

    fn not_found(tree: &FormulaTree) -> Self {
        Self { tree: tree.clone(), status: EditStatus::NodeNotFound }
    }

    pub fn is_applied(&self) -> bool { self.status == EditStatus::Applied }
}

/// Appends a root with every slot empty. `symbol` may be the operator symbol or its catalog id.
pub fn add_root(tree: &FormulaTree, symbol: &str, ids: &IdGenerator) -> Result<(FormulaTree, NodeId), EditError> {
    let op: Operation = symbol.parse()?;
    Ok(push_root(tree, op, ids))
}

pub fn push_root(tree: &FormulaTree, op: Operation, ids: &IdGenerator) -> (FormulaTree, NodeId) {
    let id = ids.next_id();
    let mut next = tree.clone();
    next.roots_mut().push(Arc::new(OperatorNode::new(id, op)));
    debug!("added root {} ({})", id, op);
    (next, id)
}

/// Puts `value` into a slot of the first node with `node_id`. Whatever occupied the
/// slot before, including a whole subtree, is discarded.
pub fn set_slot(
    tree: &FormulaTree,
    node_id: NodeId,
    slot_index: usize,
    value: impl Into<Input>,
) -> Result<Edit, EditError> {
    replace_slot(tree, node_id, slot_index, Some(value.into()))
}

/// Empties a slot. The node itself stays in place.
pub fn clear_slot(tree: &FormulaTree, node_id: NodeId, slot_index: usize) -> Result<Edit, EditError> {
    replace_slot(tree, node_id, slot_index, None)
}

/// Removes the first root with `node_id` together with its subtree. Other roots are
/// carried over as they are. Nested nodes are never matched here; empty their parent's
/// slot with `clear_slot` instead.
pub fn remove_root(tree: &FormulaTree, node_id: NodeId) -> Edit {
    match tree.roots().iter().position(|r| r.id() == node_id) {
        Some(idx) => {
            let mut next = tree.clone();
            next.roots_mut().remove(idx);
            debug!("removed root {} at position {}", node_id, idx);
            Edit::applied(next)
        }
        None => {
            debug!("remove_root: no root with id {}", node_id);
            Edit::not_found(tree)
        }
    }
}

fn replace_slot(tree: &FormulaTree, node_id: NodeId, slot_index: usize, slot: Slot) -> Result<Edit, EditError> {
    let Some(path) = topology::locate(tree, node_id) else {
        debug!("no node with id {}; tree left unchanged", node_id);
        return Ok(Edit::not_found(tree));
    };

    let target = topology::node_at(tree, &path).expect("BUG: located path must resolve");
    if slot_index >= target.arity() {
        return Err(EditError::SlotIndexOutOfRange { node_id, index: slot_index, arity: target.arity() });
    }

    if let Some(Input::Operator(subtree)) = &slot {
        let lineage: HashSet<NodeId> = topology::lineage(tree, &path).into_iter().collect();
        if let Some(hit) = topology::find_any(subtree, &lineage) {
            return Err(EditError::CycleDetected { target: node_id, node_id: hit });
        }
        if let Some(hit) = colliding_id(tree, target.input(slot_index), subtree) {
            return Err(EditError::DuplicateId { target: node_id, node_id: hit });
        }
    }

    let mut next = tree.clone();
    let discarded = node_at_mut(next.roots_mut(), &path).replace_input(slot_index, slot)?;
    debug!(
        "slot {} of {} updated (previous occupant {})",
        slot_index,
        node_id,
        if discarded.is_some() { "discarded" } else { "empty" }
    );
    Ok(Edit::applied(next))
}

/// First id of `incoming` that would occur twice once it replaces `outgoing`. Ids held
/// by the outgoing occupant are released before the check.
fn colliding_id(tree: &FormulaTree, outgoing: Option<&Input>, incoming: &OperatorNode) -> Option<NodeId> {
    let mut in_use = topology::id_counts(tree);
    if let Some(Input::Operator(previous)) = outgoing {
        for id in topology::subtree_ids(previous) {
            if let Some(count) = in_use.get_mut(&id) {
                *count -= 1;
            }
        }
    }
    topology::subtree_ids(incoming).into_iter().find(|id| {
        let count = in_use.entry(*id).or_insert(0);
        *count += 1;
        *count > 1
    })
}

/// Walks `path`, copying every shared node on the way down.
fn node_at_mut<'a>(roots: &'a mut [Arc<OperatorNode>], path: &NodePath) -> &'a mut OperatorNode {
    let mut node = Arc::make_mut(&mut roots[path.root]);
    for &slot in &path.slots {
        node = node.child_mut(slot).expect("BUG: located path must lead through operator slots");
    }
    node
}

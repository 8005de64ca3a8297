//! The formula store: the application-state object holding the current snapshot.
//!
//! Each accepted mutation swaps in the snapshot returned by the mutation engine; a
//! rejected one leaves the current snapshot in place and hands the error back.

use super::registry::Registry;
use super::types::{FormulaTree, IdGenerator, Input, NodeId};
use crate::analysis::topology::{self, StructuralError};
use crate::compute::{engine, ComputationError, Ledger};
use crate::edit::{engine as edit, Edit, EditError, EditStatus, Payload};
use log::{debug, warn};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FormulaStore {
    registry: Arc<Registry>,
    tree: FormulaTree,
    ids: IdGenerator,
}

impl FormulaStore {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry, tree: FormulaTree::new(), ids: IdGenerator::new() }
    }

    /// Resumes from an existing snapshot. New ids continue past the highest one in `tree`.
    /// A snapshot with colliding ids, or with no id left to issue, is refused.
    pub fn with_tree(registry: Arc<Registry>, tree: FormulaTree) -> Result<Self, Vec<StructuralError>> {
        topology::verify(&tree)?;
        let ids = IdGenerator::resuming_after(&tree).map_err(|e| vec![e])?;
        debug!("resumed snapshot with {} root(s)", tree.len());
        Ok(Self { registry, tree, ids })
    }

    pub fn tree(&self) -> &FormulaTree { &self.tree }
    pub fn registry(&self) -> &Registry { &self.registry }

    /// Catalog edits (e.g. adding a constant). Copies the registry if it is shared.
    pub fn registry_mut(&mut self) -> &mut Registry { Arc::make_mut(&mut self.registry) }

    // --- Mutations ---

    /// Adds a root for an operator offered by the registry.
    pub fn add_root(&mut self, symbol: &str) -> Result<NodeId, EditError> {
        let op = self.registry.operator(symbol).map_err(|e| self.rejected(e))?;
        let (tree, id) = edit::push_root(&self.tree, op, &self.ids);
        self.tree = tree;
        Ok(id)
    }

    pub fn set_slot(&mut self, node_id: NodeId, slot: usize, value: impl Into<Input>) -> Result<EditStatus, EditError> {
        let result = edit::set_slot(&self.tree, node_id, slot, value);
        self.commit(result)
    }

    pub fn clear_slot(&mut self, node_id: NodeId, slot: usize) -> Result<EditStatus, EditError> {
        let result = edit::clear_slot(&self.tree, node_id, slot);
        self.commit(result)
    }

    pub fn remove_root(&mut self, node_id: NodeId) -> EditStatus {
        let outcome = edit::remove_root(&self.tree, node_id);
        self.tree = outcome.tree;
        outcome.status
    }

    /// A payload dropped onto the formula area. Only operators can become roots.
    pub fn drop_root(&mut self, payload_json: &str) -> Result<NodeId, EditError> {
        let payload = Payload::decode(payload_json).map_err(|e| self.rejected(e))?;
        match payload {
            Payload::Operator { symbol } => self.add_root(&symbol),
            _ => Err(self.rejected(EditError::InvalidPayload("a root must be an operator".into()))),
        }
    }

    /// A payload dropped into one slot of an existing node.
    pub fn drop_into_slot(&mut self, node_id: NodeId, slot: usize, payload_json: &str) -> Result<EditStatus, EditError> {
        let input = Payload::decode(payload_json)
            .and_then(|p| p.resolve(&self.registry, &self.ids))
            .map_err(|e| self.rejected(e))?;
        self.set_slot(node_id, slot, input)
    }

    fn commit(&mut self, result: Result<Edit, EditError>) -> Result<EditStatus, EditError> {
        match result {
            Ok(outcome) => {
                if outcome.status == EditStatus::NodeNotFound {
                    debug!("mutation targeted a missing node; snapshot kept");
                }
                self.tree = outcome.tree;
                Ok(outcome.status)
            }
            Err(e) => Err(self.rejected(e)),
        }
    }

    fn rejected(&self, error: EditError) -> EditError {
        warn!("mutation rejected: {}", error);
        error
    }

    // --- Evaluation ---

    /// Evaluates the first root at every sample point of the registry.
    pub fn evaluate_all(&self) -> Result<Ledger, ComputationError> {
        engine::evaluate_all(&self.tree, self.registry.sample_points())
    }

    /// Evaluates a specific root at every sample point of the registry.
    pub fn evaluate_root(&self, root_id: NodeId) -> Result<Ledger, ComputationError> {
        let root = self.tree.root(root_id).ok_or(ComputationError::RootNotFound(root_id))?;
        Ok(engine::evaluate_root(root, self.registry.sample_points()))
    }

    pub fn verify(&self) -> Result<(), Vec<StructuralError>> {
        topology::verify(&self.tree)
    }
}

//! Defines the error types for the mutation engine.
use crate::store::NodeId;
use thiserror::Error;

/// A rejected mutation. The snapshot the mutation was applied to is left untouched,
/// so every variant is recoverable by the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("Slot {index} is out of range for node {node_id} (arity {arity})")]
    SlotIndexOutOfRange { node_id: NodeId, index: usize, arity: usize },
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Placing this subtree under node {target} would make node {node_id} its own descendant")]
    CycleDetected { target: NodeId, node_id: NodeId },
    #[error("Node id {node_id} is already used elsewhere in the formula")]
    DuplicateId { target: NodeId, node_id: NodeId },
}

//! The formula node model, the leaf registry and the formula store.
pub mod formula;
pub mod registry;
pub mod types;

pub use formula::FormulaStore;
pub use registry::{ConfigError, Registry, RegistryConfig};
pub use types::{Constant, FormulaTree, IdGenerator, Input, LeafValue, NodeId, Operation, OperatorNode, Slot, TimeSeries};

//! types.rs
//! The formula node model: leaves, fixed-arity operator nodes and the tree of roots.

use crate::analysis::topology::{self, StructuralError};
use crate::edit::EditError;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier of an operator node. Unique across a `FormulaTree` when issued by one `IdGenerator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(raw: u64) -> Self { Self(raw) }
    pub fn raw(&self) -> u64 { self.0 }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op_{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = EditError;

    /// Accepts both the display form (`op_12`) and the bare number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix("op_").unwrap_or(s.trim());
        digits
            .parse::<u64>()
            .map(NodeId)
            .map_err(|_| EditError::InvalidPayload(format!("'{}' is not a node id", s)))
    }
}

/// The combining rule of an operator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operation {
    Multiply,
    Add,
    Subtract,
    Sum,
    Max,
    Min,
}

impl Operation {
    /// Catalog order, as presented to the user.
    pub const ALL: [Operation; 6] = [
        Operation::Multiply,
        Operation::Add,
        Operation::Subtract,
        Operation::Sum,
        Operation::Max,
        Operation::Min,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Multiply => "×",
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Sum => "Σ",
            Operation::Max => "max",
            Operation::Min => "min",
        }
    }

    pub fn catalog_id(&self) -> &'static str {
        match self {
            Operation::Multiply => "multiply",
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Sum => "sum",
            Operation::Max => "max",
            Operation::Min => "min",
        }
    }

    /// Number of input slots. Fixed for the lifetime of a node.
    pub fn arity(&self) -> usize {
        match self {
            Operation::Sum => 4,
            _ => 2,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operation {
    type Err = EditError;

    /// Parses either the symbol (`×`) or the catalog id (`multiply`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.symbol() == s || op.catalog_id() == s)
            .ok_or_else(|| EditError::UnknownOperator(s.to_string()))
    }
}

impl TryFrom<String> for Operation {
    type Error = EditError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self { op.symbol().to_string() }
}

/// A named series of values keyed by sample point. Shared, never mutated once supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub id: String,
    pub name: String,
    pub values: Arc<HashMap<String, f64>>,
}

impl TimeSeries {
    pub fn new<K: Into<String>>(
        id: impl Into<String>,
        name: impl Into<String>,
        values: impl IntoIterator<Item = (K, f64)>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            values: Arc::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    pub fn value_at(&self, sample_point: &str) -> Option<f64> {
        self.values.get(sample_point).copied()
    }
}

/// A scalar leaf. Placing it into a tree copies the value; later registry edits do not reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub id: String,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LeafValue {
    TimeSeries(TimeSeries),
    Constant(Constant),
}

impl LeafValue {
    pub fn id(&self) -> &str {
        match self {
            LeafValue::TimeSeries(s) => &s.id,
            LeafValue::Constant(c) => &c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LeafValue::TimeSeries(s) => &s.name,
            LeafValue::Constant(c) => &c.name,
        }
    }
}

/// The occupant of a filled slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Input {
    Operator(Arc<OperatorNode>),
    Leaf(LeafValue),
}

impl From<LeafValue> for Input {
    fn from(leaf: LeafValue) -> Self { Input::Leaf(leaf) }
}

impl From<TimeSeries> for Input {
    fn from(series: TimeSeries) -> Self { Input::Leaf(LeafValue::TimeSeries(series)) }
}

impl From<Constant> for Input {
    fn from(constant: Constant) -> Self { Input::Leaf(LeafValue::Constant(constant)) }
}

impl From<OperatorNode> for Input {
    fn from(node: OperatorNode) -> Self { Input::Operator(Arc::new(node)) }
}

impl From<Arc<OperatorNode>> for Input {
    fn from(node: Arc<OperatorNode>) -> Self { Input::Operator(node) }
}

/// An input position of an operator node. `None` is an empty slot.
pub type Slot = Option<Input>;

/// An internal node. `inputs.len() == op.arity()` holds from construction onwards:
/// slots can be replaced but never added or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOperatorNode")]
pub struct OperatorNode {
    id: NodeId,
    #[serde(rename = "symbol")]
    op: Operation,
    inputs: SmallVec<[Slot; 4]>,
}

#[derive(Deserialize)]
struct RawOperatorNode {
    id: NodeId,
    symbol: Operation,
    inputs: Vec<Slot>,
}

impl TryFrom<RawOperatorNode> for OperatorNode {
    type Error = String;

    fn try_from(raw: RawOperatorNode) -> Result<Self, Self::Error> {
        if raw.inputs.len() != raw.symbol.arity() {
            return Err(format!(
                "node {} ({}) has {} inputs, expected {}",
                raw.id,
                raw.symbol,
                raw.inputs.len(),
                raw.symbol.arity()
            ));
        }
        Ok(Self { id: raw.id, op: raw.symbol, inputs: raw.inputs.into_iter().collect() })
    }
}

impl OperatorNode {
    /// Creates a node with every slot empty.
    pub fn new(id: NodeId, op: Operation) -> Self {
        Self { id, op, inputs: std::iter::repeat_with(|| None).take(op.arity()).collect() }
    }

    /// Builder used by hosts assembling a subtree before placing it.
    pub fn with_input(mut self, index: usize, input: impl Into<Input>) -> Result<Self, EditError> {
        self.replace_input(index, Some(input.into()))?;
        Ok(self)
    }

    pub fn id(&self) -> NodeId { self.id }
    pub fn op(&self) -> Operation { self.op }
    pub fn arity(&self) -> usize { self.op.arity() }
    pub fn inputs(&self) -> &[Slot] { &self.inputs }

    pub fn input(&self, index: usize) -> Option<&Input> {
        self.inputs.get(index).and_then(Option::as_ref)
    }

    /// Nested operator nodes with their slot index, left to right.
    pub fn children(&self) -> impl Iterator<Item = (usize, &OperatorNode)> + '_ {
        self.inputs.iter().enumerate().filter_map(|(i, slot)| match slot {
            Some(Input::Operator(child)) => Some((i, child.as_ref())),
            _ => None,
        })
    }

    /// Swaps the occupant of one slot, handing back the previous one.
    pub(crate) fn replace_input(&mut self, index: usize, slot: Slot) -> Result<Slot, EditError> {
        let arity = self.arity();
        let target = self.inputs.get_mut(index).ok_or(EditError::SlotIndexOutOfRange {
            node_id: self.id,
            index,
            arity,
        })?;
        Ok(std::mem::replace(target, slot))
    }

    /// Copy-on-write access to a nested operator.
    pub(crate) fn child_mut(&mut self, index: usize) -> Option<&mut OperatorNode> {
        match self.inputs.get_mut(index)? {
            Some(Input::Operator(child)) => Some(Arc::make_mut(child)),
            _ => None,
        }
    }
}

/// The ordered sequence of root operator nodes. Cloning is cheap: subtrees are shared
/// until a mutation copies the path it touches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaTree {
    roots: Vec<Arc<OperatorNode>>,
}

impl FormulaTree {
    pub fn new() -> Self { Self::default() }

    pub fn from_roots(roots: impl IntoIterator<Item = OperatorNode>) -> Self {
        Self { roots: roots.into_iter().map(Arc::new).collect() }
    }

    pub fn roots(&self) -> &[Arc<OperatorNode>] { &self.roots }
    pub fn len(&self) -> usize { self.roots.len() }
    pub fn is_empty(&self) -> bool { self.roots.is_empty() }

    /// The root evaluated by `evaluate_all`.
    pub fn first_root(&self) -> Option<&OperatorNode> {
        self.roots.first().map(Arc::as_ref)
    }

    pub fn root(&self, id: NodeId) -> Option<&OperatorNode> {
        self.roots.iter().map(Arc::as_ref).find(|r| r.id == id)
    }

    pub(crate) fn roots_mut(&mut self) -> &mut Vec<Arc<OperatorNode>> { &mut self.roots }
}

/// Monotonic source of node ids.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl Default for IdGenerator {
    fn default() -> Self { Self { next: AtomicU64::new(1) } }
}

impl Clone for IdGenerator {
    fn clone(&self) -> Self {
        Self { next: AtomicU64::new(self.next.load(Ordering::Relaxed)) }
    }
}

impl IdGenerator {
    pub fn new() -> Self { Self::default() }

    /// Continues numbering past every id already present in `tree`. Fails when the
    /// highest id leaves no room for another one.
    pub fn resuming_after(tree: &FormulaTree) -> Result<Self, StructuralError> {
        let Some(highest) = topology::preorder(tree).iter().map(|n| n.id()).max() else {
            return Ok(Self::new());
        };
        let next = highest
            .raw()
            .checked_add(1)
            .ok_or(StructuralError::IdSpaceExhausted { node_id: highest })?;
        Ok(Self { next: AtomicU64::new(next) })
    }

    pub fn next_id(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

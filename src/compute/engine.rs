//! A synchronous, single-threaded evaluator over formula trees.
use crate::compute::kernel;
use crate::compute::ledger::{ComputationError, Ledger, Value};
use crate::store::{FormulaTree, Input, LeafValue, OperatorNode};
use log::debug;
use smallvec::SmallVec;

/// Evaluates the first root of `tree` at each sample point, in the given order.
/// Further roots stay in the tree but are not part of the result.
pub fn evaluate_all<S: AsRef<str>>(tree: &FormulaTree, sample_points: &[S]) -> Result<Ledger, ComputationError> {
    let root = tree.first_root().ok_or(ComputationError::NoFormula)?;
    if tree.len() > 1 {
        debug!("evaluating first of {} roots", tree.len());
    }
    Ok(evaluate_root(root, sample_points))
}

pub fn evaluate_root<S: AsRef<str>>(root: &OperatorNode, sample_points: &[S]) -> Ledger {
    let mut ledger = Ledger::with_capacity(sample_points.len());
    for point in sample_points {
        let point = point.as_ref();
        ledger.insert(point, evaluate(root, point));
    }
    debug!("evaluated root {} at {} sample points", root.id(), ledger.len());
    ledger
}

/// Recursively evaluates an operator node at one sample point.
pub fn evaluate(node: &OperatorNode, sample_point: &str) -> Value {
    assert_eq!(
        node.inputs().len(),
        node.arity(),
        "BUG: node {} holds a slot count different from its arity",
        node.id()
    );

    let operands: SmallVec<[f64; 4]> = node
        .inputs()
        .iter()
        .flatten()
        .filter_map(|input| evaluate_input(input, sample_point).as_number())
        .collect();

    kernel::combine(node.op(), &operands)
}

pub fn evaluate_input(input: &Input, sample_point: &str) -> Value {
    match input {
        Input::Operator(node) => evaluate(node, sample_point),
        Input::Leaf(leaf) => evaluate_leaf(leaf, sample_point),
    }
}

pub fn evaluate_leaf(leaf: &LeafValue, sample_point: &str) -> Value {
    match leaf {
        LeafValue::TimeSeries(series) => series.value_at(sample_point).into(),
        LeafValue::Constant(constant) => Value::Number(constant.value),
    }
}

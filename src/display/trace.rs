use crate::compute::engine;
use crate::compute::ledger::{ComputationError, Ledger, Value};
use crate::store::{FormulaTree, Input, LeafValue, OperatorNode, Slot};
use std::fmt::Write;

/// Renders the tree as an indented trace. With a sample point, every node and leaf is
/// annotated with its value there.
pub fn format_tree(tree: &FormulaTree, sample_point: Option<&str>) -> String {
    let mut tracer = Tracer { sample_point, output: String::new() };

    if tree.is_empty() {
        let _ = writeln!(tracer.output, "FORMULA: (empty)");
        return tracer.output;
    }

    match sample_point {
        Some(point) => {
            let _ = writeln!(tracer.output, "FORMULA at '{}':", point);
        }
        None => {
            let _ = writeln!(tracer.output, "FORMULA:");
        }
    }
    let _ = writeln!(tracer.output, "--------------------------------------------------");
    for (i, root) in tree.roots().iter().enumerate() {
        // Only the first root feeds `evaluate_all`.
        let marker = if i == 0 { "" } else { " (not evaluated)" };
        tracer.trace_node(root, 1, "", marker);
    }
    tracer.output
}

/// One line per sample point, two decimals, `n/a` for missing values.
pub fn format_results(result: &Result<Ledger, ComputationError>) -> String {
    let mut output = String::new();
    match result {
        Ok(ledger) => {
            for (point, value) in ledger.iter() {
                let _ = writeln!(output, "{}: {}", point, format_number(value, 2));
            }
        }
        Err(e) => {
            let _ = writeln!(output, "{}", e);
        }
    }
    output
}

fn format_number(value: Value, decimals: usize) -> String {
    match value {
        Value::Number(n) => format!("{:.*}", decimals, n),
        Value::Missing => "n/a".to_string(),
    }
}

struct Tracer<'a> {
    sample_point: Option<&'a str>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, node: &OperatorNode, level: usize, prefix: &str, suffix: &str) {
        let value = self.format_value(|p| engine::evaluate(node, p));
        let _ = writeln!(
            self.output,
            "{}[L{}] {} ({}){}{}",
            prefix,
            level,
            node.id(),
            node.op(),
            value,
            suffix
        );

        let stem = self.build_child_stem(prefix);
        let inputs = node.inputs();
        for (i, slot) in inputs.iter().enumerate() {
            let connector = if i == inputs.len() - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{}", stem, connector);
            self.trace_slot(slot, i, level + 1, &full_prefix);
        }
    }

    fn trace_slot(&mut self, slot: &Slot, index: usize, level: usize, prefix: &str) {
        match slot {
            None => {
                let _ = writeln!(self.output, "{}[{}] <empty>", prefix, index);
            }
            Some(Input::Leaf(leaf)) => {
                let value = self.format_value(|p| engine::evaluate_leaf(leaf, p));
                let label = match leaf {
                    LeafValue::TimeSeries(s) => format!("Series {}", s.name),
                    LeafValue::Constant(c) => format!("{} = {}", c.name, c.value),
                };
                let _ = writeln!(self.output, "{}[{}] {}{}", prefix, index, label, value);
            }
            Some(Input::Operator(child)) => {
                let slot_prefix = format!("{}[{}] ", prefix, index);
                self.trace_node(child, level, &slot_prefix, "");
            }
        }
    }

    fn format_value(&self, eval: impl Fn(&str) -> Value) -> String {
        match self.sample_point {
            Some(point) => format!(" [{}]", format_number(eval(point), 3)),
            None => String::new(),
        }
    }

    fn build_child_stem(&self, current_prefix: &str) -> String {
        // Drop the slot label, then turn connectors into continuation bars.
        let without_label = match current_prefix.rfind('[') {
            Some(idx) if current_prefix.ends_with("] ") => &current_prefix[..idx],
            _ => current_prefix,
        };
        without_label.replace("`--", "   ").replace("|--", "|  ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Constant, NodeId, Operation, TimeSeries};

    fn sample_tree() -> FormulaTree {
        let a = TimeSeries::new("series_a", "A", [("01/01/23", 23.0)]);
        let k = Constant { id: "const_0".into(), name: "K".into(), value: 2.0 };
        let inner = OperatorNode::new(NodeId(2), Operation::Max).with_input(0, k).unwrap();
        let root = OperatorNode::new(NodeId(1), Operation::Multiply)
            .with_input(0, a)
            .unwrap()
            .with_input(1, inner)
            .unwrap();
        FormulaTree::from_roots([root, OperatorNode::new(NodeId(3), Operation::Add)])
    }

    #[test]
    fn test_format_tree_with_values() {
        let out = format_tree(&sample_tree(), Some("01/01/23"));
        let expected = "\
FORMULA at '01/01/23':
--------------------------------------------------
[L1] op_1 (×) [46.000]
|--[0] Series A [23.000]
`--[1] [L2] op_2 (max) [2.000]
   |--[0] K = 2 [2.000]
   `--[1] <empty>
[L1] op_3 (+) [0.000] (not evaluated)
|--[0] <empty>
`--[1] <empty>
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_format_tree_without_values_and_empty() {
        let out = format_tree(&sample_tree(), None);
        assert!(out.contains("[L1] op_1 (×)\n"));
        assert!(out.contains("|--[0] Series A\n"));
        assert_eq!(format_tree(&FormulaTree::new(), None), "FORMULA: (empty)\n");
    }

    #[test]
    fn test_format_results() {
        let ledger = engine::evaluate_all(&sample_tree(), &["01/01/23", "01/04/23"]);
        assert_eq!(format_results(&ledger), "01/01/23: 46.00\n01/04/23: 2.00\n");

        let mut missing = Ledger::new();
        missing.insert("q1", Value::Missing);
        assert_eq!(format_results(&Ok(missing)), "q1: n/a\n");
        assert_eq!(format_results(&Err(ComputationError::NoFormula)), "No formula to calculate\n");
    }

    #[test]
    fn test_empty_sum_prints_unsigned_zero() {
        let tree = FormulaTree::from_roots([OperatorNode::new(NodeId(1), Operation::Sum)]);
        let ledger = engine::evaluate_all(&tree, &["q1"]);
        assert_eq!(format_results(&ledger), "q1: 0.00\n");
        assert_eq!(ledger.unwrap().to_json().unwrap(), r#"{"q1":0.0}"#);
        assert!(format_tree(&tree, Some("q1")).contains("[L1] op_1 (Σ) [0.000]\n"));
    }
}

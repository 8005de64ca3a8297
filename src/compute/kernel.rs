use crate::compute::ledger::Value;
use crate::store::Operation;

/// Combines the operands of one node. `operands` holds only the slots that produced a
/// number, in slot order; empty and missing slots are already dropped.
pub fn combine(op: Operation, operands: &[f64]) -> Value {
    match op {
        // `Iterator::sum` over no floats yields -0.0; start the fold from +0.0.
        Operation::Add | Operation::Sum => Value::Number(operands.iter().fold(0.0, |acc, v| acc + v)),
        Operation::Multiply => Value::Number(operands.iter().product()),
        Operation::Subtract => match operands {
            [] => Value::Missing,
            [lhs] => Value::Number(*lhs),
            [lhs, rhs, ..] => Value::Number(lhs - rhs),
        },
        // An empty operand list has no extremum; never fall back to +/-inf.
        Operation::Max => operands.iter().copied().reduce(f64::max).into(),
        Operation::Min => operands.iter().copied().reduce(f64::min).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Operation::Add, &[3.0, 4.0], Value::Number(7.0))]
    #[case(Operation::Add, &[], Value::Number(0.0))]
    #[case(Operation::Sum, &[1.0, 2.0, 3.0, 4.0], Value::Number(10.0))]
    #[case(Operation::Sum, &[], Value::Number(0.0))]
    #[case(Operation::Multiply, &[], Value::Number(1.0))]
    #[case(Operation::Multiply, &[23.0, 2.0], Value::Number(46.0))]
    #[case(Operation::Subtract, &[10.0], Value::Number(10.0))]
    #[case(Operation::Subtract, &[10.0, 4.0], Value::Number(6.0))]
    #[case(Operation::Subtract, &[], Value::Missing)]
    #[case(Operation::Max, &[2.0, 5.0, 1.0], Value::Number(5.0))]
    #[case(Operation::Min, &[2.0, 5.0, 1.0], Value::Number(1.0))]
    #[case(Operation::Max, &[], Value::Missing)]
    #[case(Operation::Min, &[], Value::Missing)]
    #[case(Operation::Min, &[-3.0], Value::Number(-3.0))]
    fn test_combine(#[case] op: Operation, #[case] operands: &[f64], #[case] expected: Value) {
        assert_eq!(combine(op, operands), expected);
    }

    #[rstest]
    #[case(Operation::Add)]
    #[case(Operation::Sum)]
    fn test_empty_sum_is_positive_zero(#[case] op: Operation) {
        let total = combine(op, &[]).as_number().unwrap();
        assert_eq!(total, 0.0);
        assert!(total.is_sign_positive());
    }
}

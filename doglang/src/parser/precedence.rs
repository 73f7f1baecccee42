//! Precedence repair.
//!
//! The expression scanner is greedy: after an operator it swallows the whole
//! rest of the expression as the right operand, so `10 - 3 - 2` first comes
//! out as `10 - (3 - 2)`. `repair` rotates such a tree until equal-priority
//! operators associate to the left and tighter operators sit deeper.

use crate::ir::ast::Expression;

/// Atoms never rotate.
const ATOM_PRIORITY: u8 = 100;

fn priority(expression: &Expression) -> u8 {
    match expression {
        Expression::BinaryOp { op, .. } => op.priority(),
        _ => ATOM_PRIORITY,
    }
}

/// If the root binds at least as tightly as its right child, the right
/// child's operator becomes the root:
///
/// `a op1 (b op2 c)` => `repair(a op1 b) op2 c`
pub fn repair(expression: Expression) -> Expression {
    let (left, op, right) = match expression {
        Expression::BinaryOp { left, op, right } => (left, op, right),
        atom => return atom,
    };

    if op.priority() < priority(&right) {
        return Expression::BinaryOp { left, op, right };
    }

    match *right {
        Expression::BinaryOp {
            left: inner_left,
            op: inner_op,
            right: inner_right,
        } => Expression::BinaryOp {
            left: Box::new(repair(Expression::BinaryOp {
                left,
                op,
                right: inner_left,
            })),
            op: inner_op,
            right: inner_right,
        },
        atom => Expression::BinaryOp {
            left,
            op,
            right: Box::new(atom),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ast::BinaryOperator::*;

    fn n(value: i64) -> Expression {
        Expression::Integer(value)
    }

    fn v(name: &str) -> Expression {
        Expression::variable(name)
    }

    #[test]
    fn leaves_atoms_alone() {
        assert_eq!(repair(n(1)), n(1));
        let sum = Expression::binary(Plus, n(1), n(2));
        assert_eq!(repair(sum.clone()), sum);
    }

    #[test]
    fn rotates_equal_priority_to_the_left() {
        let greedy = Expression::binary(Minus, n(10), Expression::binary(Minus, n(3), n(2)));
        assert_eq!(repair(greedy).to_string(), "((10 - 3) - 2)");
    }

    #[test]
    fn keeps_tighter_operator_on_the_right() {
        let greedy = Expression::binary(Plus, n(3), Expression::binary(Times, n(4), n(2)));
        assert_eq!(repair(greedy).to_string(), "(3 + (4 * 2))");
    }

    #[test]
    fn pulls_looser_operator_up() {
        let greedy = Expression::binary(Times, n(3), Expression::binary(Plus, n(4), n(2)));
        assert_eq!(repair(greedy).to_string(), "((3 * 4) + 2)");
    }

    #[test]
    fn repairs_the_new_left_subtree() {
        // a * (b + c) after an inner rotation became a * ((b + c) < d)
        let greedy = Expression::binary(
            Times,
            v("a"),
            Expression::binary(LessThan, Expression::binary(Plus, v("b"), v("c")), v("d")),
        );
        assert_eq!(repair(greedy).to_string(), "(((a * b) + c) < d)");
    }
}

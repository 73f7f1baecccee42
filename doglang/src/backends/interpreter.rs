use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use super::Backend;
use crate::error::CompileError;
use crate::ir::ast::{self, BinaryOperator, Block, Expression, Statement};

/// Result of evaluating a node. Comparisons yield `Boolean`, everything else
/// `Integer`. Both agree with the compiled program's 1/0 convention: a
/// boolean used as a number is 1 or 0 and prints that way, an integer is true
/// when non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
}

impl Value {
    /// What an unassigned variable, an empty block or a loop that never ran
    /// evaluates to.
    pub const UNSET: Value = Value::Integer(0);

    pub fn as_integer(self) -> i64 {
        match self {
            Value::Integer(value) => value,
            Value::Boolean(flag) => i64::from(flag),
        }
    }

    pub fn is_truthy(self) -> bool {
        match self {
            Value::Integer(value) => value != 0,
            Value::Boolean(flag) => flag,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_integer())
    }
}

pub struct Interpreter {
    variables: HashMap<String, Value>,
}

impl Backend for Interpreter {
    fn compile(&mut self, program: &ast::Program) -> Result<String, CompileError> {
        Ok(self.run(program).to_string())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Runs the program from a fresh environment; its value is the value of
    /// the last top-level statement.
    pub fn run(&mut self, program: &ast::Program) -> Value {
        self.variables.clear();
        self.evaluate_block(&program.body)
    }

    pub fn variable(&self, name: &str) -> Option<Value> {
        self.variables.get(name).copied()
    }

    fn evaluate_block(&mut self, block: &Block) -> Value {
        block
            .statements
            .iter()
            .fold(Value::UNSET, |_, statement| self.execute(statement))
    }

    fn execute(&mut self, statement: &Statement) -> Value {
        match statement {
            Statement::Assign { target, value } => {
                let value = self.evaluate(value);
                trace!(variable = %target, %value, "assign");
                self.variables.insert(target.name.clone(), value);
                value
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition).is_truthy() {
                    self.evaluate_block(then_branch)
                } else {
                    self.evaluate_block(else_branch)
                }
            }
            Statement::While { condition, body } => {
                let mut last = Value::UNSET;
                while self.evaluate(condition).is_truthy() {
                    last = self.evaluate_block(body);
                }
                last
            }
            Statement::Identifier(identifier) => self.lookup(&identifier.name),
        }
    }

    fn evaluate(&mut self, expression: &Expression) -> Value {
        match expression {
            Expression::Integer(value) => Value::Integer(*value),
            Expression::Identifier(identifier) => self.lookup(&identifier.name),
            Expression::BinaryOp { left, op, right } => {
                let left = self.evaluate(left).as_integer();
                let right = self.evaluate(right).as_integer();
                match op {
                    BinaryOperator::Plus => Value::Integer(left.wrapping_add(right)),
                    BinaryOperator::Minus => Value::Integer(left.wrapping_sub(right)),
                    BinaryOperator::Times => Value::Integer(left.wrapping_mul(right)),
                    BinaryOperator::LessThan => Value::Boolean(left < right),
                    BinaryOperator::GreaterThan => Value::Boolean(left > right),
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Value {
        self.variables.get(name).copied().unwrap_or(Value::UNSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ast::Identifier;
    use crate::parser::parse;

    fn run(source: &str) -> (Value, Interpreter) {
        let program = parse(source).unwrap();
        let mut interpreter = Interpreter::new();
        let value = interpreter.run(&program);
        (value, interpreter)
    }

    #[test]
    fn interpret_number() {
        let mut interpreter = Interpreter::new();
        assert_eq!(interpreter.evaluate(&Expression::Integer(42)), Value::Integer(42));
    }

    #[test]
    fn precedence() {
        let (value, interpreter) = run("a AWOO 3 WOOF 4 ARF 2");
        assert_eq!(value, Value::Integer(11));
        assert_eq!(interpreter.variable("a"), Some(Value::Integer(11)));
    }

    #[test]
    fn left_associative_subtraction() {
        let (value, _) = run("a AWOO 10 BARK 3 BARK 2");
        assert_eq!(value, Value::Integer(5));
    }

    #[test]
    fn comparison_is_boolean() {
        let (_, interpreter) = run("a AWOO 3 YIP 5 b AWOO 3 YAP 5");
        assert_eq!(interpreter.variable("a"), Some(Value::Boolean(true)));
        assert_eq!(interpreter.variable("b"), Some(Value::Boolean(false)));
    }

    #[test]
    fn comparison_selects_then_branch() {
        let (value, _) = run("a AWOO 3 YIP 5 RUF? a VUH r AWOO 1 ROWH r AWOO 2 ARRUF r");
        assert_eq!(value, Value::Integer(1));
    }

    #[test]
    fn false_condition_runs_only_else() {
        let (_, interpreter) = run("RUF? 1 YAP 2 VUH t AWOO 1 ROWH e AWOO 1 ARRUF");
        assert_eq!(interpreter.variable("t"), None);
        assert_eq!(interpreter.variable("e"), Some(Value::Integer(1)));
    }

    #[test]
    fn counter_loop() {
        let (value, _) = run("i AWOO 0 GRRR i YIP 7 BOW i AWOO i WOOF 1 ARRUF i");
        assert_eq!(value, Value::Integer(7));
    }

    #[test]
    fn while_value() {
        let (value, _) = run("i AWOO 0 GRRR i YIP 3 BOW i AWOO i WOOF 1 ARRUF");
        assert_eq!(value, Value::Integer(3));
        let (value, _) = run("i AWOO 5 GRRR i YIP 3 BOW i AWOO i WOOF 1 ARRUF");
        assert_eq!(value, Value::UNSET);
    }

    #[test]
    fn unset_variable_reads_zero() {
        let (value, _) = run("y AWOO x WOOF 1");
        assert_eq!(value, Value::Integer(1));
    }

    #[test]
    fn wrapping_arithmetic() {
        let (value, _) = run("x AWOO 9223372036854775807 WOOF 1");
        assert_eq!(value, Value::Integer(i64::MIN));
    }

    #[test]
    fn boolean_as_number() {
        let (value, _) = run("x AWOO 1 YIP 2 WOOF 1");
        // (1 < (2 + 1)) -- the comparison binds loosest
        assert_eq!(value, Value::Boolean(true));
        assert_eq!(value.to_string(), "1");
        assert_eq!(Value::Boolean(true).as_integer() + 1, 2);
    }

    #[test]
    fn fresh_environment_per_run() {
        let mut interpreter = Interpreter::new();
        let program = ast::Program {
            body: Block::new(vec![Statement::Identifier(Identifier::new("x"))]),
        };
        interpreter.run(&parse("x AWOO 3").unwrap());
        assert_eq!(interpreter.run(&program), Value::UNSET);
    }
}

use std::fmt;

/// Весь исходник - один блок верхнего уровня
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Block,
}

/// Statements in execution order. Blocks do not open a scope: every variable
/// belongs to the whole frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// x AWOO 1
    Assign {
        target: Identifier,
        value: Expression,
    },
    /// RUF? условие VUH ... ROWH ... ARRUF
    If {
        condition: Expression,
        then_branch: Block,
        else_branch: Block,
    },
    /// GRRR условие BOW ... ARRUF
    While {
        condition: Expression,
        body: Block,
    },
    /// A bare word that no assignment claimed. Evaluates to the variable.
    Identifier(Identifier),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Integer(i64),
    Identifier(Identifier),
    /// x WOOF 5
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Identifier(Identifier::new(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,        // WOOF
    Minus,       // BARK
    Times,       // ARF
    LessThan,    // YIP
    GreaterThan, // YAP
}

impl BinaryOperator {
    /// Binding strength used by precedence repair; higher binds tighter.
    pub fn priority(self) -> u8 {
        match self {
            BinaryOperator::Times => 3,
            BinaryOperator::Plus | BinaryOperator::Minus => 2,
            BinaryOperator::LessThan | BinaryOperator::GreaterThan => 1,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Times => "*",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThan => ">",
        };
        f.write_str(symbol)
    }
}

/// Fully parenthesised rendering, handy for checking how a tree associates.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Integer(value) => write!(f, "{value}"),
            Expression::Identifier(identifier) => write!(f, "{identifier}"),
            Expression::BinaryOp { left, op, right } => write!(f, "({left} {op} {right})"),
        }
    }
}

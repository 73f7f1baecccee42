use tracing::{debug, warn};

use super::lexer::{Lexeme, Token};
use super::precedence;
use crate::error::CompileError;
use crate::ir::ast::{BinaryOperator, Block, Expression, Identifier, Program, Statement};

/// Every operator costs one level of recursion here and in both backends.
pub const MAX_EXPRESSION_OPERATORS: usize = 512;

pub fn parse_tokens(tokens: Vec<Lexeme>) -> Result<Program, CompileError> {
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

/// Which token closed a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    End,
    Else,
    EndOfInput,
}

struct Parser {
    tokens: Vec<Lexeme>,
    position: usize,
}

impl Parser {
    fn new(tokens: Vec<Lexeme>) -> Self {
        Self { tokens, position: 0 }
    }

    fn parse_program(&mut self) -> Result<Program, CompileError> {
        // ARRUF/ROWH на верхнем уровне завершает программу
        let (body, terminator) = self.parse_block()?;
        let skipped = self.tokens.len() - self.position;
        if terminator != Terminator::EndOfInput && skipped > 0 {
            warn!(
                line = self.previous_line(),
                ?terminator,
                skipped,
                "program ends at a top-level block terminator, ignoring the rest"
            );
        }

        debug!(statements = body.statements.len(), "parsed program");
        Ok(Program { body })
    }

    /// Reads statements up to and including `end`/`else`, or to the end of
    /// input. The terminator is not part of the block; it is handed back so
    /// `if` can tell whether an else-arm follows.
    fn parse_block(&mut self) -> Result<(Block, Terminator), CompileError> {
        let mut statements = Vec::new();

        while let Some(lexeme) = self.advance() {
            let line = lexeme.span.line;
            let token = lexeme.token.clone();

            match token {
                Token::End => return Ok((Block::new(statements), Terminator::End)),
                Token::Else => return Ok((Block::new(statements), Terminator::Else)),
                Token::Word(ref word) if !token.is_numeric() => {
                    // Обычно сразу за ним идёт AWOO и заберёт его как цель
                    statements.push(Statement::Identifier(Identifier::new(word.as_str())));
                }
                Token::Assign => {
                    let target = match statements.pop() {
                        Some(Statement::Identifier(target)) => target,
                        _ => {
                            return Err(CompileError::syntax(
                                line,
                                "assignment needs a variable name on its left",
                            ));
                        }
                    };
                    let value = self.parse_required_expression(line, "assignment")?;
                    statements.push(Statement::Assign { target, value });
                }
                Token::If => {
                    let condition = self.parse_required_expression(line, "RUF?")?;
                    let (then_branch, terminator) = self.parse_block()?;
                    let else_branch = if terminator == Terminator::Else {
                        self.parse_block()?.0
                    } else {
                        Block::default()
                    };
                    statements.push(Statement::If {
                        condition,
                        then_branch,
                        else_branch,
                    });
                }
                Token::While => {
                    let condition = self.parse_required_expression(line, "GRRR")?;
                    let (body, _) = self.parse_block()?;
                    statements.push(Statement::While { condition, body });
                }
                // BOW / VUH only separate a condition from its block
                Token::Do | Token::Then => {}
                other => {
                    warn!(line, token = ?other, "dropping token that cannot start a statement");
                }
            }
        }

        Ok((Block::new(statements), Terminator::EndOfInput))
    }

    fn parse_required_expression(
        &mut self,
        line: usize,
        after: &str,
    ) -> Result<Expression, CompileError> {
        self.parse_expression(0)?.ok_or_else(|| {
            CompileError::syntax(line, format!("expected an expression after {after}"))
        })
    }

    /// Greedy scan: an operator takes everything after it as its right
    /// operand and `precedence::repair` reshapes the result after every token.
    /// A second word or a keyword ends the expression and is left unread.
    /// `depth` counts the operators already consumed by enclosing calls.
    fn parse_expression(&mut self, depth: usize) -> Result<Option<Expression>, CompileError> {
        let mut expression: Option<Expression> = None;

        while let Some(lexeme) = self.advance() {
            let line = lexeme.span.line;
            let token = lexeme.token.clone();

            let next = match token {
                Token::Word(ref word) if token.is_numeric() => {
                    let value = word.parse::<i64>().map_err(|_| {
                        CompileError::syntax(line, format!("integer literal {word} does not fit in 64 bits"))
                    })?;
                    if let Some(previous) = &expression {
                        warn!(line, %previous, value, "literal replaces the expression before it");
                    }
                    Expression::Integer(value)
                }
                Token::Word(word) => {
                    if expression.is_some() {
                        // начало следующего оператора
                        self.retreat();
                        break;
                    }
                    Expression::variable(word)
                }
                token => match binary_operator(&token) {
                    Some(op) => {
                        let left = expression.take().ok_or_else(|| {
                            CompileError::syntax(line, format!("operator {op} has no left operand"))
                        })?;
                        if depth >= MAX_EXPRESSION_OPERATORS {
                            return Err(CompileError::syntax(
                                line,
                                format!("expression is too long: more than {MAX_EXPRESSION_OPERATORS} operators"),
                            ));
                        }
                        let right = self.parse_expression(depth + 1)?.ok_or_else(|| {
                            CompileError::syntax(line, format!("operator {op} has no right operand"))
                        })?;
                        Expression::binary(op, left, right)
                    }
                    None => {
                        self.retreat();
                        break;
                    }
                },
            };

            expression = Some(precedence::repair(next));
        }

        Ok(expression)
    }

    // Вспомогательные методы
    fn advance(&mut self) -> Option<&Lexeme> {
        let lexeme = self.tokens.get(self.position);
        if lexeme.is_some() {
            self.position += 1;
        }
        lexeme
    }

    fn retreat(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    fn previous_line(&self) -> usize {
        self.position
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map_or(1, |lexeme| lexeme.span.line)
    }
}

fn binary_operator(token: &Token) -> Option<BinaryOperator> {
    match token {
        Token::Plus => Some(BinaryOperator::Plus),
        Token::Minus => Some(BinaryOperator::Minus),
        Token::Times => Some(BinaryOperator::Times),
        Token::Less => Some(BinaryOperator::LessThan),
        Token::Greater => Some(BinaryOperator::GreaterThan),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn statements(source: &str) -> Vec<Statement> {
        parse(source).unwrap().body.statements
    }

    fn assigned(source: &str) -> String {
        match statements(source).pop() {
            Some(Statement::Assign { value, .. }) => value.to_string(),
            other => panic!("expected an assignment, got {other:?}"),
        }
    }

    #[test]
    fn parses_assignment() {
        assert_eq!(
            statements("x AWOO 42"),
            vec![Statement::Assign {
                target: Identifier::new("x"),
                value: Expression::Integer(42),
            }]
        );
    }

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(assigned("a AWOO 3 WOOF 4 ARF 2"), "(3 + (4 * 2))");
        assert_eq!(assigned("a AWOO 3 ARF 4 WOOF 2"), "((3 * 4) + 2)");
    }

    #[test]
    fn subtraction_associates_left() {
        assert_eq!(assigned("a AWOO 10 BARK 3 BARK 2"), "((10 - 3) - 2)");
        assert_eq!(assigned("a AWOO 1 BARK 2 WOOF 3 BARK 4"), "(((1 - 2) + 3) - 4)");
    }

    #[test]
    fn comparison_binds_loosest() {
        assert_eq!(
            assigned("a AWOO x WOOF 1 YIP y ARF 2 BARK 3"),
            "((x + 1) < ((y * 2) - 3))"
        );
    }

    #[test]
    fn mixed_chain() {
        assert_eq!(assigned("a AWOO 3 WOOF 4 ARF 2 BARK 5"), "((3 + (4 * 2)) - 5)");
        assert_eq!(assigned("a AWOO 2 ARF 3 ARF 4 WOOF 1"), "(((2 * 3) * 4) + 1)");
    }

    #[test]
    fn second_word_starts_a_new_statement() {
        let parsed = statements("x AWOO a WOOF b y AWOO 2");
        assert_eq!(parsed.len(), 2);
        assert!(matches!(&parsed[1], Statement::Assign { target, .. } if target.name == "y"));
    }

    #[test]
    fn bare_word_stays_a_statement() {
        assert_eq!(
            statements("x AWOO 1 x"),
            vec![
                Statement::Assign {
                    target: Identifier::new("x"),
                    value: Expression::Integer(1),
                },
                Statement::Identifier(Identifier::new("x")),
            ]
        );
    }

    #[test]
    fn if_with_else() {
        let parsed = statements("RUF? x YAP 3 VUH y AWOO 1 ROWH y AWOO 2 ARRUF z AWOO 3");
        assert_eq!(parsed.len(), 2);
        match &parsed[0] {
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                assert_eq!(condition.to_string(), "(x > 3)");
                assert_eq!(then_branch.statements.len(), 1);
                assert_eq!(else_branch.statements.len(), 1);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn if_without_else_does_not_swallow_what_follows() {
        let parsed = statements("RUF? x VUH y AWOO 1 BORF z AWOO 3");
        assert_eq!(parsed.len(), 2);
        match &parsed[0] {
            Statement::If { else_branch, .. } => assert!(else_branch.is_empty()),
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn while_loop() {
        let parsed = statements("GRRR i YIP 10 BOW i AWOO i WOOF 1 ARRUF");
        match &parsed[..] {
            [Statement::While { condition, body }] => {
                assert_eq!(condition.to_string(), "(i < 10)");
                assert_eq!(body.statements.len(), 1);
            }
            other => panic!("expected one while, got {other:?}"),
        }
    }

    #[test]
    fn nested_blocks() {
        let source = "GRRR i YIP 3 BOW RUF? i YAP 1 VUH x AWOO i ARRUF i AWOO i WOOF 1 ARRUF";
        match &statements(source)[..] {
            [Statement::While { body, .. }] => {
                assert!(matches!(body.statements[0], Statement::If { .. }));
                assert!(matches!(body.statements[1], Statement::Assign { .. }));
            }
            other => panic!("expected one while, got {other:?}"),
        }
    }

    #[test]
    fn stray_operator_is_dropped() {
        assert_eq!(statements("WOOF x AWOO 1").len(), 1);
    }

    #[test]
    fn top_level_end_stops_the_program() {
        assert_eq!(
            statements("x AWOO 1 ARRUF x AWOO 2 x"),
            vec![Statement::Assign {
                target: Identifier::new("x"),
                value: Expression::Integer(1),
            }]
        );
        assert_eq!(statements("x AWOO 1 ROWH y AWOO 2").len(), 1);
    }

    fn chain(operators: usize) -> String {
        format!("x AWOO 1{}", " WOOF 1".repeat(operators))
    }

    #[test]
    fn longest_allowed_expression_parses() {
        assert_eq!(statements(&chain(MAX_EXPRESSION_OPERATORS)).len(), 1);
    }

    #[test]
    fn overlong_expression_is_an_error() {
        let err = parse(&chain(MAX_EXPRESSION_OPERATORS + 1)).unwrap_err();
        assert!(err.to_string().contains("expression is too long"));
        assert!(matches!(err, CompileError::SyntaxError { line: 1, .. }));
    }

    #[test]
    fn assignment_without_target_is_an_error() {
        let err = parse("AWOO 1").unwrap_err();
        assert!(matches!(err, CompileError::SyntaxError { line: 1, .. }));
    }

    #[test]
    fn missing_operands_are_errors() {
        assert!(parse("x AWOO").is_err());
        assert!(parse("x AWOO 1 WOOF").is_err());
        assert!(parse("x AWOO\nWOOF 1").is_err());
        assert!(parse("GRRR BOW ARRUF").is_err());
    }

    #[test]
    fn oversized_literal_is_an_error() {
        let err = parse("x AWOO\n\n99999999999999999999").unwrap_err();
        assert!(matches!(err, CompileError::SyntaxError { line: 3, .. }));
    }

    #[test]
    fn empty_program() {
        assert!(statements("").is_empty());
    }
}

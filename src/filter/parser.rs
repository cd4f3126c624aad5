//! Recursive descent parser for filter expressions.
//!
//! GRAMMAR:
//!   expression  --> or_expr EOF
//!   or_expr     --> and_expr ( "or" and_expr )*
//!   and_expr    --> comparison ( "and" comparison )*
//!   comparison  --> operand ( cmp_op operand )*
//!   operand     --> IDENTIFIER | `QUOTED` | NUMBER | STRING | True | False | None
//!                 | "(" or_expr ")"
//!   cmp_op      --> "<" | "<=" | ">" | ">=" | "==" | "!="
//!
//! Anything the lexer recognises beyond this (calls, attributes, subscripts, arithmetic,
//! unary operators, `in`/`is`, assignment) is rejected as soon as it is seen with
//! [`PivotError::DisallowedExpression`]. Input that is not well formed at all yields
//! [`PivotError::ExpressionSyntax`].

use std::cmp::Ordering;
use std::fmt;

use super::lexer::Lexer;
use super::token::{Spanned, Token};
use crate::error::{PivotError, PivotOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    LtE,
    Gt,
    GtE,
    Eq,
    NotEq,
}

impl CmpOp {
    /// The operator that keeps the comparison true when its operands swap sides.
    pub fn mirror(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::LtE => CmpOp::GtE,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::GtE => CmpOp::LtE,
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::NotEq => CmpOp::NotEq,
        }
    }

    /// Whether `lhs <op> rhs` holds given `lhs.cmp(rhs)`.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::LtE => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::GtE => ordering != Ordering::Less,
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::NotEq => ordering != Ordering::Equal,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
        }
    }
}

/// Constant operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::None => f.write_str("None"),
        }
    }
}

/// Parsed, not yet validated, expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// n-ary `and` / `or`.
    BoolOp { op: BoolOp, values: Vec<Expr> },
    /// `left ops[0] comparators[0] ops[1] comparators[1] ...`
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    Name(String),
    Literal(Literal),
}

/// Deepest parenthesised nesting accepted before parsing gives up.
pub const MAX_NESTING: usize = 64;

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser {
            source,
            tokens: Lexer::new(source).tokenize(),
            pos: 0,
            depth: 0,
        }
    }

    /// Parses the entire input and returns the AST.
    pub fn parse(&mut self) -> PivotOutcome<Expr> {
        if *self.current() == Token::EOF {
            return Err(self.syntax("empty expression"));
        }

        let expr = self.parse_or()?;

        match self.current() {
            Token::EOF => Ok(expr),
            Token::Keyword(k) => Err(self.disallowed(format!("'{k}' is not allowed"))),
            Token::Comma => Err(self.disallowed("tuples are not allowed")),
            other => Err(self.syntax(format!("unexpected token '{other}'"))),
        }
    }

    fn current(&self) -> &Token {
        // The token stream always ends with EOF and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].token
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn parse_or(&mut self) -> PivotOutcome<Expr> {
        let mut values = vec![self.parse_and()?];
        while *self.current() == Token::Or {
            self.advance();
            values.push(self.parse_and()?);
        }
        Ok(collapse(BoolOp::Or, values))
    }

    fn parse_and(&mut self) -> PivotOutcome<Expr> {
        let mut values = vec![self.parse_comparison()?];
        while *self.current() == Token::And {
            self.advance();
            values.push(self.parse_comparison()?);
        }
        Ok(collapse(BoolOp::And, values))
    }

    fn parse_comparison(&mut self) -> PivotOutcome<Expr> {
        let left = self.parse_operand()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();

        loop {
            let op = match self.current() {
                Token::Less => CmpOp::Lt,
                Token::LessEqual => CmpOp::LtE,
                Token::Greater => CmpOp::Gt,
                Token::GreaterEqual => CmpOp::GtE,
                Token::EqualEqual => CmpOp::Eq,
                Token::NotEqual => CmpOp::NotEq,
                Token::In => return Err(self.disallowed("'in' comparisons are not allowed")),
                Token::Not if *self.peek() == Token::In => {
                    return Err(self.disallowed("'not in' comparisons are not allowed"));
                }
                Token::Is => return Err(self.disallowed("'is' comparisons are not allowed")),
                Token::Assign => {
                    return Err(self.disallowed("assignment '=' is not allowed (use '==')"));
                }
                _ => break,
            };
            self.advance();
            ops.push(op);
            comparators.push(self.parse_operand()?);
        }

        if ops.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                ops,
                comparators,
            })
        }
    }

    fn parse_operand(&mut self) -> PivotOutcome<Expr> {
        let operand = match self.current().clone() {
            Token::LParen => {
                if self.depth >= MAX_NESTING {
                    return Err(self.syntax("expression nested too deeply"));
                }
                self.depth += 1;
                self.advance();
                let inner = self.parse_or()?;
                if *self.current() != Token::RParen {
                    return Err(self.syntax("expected ')'"));
                }
                self.depth -= 1;
                inner
            }
            Token::Identifier(name) | Token::QuotedIdentifier(name) => Expr::Name(name),
            Token::Integer(v) => Expr::Literal(Literal::Int(v)),
            Token::Float(v) => Expr::Literal(Literal::Float(v)),
            Token::String(s) => {
                if matches!(self.peek(), Token::String(_)) {
                    self.advance();
                    return Err(self.disallowed("string concatenation is not allowed"));
                }
                Expr::Literal(Literal::Str(s))
            }
            Token::True => Expr::Literal(Literal::Bool(true)),
            Token::False => Expr::Literal(Literal::Bool(false)),
            Token::None => Expr::Literal(Literal::None),
            Token::Not => return Err(self.disallowed("unary 'not' is not allowed")),
            Token::Operator(op @ ("-" | "+" | "~")) => {
                return Err(self.disallowed(format!("unary operator '{op}' is not allowed")));
            }
            Token::LBracket => return Err(self.disallowed("list displays are not allowed")),
            Token::LBrace => return Err(self.disallowed("dict/set displays are not allowed")),
            Token::Keyword(k) => return Err(self.disallowed(format!("'{k}' is not allowed"))),
            Token::Unterminated => return Err(self.syntax("unterminated string literal")),
            Token::Illegal(c) => return Err(self.syntax(format!("unexpected character '{c}'"))),
            Token::EOF => return Err(self.syntax("unexpected end of expression")),
            other => return Err(self.syntax(format!("unexpected token '{other}'"))),
        };
        self.advance();

        match self.current() {
            Token::LParen => Err(self.disallowed("function calls are not allowed")),
            Token::Dot => Err(self.disallowed("attribute access is not allowed")),
            Token::LBracket => Err(self.disallowed("subscripting is not allowed")),
            Token::Operator(op) => {
                Err(self.disallowed(format!("arithmetic operator '{op}' is not allowed")))
            }
            _ => Ok(operand),
        }
    }

    fn disallowed(&self, reason: impl Into<String>) -> PivotError {
        PivotError::DisallowedExpression {
            expression: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn syntax(&self, message: impl Into<String>) -> PivotError {
        PivotError::ExpressionSyntax {
            expression: self.source.to_string(),
            position: self.offset(),
            message: message.into(),
        }
    }
}

fn collapse(op: BoolOp, mut values: Vec<Expr>) -> Expr {
    if values.len() == 1 {
        values.remove(0)
    } else {
        Expr::BoolOp { op, values }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoolOp, CmpOp, Expr, Literal, MAX_NESTING, Parser};
    use crate::error::PivotError;

    fn parse(input: &str) -> Result<Expr, PivotError> {
        Parser::new(input).parse()
    }

    fn name(n: &str) -> Expr {
        Expr::Name(n.to_string())
    }

    #[test]
    fn parses_nested_boolean_expression() {
        let expr = parse(r#"((Fruit == "Apple") and (Year == 2023)) or (Quarter == 4)"#).unwrap();
        let Expr::BoolOp { op: BoolOp::Or, values } = expr else {
            panic!("expected an or node");
        };
        assert_eq!(values.len(), 2);
        assert!(matches!(&values[0], Expr::BoolOp { op: BoolOp::And, values } if values.len() == 2));
        assert_eq!(
            values[1],
            Expr::Compare {
                left: Box::new(name("Quarter")),
                ops: vec![CmpOp::Eq],
                comparators: vec![Expr::Literal(Literal::Int(4))],
            }
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("a == 1 or b == 2 and c == 3").unwrap();
        let Expr::BoolOp { op: BoolOp::Or, values } = expr else {
            panic!("expected an or node");
        };
        assert!(matches!(&values[1], Expr::BoolOp { op: BoolOp::And, .. }));
    }

    #[test]
    fn keeps_chained_comparisons_together() {
        let expr = parse("2022 <= Year < 2024").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                left: Box::new(Expr::Literal(Literal::Int(2022))),
                ops: vec![CmpOp::LtE, CmpOp::Lt],
                comparators: vec![name("Year"), Expr::Literal(Literal::Int(2024))],
            }
        );
    }

    #[test]
    fn rejects_forbidden_constructs() {
        for input in [
            "__import__('os')",
            "Year + 1 > 2000",
            "Year.real > 1",
            "Year[0] == 1",
            "not Year == 1",
            "Year > -1",
            "Fruit in ['Apple']",
            "Fruit is None",
            "Year = 2022",
            "Fruit == 'App' 'le'",
            "lambda: True",
        ] {
            assert!(
                matches!(parse(input), Err(PivotError::DisallowedExpression { .. })),
                "{input} should be disallowed"
            );
        }
    }

    fn nested(depth: usize) -> String {
        format!("{}Year == 1{}", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        assert!(parse(&nested(MAX_NESTING)).is_ok());
        for depth in [MAX_NESTING + 1, 1_000, 8_000] {
            match parse(&nested(depth)) {
                Err(PivotError::ExpressionSyntax { message, position, .. }) => {
                    assert_eq!(message, "expression nested too deeply");
                    assert_eq!(position, MAX_NESTING);
                }
                other => panic!("depth {depth}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn reports_syntax_errors_with_position() {
        match parse("(Year == 2022") {
            Err(PivotError::ExpressionSyntax { position, .. }) => assert_eq!(position, 13),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse(""), Err(PivotError::ExpressionSyntax { .. })));
        assert!(matches!(parse("Year == $"), Err(PivotError::ExpressionSyntax { .. })));
        assert!(matches!(parse("Year == 'x"), Err(PivotError::ExpressionSyntax { .. })));
    }

    #[test]
    fn mirror_and_holds_agree() {
        use std::cmp::Ordering;
        for op in [CmpOp::Lt, CmpOp::LtE, CmpOp::Gt, CmpOp::GtE, CmpOp::Eq, CmpOp::NotEq] {
            for ord in [Ordering::Less, Ordering::Equal, Ordering::Greater] {
                assert_eq!(op.holds(ord), op.mirror().holds(ord.reverse()));
            }
        }
    }
}

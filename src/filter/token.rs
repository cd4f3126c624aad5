//! Tokens produced by the filter-expression lexer.
//!
//! The lexer recognises more than the grammar accepts (arithmetic, brackets, `not`, `in`, ...)
//! so the parser can name a forbidden construct instead of reporting a generic syntax error.

use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    // Literals
    Integer(i64),
    Float(f64),
    String(String),
    True,
    False,
    None,

    // Names
    Identifier(String),
    /// Backtick-quoted field name, for names that are not plain identifiers: `Price/kg`
    QuotedIdentifier(String),

    // Boolean combinators
    And,
    Or,

    // Comparisons
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    NotEqual,

    // Delimiters
    LParen,
    RParen,

    // Recognised only to be rejected
    Not,
    In,
    Is,
    /// Any other reserved word (`lambda`, `if`, `import`, ...).
    Keyword(String),
    /// Arithmetic or bitwise operator (`+`, `-`, `*`, `**`, `/`, `//`, `%`, `&`, `|`, `^`, `~`, `@`).
    Operator(&'static str),
    Assign,
    Dot,
    Comma,
    Colon,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Special
    Unterminated,
    Illegal(char),
    EOF,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "{n}"),
            Token::Float(n) => write!(f, "{n}"),
            Token::String(s) => write!(f, "{s:?}"),
            Token::True => f.write_str("True"),
            Token::False => f.write_str("False"),
            Token::None => f.write_str("None"),
            Token::Identifier(s) => f.write_str(s),
            Token::QuotedIdentifier(s) => write!(f, "`{s}`"),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Less => f.write_str("<"),
            Token::LessEqual => f.write_str("<="),
            Token::Greater => f.write_str(">"),
            Token::GreaterEqual => f.write_str(">="),
            Token::EqualEqual => f.write_str("=="),
            Token::NotEqual => f.write_str("!="),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Not => f.write_str("not"),
            Token::In => f.write_str("in"),
            Token::Is => f.write_str("is"),
            Token::Keyword(k) => f.write_str(k),
            Token::Operator(op) => f.write_str(op),
            Token::Assign => f.write_str("="),
            Token::Dot => f.write_str("."),
            Token::Comma => f.write_str(","),
            Token::Colon => f.write_str(":"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::LBrace => f.write_str("{"),
            Token::RBrace => f.write_str("}"),
            Token::Unterminated => f.write_str("unterminated string"),
            Token::Illegal(c) => write!(f, "ILLEGAL({c})"),
            Token::EOF => f.write_str("end of input"),
        }
    }
}

/// A token plus the byte offset where it starts.
#[derive(Debug, PartialEq, Clone)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

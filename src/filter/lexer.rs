//! Scans a filter expression into [`Token`]s.
//!
//! Supported lexemes:
//! - comparisons: `< <= > >= == !=`
//! - string literals in single or double quotes, with `\` escapes
//! - integers, decimals and exponents (`2022`, `0.5`, `1e3`)
//! - identifiers, and backtick-quoted identifiers for awkward field names
//! - keywords `and or not in is True False None` (plus other reserved words)

use std::iter::Peekable;
use std::str::CharIndices;

use super::token::{Spanned, Token};

const RESERVED: &[&str] = &[
    "lambda", "if", "else", "for", "while", "import", "from", "def", "class", "return", "yield",
    "await", "async", "with", "as", "del", "global", "nonlocal", "assert", "pass", "raise",
    "try", "except", "finally",
];

pub struct Lexer<'a> {
    source: &'a str,
    input: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            input: source.char_indices().peekable(),
        }
    }

    /// Lex the whole input; the last token is always [`Token::EOF`].
    pub fn tokenize(mut self) -> Vec<Spanned> {
        let mut out = Vec::new();
        loop {
            let spanned = self.next_token();
            let done = spanned.token == Token::EOF;
            out.push(spanned);
            if done {
                return out;
            }
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Spanned {
        self.skip_whitespace();

        let Some((offset, ch)) = self.input.next() else {
            return Spanned {
                token: Token::EOF,
                offset: self.source.len(),
            };
        };

        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '+' => Token::Operator("+"),
            '-' => Token::Operator("-"),
            '%' => Token::Operator("%"),
            '&' => Token::Operator("&"),
            '|' => Token::Operator("|"),
            '^' => Token::Operator("^"),
            '~' => Token::Operator("~"),
            '@' => Token::Operator("@"),
            '*' => self.either('*', Token::Operator("**"), Token::Operator("*")),
            '/' => self.either('/', Token::Operator("//"), Token::Operator("/")),
            '<' => self.either('=', Token::LessEqual, Token::Less),
            '>' => self.either('=', Token::GreaterEqual, Token::Greater),
            '=' => self.either('=', Token::EqualEqual, Token::Assign),
            '!' => self.either('=', Token::NotEqual, Token::Illegal('!')),
            '"' | '\'' => self.read_string(ch),
            '`' => self.read_quoted_identifier(),
            '.' if self.peek_is_digit() => self.read_number(offset),
            '.' => Token::Dot,
            c if c.is_ascii_digit() => self.read_number(offset),
            c if is_identifier_start(c) => self.read_identifier(offset),
            c => Token::Illegal(c),
        };

        Spanned { token, offset }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// Two-character operator if the next char is `next`, otherwise the single-char one.
    fn either(&mut self, next: char, double: Token, single: Token) -> Token {
        if self.input.peek().map(|&(_, c)| c) == Some(next) {
            self.input.next();
            double
        } else {
            single
        }
    }

    fn peek_is_digit(&mut self) -> bool {
        matches!(self.input.peek(), Some(&(_, c)) if c.is_ascii_digit())
    }

    fn read_string(&mut self, quote: char) -> Token {
        let mut result = String::new();
        while let Some((_, ch)) = self.input.next() {
            match ch {
                c if c == quote => return Token::String(result),
                '\\' => match self.input.next() {
                    Some((_, 'n')) => result.push('\n'),
                    Some((_, 't')) => result.push('\t'),
                    Some((_, escaped)) => result.push(escaped),
                    None => break,
                },
                c => result.push(c),
            }
        }
        Token::Unterminated
    }

    fn read_quoted_identifier(&mut self) -> Token {
        let mut result = String::new();
        for (_, ch) in self.input.by_ref() {
            if ch == '`' {
                return Token::QuotedIdentifier(result);
            }
            result.push(ch);
        }
        Token::Unterminated
    }

    fn read_number(&mut self, start: usize) -> Token {
        let mut end = start + 1;
        let mut is_float = self.source.as_bytes()[start] == b'.';
        let mut seen_exponent = false;

        while let Some(&(idx, ch)) = self.input.peek() {
            let accept = match ch {
                c if c.is_ascii_digit() || c == '_' => true,
                '.' if !is_float && !seen_exponent => {
                    is_float = true;
                    true
                }
                'e' | 'E' if !seen_exponent => {
                    seen_exponent = true;
                    is_float = true;
                    true
                }
                '+' | '-' if seen_exponent => {
                    matches!(self.source[..idx].chars().last(), Some('e' | 'E'))
                }
                _ => false,
            };
            if !accept {
                break;
            }
            end = idx + ch.len_utf8();
            self.input.next();
        }

        let text: String = self.source[start..end].chars().filter(|&c| c != '_').collect();
        if is_float {
            text.parse::<f64>().map(Token::Float).unwrap_or(Token::Illegal('.'))
        } else {
            // Integers too large for i64 still compare sensibly as floats.
            text.parse::<i64>()
                .map(Token::Integer)
                .or_else(|_| text.parse::<f64>().map(Token::Float))
                .unwrap_or(Token::Illegal('0'))
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        let mut end = start + self.source[start..].chars().next().map_or(1, char::len_utf8);
        while let Some(&(idx, ch)) = self.input.peek() {
            if !is_identifier_continue(ch) {
                break;
            }
            end = idx + ch.len_utf8();
            self.input.next();
        }

        match &self.source[start..end] {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "in" => Token::In,
            "is" => Token::Is,
            "True" => Token::True,
            "False" => Token::False,
            "None" => Token::None,
            word if RESERVED.contains(&word) => Token::Keyword(word.to_string()),
            word => Token::Identifier(word.to_string()),
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

fn is_identifier_continue(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

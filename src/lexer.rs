// src/lexer.rs
use std::fmt;

use serde::Serialize;

use crate::errors::{QueryError, Result};

/// Comparison operators accepted inside filters. `Index` is the degenerate
/// form `[n]` that has no operator in the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Index,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Index => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Dot,
    LBracket,
    RBracket,
    Question,
    And,
    Or,
    Compare(CompareOp),
    /// Quoted string or bare symbol; both carry the same payload.
    Str(String),
    Int(i64),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Dot => f.write_str("'.'"),
            TokenKind::LBracket => f.write_str("'['"),
            TokenKind::RBracket => f.write_str("']'"),
            TokenKind::Question => f.write_str("'?'"),
            TokenKind::And => f.write_str("'&&'"),
            TokenKind::Or => f.write_str("'||'"),
            TokenKind::Compare(op) => write!(f, "'{}'", op.as_str()),
            TokenKind::Str(s) => write!(f, "string \"{s}\""),
            TokenKind::Int(n) => write!(f, "integer {n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character of the token.
    pub offset: usize,
}

pub struct Lexer<'a> {
    s: &'a str,
    i: usize,
    pending: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(s: &'a str) -> Self {
        Self {
            s,
            i: 0,
            pending: None,
        }
    }

    /// Returns the next token, or `None` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        if let Some(token) = self.pending.take() {
            return Ok(Some(token));
        }
        self.skip_ws();
        let offset = self.i;
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(None),
        };

        let kind = match c {
            '.' => self.single(TokenKind::Dot),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '?' => self.single(TokenKind::Question),
            '&' => self.pair('&', TokenKind::And)?,
            '|' => self.pair('|', TokenKind::Or)?,
            '=' => self.pair('=', TokenKind::Compare(CompareOp::Eq))?,
            '!' => self.pair('=', TokenKind::Compare(CompareOp::Neq))?,
            '<' => {
                self.bump();
                if self.consume_char('=') {
                    TokenKind::Compare(CompareOp::Le)
                } else {
                    TokenKind::Compare(CompareOp::Lt)
                }
            }
            '>' => {
                self.bump();
                if self.consume_char('=') {
                    TokenKind::Compare(CompareOp::Ge)
                } else {
                    TokenKind::Compare(CompareOp::Gt)
                }
            }
            '"' => TokenKind::Str(self.read_string()?),
            c if c.is_alphabetic() => TokenKind::Str(self.read_symbol()),
            c if c.is_ascii_digit() => TokenKind::Int(self.read_int()?),
            other => {
                return Err(self.error_at(offset, format!("unexpected character '{other}'")));
            }
        };
        tracing::trace!(%kind, offset, "token");
        Ok(Some(Token { kind, offset }))
    }

    /// Pushes a token back so the next call to `next_token` returns it.
    /// Only one token of look-ahead is supported.
    pub fn unget(&mut self, token: Token) {
        debug_assert!(self.pending.is_none(), "only one token can be pushed back");
        self.pending = Some(token);
    }

    /// Current byte offset, accounting for a pushed-back token.
    pub fn offset(&self) -> usize {
        match &self.pending {
            Some(token) => token.offset,
            None => self.i,
        }
    }

    pub fn error_at(&self, offset: usize, message: impl Into<String>) -> QueryError {
        let offset = offset.min(self.s.len());
        QueryError::Syntax {
            message: message.into(),
            offset,
            consumed: self.s[..offset].to_string(),
            remaining: self.s[offset..].to_string(),
        }
    }

    /// Error for a token the grammar did not expect at this position.
    pub fn unexpected(&self, token: &Token, expected: &str) -> QueryError {
        self.error_at(token.offset, format!("expected {expected}, found {}", token.kind))
    }

    /// Error for input that ended while the grammar still expected something.
    pub fn unexpected_end(&self, expected: &str) -> QueryError {
        self.error_at(self.s.len(), format!("expected {expected}, found end of query"))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    // Two-character operators whose first character has no meaning on its own.
    fn pair(&mut self, second: char, kind: TokenKind) -> Result<TokenKind> {
        let start = self.i;
        self.bump();
        if self.consume_char(second) {
            Ok(kind)
        } else {
            Err(self.error_at(start, format!("expected '{}'", kind_text(&kind))))
        }
    }

    // No escape processing: everything up to the next '"' is taken literally.
    fn read_string(&mut self) -> Result<String> {
        let start = self.i;
        self.bump();
        let body = self.i;
        while let Some(c) = self.peek_char() {
            if c == '"' {
                let out = self.s[body..self.i].to_string();
                self.bump();
                return Ok(out);
            }
            self.bump();
        }
        Err(self.error_at(start, "unterminated string"))
    }

    fn read_symbol(&mut self) -> String {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        self.s[start..self.i].to_string()
    }

    fn read_int(&mut self) -> Result<i64> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
        if self.peek_char().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(self.error_at(start, "malformed integer"));
        }
        self.s[start..self.i]
            .parse::<i64>()
            .map_err(|_| self.error_at(start, "integer out of range"))
    }

    fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }
}

fn kind_text(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::And => "&&",
        TokenKind::Or => "||",
        TokenKind::Compare(op) => op.as_str(),
        _ => "",
    }
}

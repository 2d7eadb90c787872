use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::comparison::{compare_numbers, compare_strings};
use crate::errors::{QueryError, Result};
use crate::getters::string_value;
use crate::lexer::{CompareOp, Lexer, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

/// A bracketed predicate, e.g. `[fieldId=="assignee" && priority<100]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterExpr {
    Logical {
        op: LogicalOp,
        left: Box<FilterExpr>,
        right: Box<FilterExpr>,
    },
    Comparative(Comparison),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub op: CompareOp,
    /// Field name, or the position for `CompareOp::Index`.
    pub left: Atom,
    /// Literal operand; `None` only for `CompareOp::Index`.
    pub right: Option<Atom>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Atom {
    Str(String),
    Int(i64),
}

/// Parses the inside of a filter up to and including its closing `]`.
/// The opening `[` must already have been consumed.
pub fn parse_logical(lexer: &mut Lexer) -> Result<FilterExpr> {
    let mut left = parse_comparative(lexer)?;
    loop {
        let token = lexer
            .next_token()?
            .ok_or_else(|| lexer.unexpected_end("']'"))?;
        let op = match token.kind {
            TokenKind::RBracket => return Ok(left),
            TokenKind::And => LogicalOp::And,
            TokenKind::Or => LogicalOp::Or,
            _ => return Err(lexer.unexpected(&token, "'&&', '||' or ']'")),
        };
        let right = parse_comparative(lexer)?;
        left = FilterExpr::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
}

fn parse_comparative(lexer: &mut Lexer) -> Result<FilterExpr> {
    let start = lexer.offset();
    let left = parse_atom(lexer)?;
    let op = match lexer.next_token()? {
        Some(Token {
            kind: TokenKind::Compare(op),
            ..
        }) => op,
        Some(token) => {
            lexer.unget(token);
            return Ok(index(left));
        }
        None => return Ok(index(left)),
    };
    if let Atom::Int(_) = left {
        return Err(lexer.error_at(start, "left side of a comparison must be a field name"));
    }
    let right = parse_atom(lexer)?;
    Ok(FilterExpr::Comparative(Comparison {
        op,
        left,
        right: Some(right),
    }))
}

fn index(left: Atom) -> FilterExpr {
    FilterExpr::Comparative(Comparison {
        op: CompareOp::Index,
        left,
        right: None,
    })
}

fn parse_atom(lexer: &mut Lexer) -> Result<Atom> {
    let token = lexer
        .next_token()?
        .ok_or_else(|| lexer.unexpected_end("string or integer"))?;
    match token.kind {
        TokenKind::Str(s) => Ok(Atom::Str(s)),
        TokenKind::Int(n) => Ok(Atom::Int(n)),
        _ => Err(lexer.unexpected(&token, "string or integer")),
    }
}

impl FilterExpr {
    /// Evaluates the predicate for `item`, which sits at `index` in the
    /// sequence being filtered.
    pub fn eval(&self, index: usize, item: &Value) -> Result<bool> {
        match self {
            FilterExpr::Logical { op, left, right } => {
                let l = left.eval(index, item)?;
                let r = right.eval(index, item)?;
                Ok(match op {
                    LogicalOp::And => l && r,
                    LogicalOp::Or => l || r,
                })
            }
            FilterExpr::Comparative(cmp) => cmp.eval(index, item),
        }
    }
}

impl Comparison {
    fn eval(&self, index: usize, item: &Value) -> Result<bool> {
        if self.op == CompareOp::Index {
            return match self.left {
                Atom::Int(n) => Ok(i64::try_from(index).is_ok_and(|i| i == n)),
                Atom::Str(_) => Err(QueryError::InvalidFilter {
                    filter: self.to_string(),
                    reason: "a filter without an operator must be an integer index".into(),
                }),
            };
        }
        let name = match &self.left {
            Atom::Str(name) => name,
            Atom::Int(_) => {
                return Err(QueryError::InvalidFilter {
                    filter: self.to_string(),
                    reason: "left side of a comparison must be a field name".into(),
                })
            }
        };
        let value = field(item, name)?;
        match &self.right {
            Some(Atom::Str(literal)) => {
                let actual = string_value(value, name)?;
                Ok(compare_strings(self.op, &actual, literal))
            }
            Some(Atom::Int(literal)) => {
                let actual = match value {
                    Value::Number(n) => n,
                    other => return Err(QueryError::type_mismatch(name, "number", other)),
                };
                Ok(compare_numbers(self.op, actual, *literal))
            }
            None => Err(QueryError::InvalidFilter {
                filter: self.to_string(),
                reason: "comparison is missing its right-hand side".into(),
            }),
        }
    }
}

fn field<'v>(item: &'v Value, name: &str) -> Result<&'v Value> {
    let map = item
        .as_object()
        .ok_or_else(|| QueryError::type_mismatch(name, "object", item))?;
    map.get(name).ok_or_else(|| QueryError::NotFound {
        path: name.to_string(),
    })
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Str(s) => write_key(f, s),
            Atom::Int(n) => write!(f, "{n}"),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.left, &self.right) {
            (Atom::Str(_), Some(Atom::Str(s))) => write!(f, "{}{}\"{s}\"", self.left, self.op.as_str()),
            (left, Some(right)) => write!(f, "{left}{}{right}", self.op.as_str()),
            (left, None) => write!(f, "{left}"),
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Logical { op, left, right } => {
                let op = match op {
                    LogicalOp::And => "&&",
                    LogicalOp::Or => "||",
                };
                write!(f, "{left}{op}{right}")
            }
            FilterExpr::Comparative(cmp) => write!(f, "{cmp}"),
        }
    }
}

/// Writes a key bare when it lexes back as a symbol, quoted otherwise.
pub(crate) fn write_key(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    let mut chars = key.chars();
    let bare = chars.next().is_some_and(char::is_alphabetic)
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    if bare {
        f.write_str(key)
    } else {
        write!(f, "\"{key}\"")
    }
}

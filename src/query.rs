use std::fmt;

use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{QueryError, Result};
use crate::filter::{parse_logical, write_key, FilterExpr};
use crate::lexer::{Lexer, TokenKind};

/// One dotted key of a parsed query. The chain runs backwards: the step
/// returned by [`parse_path`] is the last key, and `parent` links towards
/// the first one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<Box<PathStep>>,
    key: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    optional: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    filters: Vec<FilterExpr>,
}

/// Result of evaluating a path against a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Matched<'a> {
    /// Plain key lookup without filters.
    One(&'a Value),
    /// What survived the filters of the final step.
    Many(Vec<&'a Value>),
}

impl<'a> Matched<'a> {
    pub fn into_values(self) -> Vec<&'a Value> {
        match self {
            Matched::One(v) => vec![v],
            Matched::Many(vs) => vs,
        }
    }
}

/// Parses `path := ['?'] key ('.' key)* filter*`.
pub fn parse_path(text: &str) -> Result<PathStep> {
    let mut lexer = Lexer::new(text);

    let mut token = lexer
        .next_token()?
        .ok_or_else(|| lexer.unexpected_end("key"))?;
    let optional = token.kind == TokenKind::Question;
    if optional {
        token = lexer
            .next_token()?
            .ok_or_else(|| lexer.unexpected_end("key"))?;
    }
    let key = match token.kind {
        TokenKind::Str(key) => key,
        _ => return Err(lexer.unexpected(&token, "key")),
    };
    let mut step = PathStep {
        parent: None,
        key,
        optional,
        filters: Vec::new(),
    };

    while let Some(token) = lexer.next_token()? {
        if token.kind != TokenKind::Dot {
            lexer.unget(token);
            break;
        }
        let token = lexer
            .next_token()?
            .ok_or_else(|| lexer.unexpected_end("key after '.'"))?;
        let key = match token.kind {
            TokenKind::Str(key) => key,
            _ => return Err(lexer.unexpected(&token, "key after '.'")),
        };
        step = PathStep {
            parent: Some(Box::new(step)),
            key,
            optional: false,
            filters: Vec::new(),
        };
    }

    while let Some(token) = lexer.next_token()? {
        if token.kind != TokenKind::LBracket {
            return Err(lexer.unexpected(&token, "'[' or end of query"));
        }
        step.filters.push(parse_logical(&mut lexer)?);
    }

    tracing::trace!(query = text, parsed = %step, "parsed path");
    Ok(step)
}

impl PathStep {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn parent(&self) -> Option<&PathStep> {
        self.parent.as_deref()
    }

    pub fn filters(&self) -> &[FilterExpr] {
        &self.filters
    }

    /// A `?` before the first key makes the whole path optional.
    pub fn is_optional(&self) -> bool {
        match &self.parent {
            Some(parent) => parent.is_optional(),
            None => self.optional,
        }
    }

    /// Keys from the first step to this one, without filters or `?`.
    pub fn dotted(&self) -> String {
        self.keys().iter().join(".")
    }

    fn keys(&self) -> Vec<&str> {
        let mut keys = match &self.parent {
            Some(parent) => parent.keys(),
            None => Vec::new(),
        };
        keys.push(&self.key);
        keys
    }

    pub fn eval<'a>(&self, value: &'a Value) -> Result<Matched<'a>> {
        let child = self.resolve(value, self.is_optional())?;
        if self.filters.is_empty() {
            return Ok(Matched::One(child));
        }

        let mut items: Vec<&'a Value> = match child {
            Value::Array(arr) => arr.iter().collect(),
            other => vec![other],
        };
        for filter in &self.filters {
            let mut kept = Vec::with_capacity(items.len());
            for (idx, item) in items.into_iter().enumerate() {
                if filter.eval(idx, item)? {
                    kept.push(item);
                }
            }
            tracing::trace!(filter = %filter, kept = kept.len(), "applied filter");
            items = kept;
        }
        Ok(Matched::Many(items))
    }

    // Key lookup along the chain; only the final step carries filters.
    fn resolve<'a>(&self, value: &'a Value, optional: bool) -> Result<&'a Value> {
        let value = match &self.parent {
            Some(parent) => parent.resolve(value, optional)?,
            None => value,
        };
        let map = value
            .as_object()
            .ok_or_else(|| QueryError::type_mismatch(self.dotted(), "object", value))?;
        match map.get(&self.key) {
            Some(child) => Ok(child),
            None if optional => Err(QueryError::OptionalMissing { path: self.dotted() }),
            None => Err(QueryError::NotFound { path: self.dotted() }),
        }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => {
                write!(f, "{parent}.")?;
            }
            None if self.optional => f.write_str("?")?,
            None => {}
        }
        write_key(f, &self.key)?;
        for filter in &self.filters {
            write!(f, "[{filter}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "issue": {
                "key": "OP-1",
                "fields": {"project": {"name": "Operations"}},
                "changelog": {
                    "items": [
                        {"fieldId": "assignee", "toString": "A", "fromString": null},
                        {"fieldId": "status", "toString": "Done", "fromString": "Open"},
                        {"fieldId": "assignee", "toString": "B", "fromString": "A"}
                    ]
                }
            }
        })
    }

    #[test]
    fn chain_is_built_left_to_right() {
        let path = parse_path("?a.b.c").unwrap();
        assert_eq!(path.key(), "c");
        assert_eq!(path.parent().unwrap().key(), "b");
        assert!(path.is_optional());
        assert_eq!(path.dotted(), "a.b.c");
        assert_eq!(path.to_string(), "?a.b.c");
    }

    #[test]
    fn filters_attach_to_the_last_step() {
        let path = parse_path(r#"issue.changelog.items[fieldId=="assignee"][0]"#).unwrap();
        assert_eq!(path.filters().len(), 2);
        assert!(path.parent().unwrap().filters().is_empty());
        assert_eq!(path.to_string(), r#"issue.changelog.items[fieldId=="assignee"][0]"#);
    }

    #[test]
    fn syntax_errors() {
        for bad in ["", "?", ".a", "a.", "a..b", "a[0", "a[0]b", "a[0].b", "a?b", "a[]", "a[==1]"] {
            assert!(
                matches!(parse_path(bad), Err(QueryError::Syntax { .. })),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn plain_lookup() {
        let root = sample();
        assert_eq!(
            parse_path("issue.fields.project.name").unwrap().eval(&root).unwrap(),
            Matched::One(&json!("Operations"))
        );
    }

    #[test]
    fn filters_narrow_in_order() {
        let root = sample();
        let all = parse_path(r#"issue.changelog.items[fieldId=="assignee"]"#)
            .unwrap()
            .eval(&root)
            .unwrap()
            .into_values();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1]["toString"], "B");

        let first = parse_path(r#"issue.changelog.items[fieldId=="assignee"][1]"#)
            .unwrap()
            .eval(&root)
            .unwrap()
            .into_values();
        assert_eq!(first, vec![&root["issue"]["changelog"]["items"][2]]);
    }

    #[test]
    fn scalar_is_filtered_as_a_singleton() {
        let root = json!({"a": {"k": 1}});
        assert_eq!(
            parse_path("a[0]").unwrap().eval(&root).unwrap(),
            Matched::Many(vec![&root["a"]])
        );
        assert_eq!(
            parse_path("a[1]").unwrap().eval(&root).unwrap(),
            Matched::Many(vec![])
        );
    }

    #[test]
    fn missing_and_mismatched_keys() {
        let root = sample();
        assert_eq!(
            parse_path("issue.fields.nope.name").unwrap().eval(&root),
            Err(QueryError::NotFound { path: "issue.fields.nope".into() })
        );
        assert_eq!(
            parse_path("?issue.fields.nope.name").unwrap().eval(&root),
            Err(QueryError::OptionalMissing { path: "issue.fields.nope".into() })
        );
        assert_eq!(
            parse_path("issue.key.x").unwrap().eval(&root),
            Err(QueryError::TypeMismatch {
                path: "issue.key.x".into(),
                expected: "object",
                actual: "string",
            })
        );
    }

    #[test]
    fn evaluation_is_repeatable() {
        let root = sample();
        let path = parse_path("issue.key").unwrap();
        assert_eq!(path.eval(&root), path.eval(&root));
    }
}

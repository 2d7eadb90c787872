use serde_json::Value;

use crate::errors::{QueryError, Result};
use crate::query::{parse_path, Matched, PathStep};

// =========================
// Public API (getters)
// =========================

/// Evaluate `path` against `root`. A plain dotted path yields
/// [`Matched::One`]; a path ending in filters yields [`Matched::Many`].
pub fn get<'a>(root: &'a Value, path: &str) -> Result<Matched<'a>> {
    parse_path(path)?.eval(root)
}

/// Resolve `path` to exactly one value.
pub fn get_one<'a>(root: &'a Value, path: &str) -> Result<&'a Value> {
    one(&parse_path(path)?, root)
}

/// String at `path`. `null` and missing optional paths read as `""`.
pub fn get_string(root: &Value, path: &str) -> Result<String> {
    match get_one(root, path) {
        Ok(v) => string_value(v, path),
        Err(QueryError::OptionalMissing { .. }) => Ok(String::new()),
        Err(e) => Err(e),
    }
}

pub fn get_number(root: &Value, path: &str) -> Result<f64> {
    number_value(get_one(root, path)?, path)
}

/// Number at `path`, truncated toward zero.
pub fn get_integer(root: &Value, path: &str) -> Result<i64> {
    integer_value(get_one(root, path)?, path)
}

pub fn get_boolean(root: &Value, path: &str) -> Result<bool> {
    boolean_value(get_one(root, path)?, path)
}

pub(crate) fn one<'a>(path: &PathStep, root: &'a Value) -> Result<&'a Value> {
    match path.eval(root)? {
        Matched::One(v) => Ok(v),
        Matched::Many(values) => match values.as_slice() {
            [v] => Ok(*v),
            [] if path.is_optional() => Err(QueryError::OptionalMissing {
                path: path.to_string(),
            }),
            [] => Err(QueryError::NotFound {
                path: path.to_string(),
            }),
            _ => Err(QueryError::MultipleResults {
                query: path.to_string(),
                count: values.len(),
            }),
        },
    }
}

pub(crate) fn string_value(value: &Value, path: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(QueryError::type_mismatch(path, "string", other)),
    }
}

pub(crate) fn number_value(value: &Value, path: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| QueryError::type_mismatch(path, "number", value))
}

pub(crate) fn integer_value(value: &Value, path: &str) -> Result<i64> {
    match value.as_i64() {
        Some(n) => Ok(n),
        // `as` truncates toward zero and saturates at the i64 bounds
        None => number_value(value, path).map(|f| f as i64),
    }
}

pub(crate) fn boolean_value(value: &Value, path: &str) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| QueryError::type_mismatch(path, "boolean", value))
}

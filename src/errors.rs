use thiserror::Error; // Import the `Error` derive macro from the `thiserror` crate

// Every failure the query engine can report. Errors are plain data so a
// selection context can hold on to the first one and hand out clones.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    // Malformed query text; `offset` is a byte offset into the query
    #[error("syntax error at offset {offset}: {message} (after '{consumed}', before '{remaining}')")]
    Syntax {
        message: String,
        offset: usize,
        consumed: String,
        remaining: String,
    },

    // A required key is missing at some prefix of the path
    #[error("element '{path}' not found")]
    NotFound { path: String },

    // An optional path did not resolve; getters and the extractor treat this as "no value"
    #[error("optional element '{path}' missing")]
    OptionalMissing { path: String },

    #[error("value of '{path}' is {actual}, expected {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("'{query}' matched {count} elements where one was expected")]
    MultipleResults { query: String, count: usize },

    #[error("selection is empty")]
    EmptySelection,

    #[error("invalid extraction target: {0}")]
    InvalidTarget(String),

    #[error("field '{field}' has unsupported type {type_name}")]
    UnsupportedFieldType {
        field: &'static str,
        type_name: &'static str,
    },

    #[error("invalid filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    // A record was asked to set a field it does not declare
    #[error("record has no field named '{0}'")]
    UnknownField(String),
}

impl QueryError {
    pub fn is_optional_missing(&self) -> bool {
        matches!(self, QueryError::OptionalMissing { .. })
    }

    pub(crate) fn type_mismatch(
        path: impl Into<String>,
        expected: &'static str,
        actual: &serde_json::Value,
    ) -> Self {
        QueryError::TypeMismatch {
            path: path.into(),
            expected,
            actual: type_name(actual),
        }
    }
}

/// Name of the dynamic JSON type, as used in error messages.
pub fn type_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Type alias for results that use `QueryError` as the error type
pub type Result<T> = std::result::Result<T, QueryError>;

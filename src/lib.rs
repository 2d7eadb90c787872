//! Dotted path queries with bracketed filters over `serde_json::Value`,
//! plus extraction of the selected values into typed records.
//!
//! ```
//! use serde_json::json;
//!
//! let v = json!({"issue": {"key": "OP-1", "fields": {"project": {"name": "Operations"}}}});
//! assert_eq!(jsonq::get_string(&v, "issue.fields.project.name").unwrap(), "Operations");
//! ```
//!
//! Queries are parsed on every call and evaluated against a borrowed value,
//! so the value cannot change while a query runs.

pub mod errors;
pub mod context;
pub mod extract;
pub mod filter;
pub mod getters;
pub mod lexer;
pub mod query;
mod comparison;

pub use context::{new_context, Context, Selection};
pub use errors::{QueryError, Result};
pub use extract::{FieldKind, FieldSpec, FieldType, Record, Scalar, Target};
pub use getters::{get, get_boolean, get_integer, get_number, get_one, get_string};
pub use query::{parse_path, Matched, PathStep};

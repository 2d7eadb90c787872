use itertools::Itertools;
use serde_json::Value;

use crate::errors::{QueryError, Result};
use crate::extract::Target;
use crate::query::{parse_path, Matched};

/// The values currently in focus, plus the queries that selected them.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    values: Vec<&'a Value>,
    trail: Vec<String>,
}

impl<'a> Selection<'a> {
    pub fn values(&self) -> &[&'a Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The chain of selects that produced this selection, for messages.
    pub fn describe(&self) -> String {
        if self.trail.is_empty() {
            "<root>".to_string()
        } else {
            self.trail.iter().join(" | ")
        }
    }
}

/// Chained selection over one JSON root.
///
/// The first failing `select` latches its error: every later `select` is a
/// no-op and `extract` returns that error. A context mutates itself in place
/// and is not meant to be shared across threads.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    state: Result<Selection<'a>>,
}

/// Create a selection context whose selection is just `root`.
pub fn new_context(root: &Value) -> Context<'_> {
    Context::new(root)
}

impl<'a> Context<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            state: Ok(Selection {
                values: vec![root],
                trail: Vec::new(),
            }),
        }
    }

    /// Run `path` against every selected value and make the flattened
    /// results the new selection.
    pub fn select(&mut self, path: &str) -> &mut Self {
        let result = match &self.state {
            Ok(selection) => select_all(&selection.values, path),
            Err(_) => return self,
        };
        match result {
            Ok(values) => {
                tracing::debug!(query = path, selected = values.len(), "select");
                if let Ok(selection) = &mut self.state {
                    selection.values = values;
                    selection.trail.push(path.to_string());
                }
            }
            Err(e) => {
                tracing::debug!(query = path, error = %e, "select failed");
                self.state = Err(e);
            }
        }
        self
    }

    /// Populate `target` from the current selection.
    pub fn extract<T: Target + ?Sized>(&self, target: &mut T) -> Result<()> {
        let selection = self.state.as_ref().map_err(Clone::clone)?;
        target.fill(selection)?;
        tracing::debug!(from = %selection.describe(), values = selection.len(), "extracted");
        Ok(())
    }

    pub fn selection(&self) -> Result<&Selection<'a>> {
        self.state.as_ref().map_err(Clone::clone)
    }

    /// The latched error, if any select has failed.
    pub fn error(&self) -> Option<&QueryError> {
        self.state.as_ref().err()
    }

    pub fn into_values(self) -> Result<Vec<&'a Value>> {
        self.state.map(|selection| selection.values)
    }
}

fn select_all<'a>(values: &[&'a Value], path: &str) -> Result<Vec<&'a Value>> {
    let path = parse_path(path)?;
    let mut out = Vec::new();
    for value in values {
        match path.eval(value) {
            Ok(Matched::One(v)) => out.push(v),
            Ok(Matched::Many(vs)) => out.extend(vs),
            Err(QueryError::OptionalMissing { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

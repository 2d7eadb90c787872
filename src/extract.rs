use serde_json::Value;

use crate::context::Selection;
use crate::errors::{QueryError, Result};
use crate::getters::{boolean_value, integer_value, number_value, one, string_value};
use crate::query::parse_path;

/// How the extractor reads a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    /// A field the extractor cannot populate; extraction fails naming the type.
    Unsupported(&'static str),
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Unsupported(type_name) => type_name,
        }
    }
}

/// Static description of one annotated record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Query path; a leading `?` makes the field optional.
    pub path: &'static str,
    pub kind: FieldKind,
}

/// A value read for a field, already converted according to its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
}

impl Scalar {
    fn kind_name(&self) -> &'static str {
        match self {
            Scalar::String(_) => "string",
            Scalar::Number(_) => "number",
            Scalar::Integer(_) => "integer",
            Scalar::Boolean(_) => "boolean",
        }
    }
}

/// Rust types that can back an annotated field.
pub trait FieldType: Sized {
    const KIND: FieldKind;
    fn from_scalar(value: Scalar) -> Option<Self>;
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::String;
    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Number;
    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Number(n) => Some(n),
            Scalar::Integer(n) => Some(n as f64),
            _ => None,
        }
    }
}

impl FieldType for i64 {
    const KIND: FieldKind = FieldKind::Integer;
    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Integer(n) => Some(n),
            _ => None,
        }
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Boolean;
    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Boolean(b) => Some(b),
            _ => None,
        }
    }
}

/// Converts a scalar for the field `field`; used by `record!`.
pub fn convert<T: FieldType>(field: &str, value: Scalar) -> Result<T> {
    let actual = value.kind_name();
    T::from_scalar(value).ok_or_else(|| QueryError::TypeMismatch {
        path: field.to_string(),
        expected: T::KIND.name(),
        actual,
    })
}

/// A record shape the extractor can populate. Usually implemented with
/// [`record!`](crate::record).
pub trait Record: Default {
    fn fields() -> &'static [FieldSpec];
    fn set_field(&mut self, name: &str, value: Scalar) -> Result<()>;
}

impl<R: Record> Record for Box<R> {
    fn fields() -> &'static [FieldSpec] {
        R::fields()
    }

    fn set_field(&mut self, name: &str, value: Scalar) -> Result<()> {
        (**self).set_field(name, value)
    }
}

/// Something a selection can be extracted into.
pub trait Target {
    fn fill(&mut self, selection: &Selection<'_>) -> Result<()>;
}

/// A single record takes exactly one selected value.
impl<R: Record> Target for R {
    fn fill(&mut self, selection: &Selection<'_>) -> Result<()> {
        match selection.values() {
            [] => Err(QueryError::EmptySelection),
            [value] => populate(self, value),
            values => Err(QueryError::MultipleResults {
                query: selection.describe(),
                count: values.len(),
            }),
        }
    }
}

/// One record per selected value, appended in selection order.
impl<R: Record> Target for Vec<R> {
    fn fill(&mut self, selection: &Selection<'_>) -> Result<()> {
        let records = selection
            .values()
            .iter()
            .map(|value| build::<R>(value))
            .collect::<Result<Vec<R>>>()?;
        self.extend(records);
        Ok(())
    }
}

/// A fixed slice cannot grow, so the selection must match its length.
impl<R: Record> Target for [R] {
    fn fill(&mut self, selection: &Selection<'_>) -> Result<()> {
        if self.len() != selection.len() {
            return Err(QueryError::InvalidTarget(format!(
                "slice of {} records cannot hold {} selected values",
                self.len(),
                selection.len()
            )));
        }
        let records = selection
            .values()
            .iter()
            .map(|value| build::<R>(value))
            .collect::<Result<Vec<R>>>()?;
        for (slot, record) in self.iter_mut().zip(records) {
            *slot = record;
        }
        Ok(())
    }
}

fn build<R: Record>(value: &Value) -> Result<R> {
    let mut record = R::default();
    populate(&mut record, value)?;
    Ok(record)
}

// Every field is resolved before any is assigned, so a failure leaves the
// record untouched.
fn populate<R: Record>(record: &mut R, value: &Value) -> Result<()> {
    let mut resolved = Vec::with_capacity(R::fields().len());
    for spec in R::fields() {
        if let Some(scalar) = resolve_field(spec, value)? {
            resolved.push((spec.name, scalar));
        }
    }
    for (name, scalar) in resolved {
        record.set_field(name, scalar)?;
    }
    Ok(())
}

fn resolve_field(spec: &FieldSpec, value: &Value) -> Result<Option<Scalar>> {
    if let FieldKind::Unsupported(type_name) = spec.kind {
        return Err(unsupported(spec, type_name));
    }
    let path = parse_path(spec.path)?;
    let found = match one(&path, value) {
        Ok(found) => found,
        Err(QueryError::OptionalMissing { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };
    if found.is_null() && path.is_optional() && spec.kind != FieldKind::String {
        return Ok(None);
    }
    let scalar = match spec.kind {
        FieldKind::String => Scalar::String(string_value(found, spec.path)?),
        FieldKind::Number => Scalar::Number(number_value(found, spec.path)?),
        FieldKind::Integer => Scalar::Integer(integer_value(found, spec.path)?),
        FieldKind::Boolean => Scalar::Boolean(boolean_value(found, spec.path)?),
        FieldKind::Unsupported(type_name) => return Err(unsupported(spec, type_name)),
    };
    tracing::trace!(field = spec.name, path = spec.path, "resolved field");
    Ok(Some(scalar))
}

fn unsupported(spec: &FieldSpec, type_name: &'static str) -> QueryError {
    QueryError::UnsupportedFieldType {
        field: spec.name,
        type_name,
    }
}

/// Declares a struct whose fields are filled from query paths.
///
/// ```
/// use jsonq::{new_context, record};
///
/// record! {
///     #[derive(Debug, Default)]
///     pub struct Assignment {
///         #[jsonq("?fromString")]
///         pub from: String,
///         #[jsonq("?toString")]
///         pub to: String,
///     }
/// }
///
/// let v = serde_json::json!({"items": [{"toString": "A", "fromString": null}]});
/// let mut out: Vec<Assignment> = Vec::new();
/// new_context(&v).select("items[0]").extract(&mut out).unwrap();
/// assert_eq!(out[0].to, "A");
/// ```
///
/// Fields without a `#[jsonq(..)]` attribute are left alone by extraction and
/// keep whatever `Default` gave them. The attribute must come before any other
/// field attributes.
#[macro_export]
macro_rules! record {
    (@munch [$($head:tt)*] $name:ident { $($fields:tt)* } { $($specs:tt)* }
        #[jsonq($path:literal)]
        $(#[$field_meta:meta])*
        $field_vis:vis $field:ident : $ty:ty
        $(, $($rest:tt)*)?
    ) => {
        $crate::record! {
            @munch [$($head)*] $name
            { $($fields)* $(#[$field_meta])* $field_vis $field: $ty, }
            { $($specs)* ($field, $path, $ty) }
            $($($rest)*)?
        }
    };
    (@munch [$($head:tt)*] $name:ident { $($fields:tt)* } { $($specs:tt)* }
        $(#[$field_meta:meta])*
        $field_vis:vis $field:ident : $ty:ty
        $(, $($rest:tt)*)?
    ) => {
        $crate::record! {
            @munch [$($head)*] $name
            { $($fields)* $(#[$field_meta])* $field_vis $field: $ty, }
            { $($specs)* }
            $($($rest)*)?
        }
    };
    (@munch [$($head:tt)*] $name:ident { $($fields:tt)* }
        { $(($field:ident, $path:literal, $ty:ty))* }
    ) => {
        $($head)* struct $name {
            $($fields)*
        }

        impl $crate::extract::Record for $name {
            fn fields() -> &'static [$crate::extract::FieldSpec] {
                const FIELDS: &[$crate::extract::FieldSpec] = &[
                    $(
                        $crate::extract::FieldSpec {
                            name: stringify!($field),
                            path: $path,
                            kind: <$ty as $crate::extract::FieldType>::KIND,
                        },
                    )*
                ];
                FIELDS
            }

            fn set_field(
                &mut self,
                name: &str,
                value: $crate::extract::Scalar,
            ) -> $crate::Result<()> {
                $(
                    if name == stringify!($field) {
                        self.$field = $crate::extract::convert::<$ty>(name, value)?;
                        return Ok(());
                    }
                )*
                let _ = value;
                Err($crate::QueryError::UnknownField(name.to_string()))
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        $crate::record! {
            @munch [$(#[$meta])* $vis] $name {} {}
            $($body)*
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    crate::record! {
        #[derive(Debug, Default, PartialEq)]
        struct Change {
            #[jsonq("fieldId")]
            field: String,
            #[jsonq("?priority")]
            priority: i64,
            #[jsonq("?weight")]
            weight: f64,
            #[jsonq("?flagged")]
            flagged: bool,
        }
    }

    crate::record! {
        #[derive(Debug, Default, PartialEq)]
        struct Annotated {
            #[jsonq("name")]
            name: String,
            note: String,
            /// Not a supported field kind, but never looked up.
            tags: Vec<String>,
            #[jsonq("?age")]
            age: i64,
        }
    }

    #[derive(Debug, Default)]
    struct Tags {
        tags: Vec<String>,
    }

    impl Record for Tags {
        fn fields() -> &'static [FieldSpec] {
            const FIELDS: &[FieldSpec] = &[FieldSpec {
                name: "tags",
                path: "tags",
                kind: FieldKind::Unsupported("Vec<String>"),
            }];
            FIELDS
        }

        fn set_field(&mut self, name: &str, _value: Scalar) -> Result<()> {
            Err(QueryError::UnknownField(name.to_string()))
        }
    }

    #[test]
    fn kinds_follow_the_field_types() {
        let kinds: Vec<_> = Change::fields().iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![FieldKind::String, FieldKind::Integer, FieldKind::Number, FieldKind::Boolean]
        );
    }

    #[test]
    fn plain_fields_are_not_extracted() {
        let names: Vec<_> = Annotated::fields().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["name", "age"]);

        let v = json!({"name": "Alice", "note": "ignored", "tags": ["x"], "age": 29});
        let mut person = Annotated {
            note: "kept".into(),
            ..Annotated::default()
        };
        Context::new(&v).extract(&mut person).unwrap();
        assert_eq!(
            person,
            Annotated {
                name: "Alice".into(),
                note: "kept".into(),
                tags: Vec::new(),
                age: 29,
            }
        );
        assert_eq!(
            person.set_field("note", Scalar::String("x".into())),
            Err(QueryError::UnknownField("note".into()))
        );
    }

    #[test]
    fn optional_fields_keep_defaults() {
        let v = json!({"fieldId": "status", "priority": 3.9, "flagged": null});
        let mut change = Change::default();
        Context::new(&v).extract(&mut change).unwrap();
        assert_eq!(
            change,
            Change {
                field: "status".into(),
                priority: 3,
                weight: 0.0,
                flagged: false,
            }
        );
    }

    #[test]
    fn failed_extraction_leaves_the_record_untouched() {
        let v = json!({"fieldId": "status", "priority": "high"});
        let mut change = Change::default();
        let err = Context::new(&v).extract(&mut change).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { expected: "number", .. }));
        assert_eq!(change, Change::default());
    }

    #[test]
    fn unsupported_field_types() {
        let v = json!({"tags": ["a"]});
        let mut tags = Tags::default();
        assert_eq!(
            Context::new(&v).extract(&mut tags),
            Err(QueryError::UnsupportedFieldType {
                field: "tags",
                type_name: "Vec<String>",
            })
        );
        assert!(tags.tags.is_empty());
    }

    #[test]
    fn slices_must_match_the_selection() {
        let v = json!({"items": [{"fieldId": "a"}, {"fieldId": "b"}]});
        let mut ctx = Context::new(&v);
        ctx.select("items[fieldId!=\"\"]");

        let mut three: [Change; 3] = Default::default();
        assert!(matches!(
            ctx.extract(&mut three[..]),
            Err(QueryError::InvalidTarget(_))
        ));

        let mut two: [Change; 2] = Default::default();
        ctx.extract(&mut two[..]).unwrap();
        assert_eq!(two[1].field, "b");
    }

    #[test]
    fn boxed_records() {
        let v = json!({"items": [{"fieldId": "a"}, {"fieldId": "b"}]});
        let mut out: Vec<Box<Change>> = Vec::new();
        Context::new(&v)
            .select("items[fieldId==\"b\"]")
            .extract(&mut out)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].field, "b");
    }

    #[test]
    fn convert_rejects_mismatched_scalars() {
        assert_eq!(convert::<f64>("w", Scalar::Integer(2)).unwrap(), 2.0);
        assert_eq!(
            convert::<i64>("n", Scalar::String("x".into())),
            Err(QueryError::TypeMismatch {
                path: "n".into(),
                expected: "integer",
                actual: "string",
            })
        );
    }
}

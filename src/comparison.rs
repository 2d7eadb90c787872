use std::cmp::Ordering;

use serde_json::Number;

use crate::lexer::CompareOp;

fn holds(op: CompareOp, ord: Ordering) -> bool {
    match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Neq => ord != Ordering::Equal,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Ge => ord != Ordering::Less,
        // Positional; never reaches a value comparison
        CompareOp::Index => false,
    }
}

/// Lexicographic (byte-wise) comparison of a field value against a literal.
pub fn compare_strings(op: CompareOp, field: &str, literal: &str) -> bool {
    holds(op, field.cmp(literal))
}

/// Numeric comparison of a field value against an integer literal. Integral
/// fields compare exactly; only fractional ones go through `f64`.
pub fn compare_numbers(op: CompareOp, field: &Number, literal: i64) -> bool {
    if let Some(n) = field.as_i64() {
        return holds(op, n.cmp(&literal));
    }
    if field.is_u64() {
        // above i64::MAX
        return holds(op, Ordering::Greater);
    }
    match field.as_f64().and_then(|f| f.partial_cmp(&(literal as f64))) {
        Some(ord) => holds(op, ord),
        None => op == CompareOp::Neq,
    }
}

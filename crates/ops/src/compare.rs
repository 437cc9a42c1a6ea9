//! Pure comparison over dynamic [`Value`]s (C3's `Compare`).

use errors::{EngineError, EngineResult};
use value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn parse(s: &str) -> Option<CompareOp> {
        match s {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            _ => None,
        }
    }
}

/// Compares `lhs` and `rhs` under `op`.
///
/// - Both `Bool`: only `eq`/`ne`; any ordering operator errors.
/// - Both `String`: lexicographic.
/// - Otherwise: both sides coerce to `f64`. A `Bool` operand mixed with
///   anything non-bool is an error on *every* operator, including
///   ordering - unlike the original, which only rejected a bool/non-bool
///   mix for equality and let it silently coerce toward 0.0/1.0 for
///   ordering comparisons. Mixing `String` with numeric is also an
///   error.
pub fn compare(lhs: &Value, rhs: &Value, op: CompareOp) -> EngineResult<bool> {
    if let (Value::Bool(a), Value::Bool(b)) = (lhs, rhs) {
        return match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Ne => Ok(a != b),
            _ => Err(EngineError::invalid_argument("cannot order bool values")),
        };
    }
    if matches!(lhs, Value::Bool(_)) || matches!(rhs, Value::Bool(_)) {
        return Err(EngineError::type_mismatch("cannot compare bool with a non-bool value"));
    }
    if let (Value::String(a), Value::String(b)) = (lhs, rhs) {
        return Ok(apply(a.cmp(b), op));
    }
    if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) {
        return Err(EngineError::type_mismatch("cannot compare string with a numeric value"));
    }
    let a = lhs
        .as_f64()
        .ok_or_else(|| EngineError::type_mismatch(format!("cannot compare {} numerically", lhs.type_name())))?;
    let b = rhs
        .as_f64()
        .ok_or_else(|| EngineError::type_mismatch(format!("cannot compare {} numerically", rhs.type_name())))?;
    Ok(apply(a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal), op))
}

fn apply(ordering: std::cmp::Ordering, op: CompareOp) -> bool {
    use std::cmp::Ordering::*;
    match (op, ordering) {
        (CompareOp::Eq, Equal) => true,
        (CompareOp::Ne, Equal) => false,
        (CompareOp::Ne, _) => true,
        (CompareOp::Lt, Less) => true,
        (CompareOp::Le, Less | Equal) => true,
        (CompareOp::Gt, Greater) => true,
        (CompareOp::Ge, Greater | Equal) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetry_of_eq() {
        let a = Value::Int(3);
        let b = Value::Float(3.0);
        assert_eq!(compare(&a, &b, CompareOp::Eq).unwrap(), compare(&b, &a, CompareOp::Eq).unwrap());
    }

    #[test]
    fn lt_gt_are_mirrors() {
        let a = Value::Int(1);
        let b = Value::Int(2);
        assert_eq!(compare(&a, &b, CompareOp::Lt).unwrap(), compare(&b, &a, CompareOp::Gt).unwrap());
    }

    #[test]
    fn bool_ordering_errors() {
        assert!(compare(&Value::Bool(true), &Value::Bool(false), CompareOp::Lt).is_err());
    }

    #[test]
    fn bool_numeric_mix_errors_even_for_ordering() {
        assert!(compare(&Value::Bool(true), &Value::Int(1), CompareOp::Lt).is_err());
    }

    #[test]
    fn string_lexicographic() {
        assert!(compare(&Value::String("a".into()), &Value::String("b".into()), CompareOp::Lt).unwrap());
    }
}

//! Structural subset match (C4's `MatchSubset`): does `candidate` contain
//! everything `expected` asks for.

use value::Value;

/// `expected` is a template the candidate must satisfy: every key
/// `expected` names must exist in `candidate` and match recursively;
/// `candidate` may carry extra keys. Lists must be the same length,
/// matched index by index. Scalars compare by value only against the same
/// variant - a type mismatch, including `Int` against `Float`, is `false` -
/// except floats, which are compared directly against the candidate: the
/// original's float branch compared a value to itself and so always
/// returned true no matter what the candidate held; that bug is not
/// reproduced here.
pub fn match_subset(expected: &Value, candidate: &Value) -> bool {
    match (expected, candidate) {
        (Value::Map(e), Value::Map(c)) => {
            e.iter().all(|(k, v)| c.get(k).is_some_and(|cv| match_subset(v, cv)))
        },
        (Value::List(e), Value::List(c)) => {
            e.len() == c.len() && e.iter().zip(c.iter()).all(|(ev, cv)| match_subset(ev, cv))
        },
        (Value::String(e), Value::String(c)) => e == c,
        (Value::Bool(e), Value::Bool(c)) => e == c,
        (Value::Int(e), Value::Int(c)) => e == c,
        (Value::Float(e), Value::Float(c)) => e == c,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(j: serde_json::Value) -> Value {
        j.into()
    }

    #[test]
    fn subset_with_extra_keys_matches() {
        let expected = v(json!({"1": {"2": "3"}}));
        let candidate = v(json!({"1": {"2": "3", "4": "5"}}));
        assert!(match_subset(&expected, &candidate));
    }

    #[test]
    fn mismatched_value_fails() {
        let expected = v(json!({"1": {"2": "3"}}));
        let candidate = v(json!({"1": {"2": "mismatch"}}));
        assert!(!match_subset(&expected, &candidate));
    }

    #[test]
    fn monotonic_under_extra_keys() {
        let expected = v(json!({"a": 1}));
        let small = v(json!({"a": 1}));
        let big = v(json!({"a": 1, "b": 2}));
        assert!(match_subset(&expected, &small));
        assert!(match_subset(&expected, &big));
    }

    #[test]
    fn float_compares_against_candidate_not_itself() {
        let expected = v(json!({"amount": 1.5}));
        let candidate = v(json!({"amount": 9.9}));
        assert!(!match_subset(&expected, &candidate));
    }

    #[test]
    fn int_and_float_are_a_type_mismatch() {
        let expected = v(json!({"amount": 5}));
        let candidate = v(json!({"amount": 5.0}));
        assert!(!match_subset(&expected, &candidate));
        assert!(!match_subset(&candidate, &expected));
    }
}

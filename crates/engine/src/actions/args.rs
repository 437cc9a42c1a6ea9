//! Small accessors for reading a rendered action arg map. Every action
//! reads from the same `IndexMap<String, Value>` shape, so these live in
//! one place rather than being re-derived per action.

use errors::{EngineError, EngineResult};
use indexmap::IndexMap;
use value::Value;

pub fn get<'a>(args: &'a IndexMap<String, Value>, key: &str) -> Option<&'a Value> {
    args.get(key)
}

pub fn require<'a>(args: &'a IndexMap<String, Value>, key: &str) -> EngineResult<&'a Value> {
    get(args, key).ok_or_else(|| EngineError::invalid_argument(format!("missing required argument {key:?}")))
}

pub fn require_str<'a>(args: &'a IndexMap<String, Value>, key: &str) -> EngineResult<&'a str> {
    require(args, key)?
        .as_str()
        .ok_or_else(|| EngineError::invalid_argument(format!("argument {key:?} must be a string")))
}

pub fn str_or<'a>(args: &'a IndexMap<String, Value>, key: &str, default: &'a str) -> &'a str {
    get(args, key).and_then(Value::as_str).unwrap_or(default)
}

pub fn str_opt<'a>(args: &'a IndexMap<String, Value>, key: &str) -> Option<&'a str> {
    get(args, key).and_then(Value::as_str)
}

pub fn bool_or(args: &IndexMap<String, Value>, key: &str, default: bool) -> bool {
    get(args, key).and_then(Value::as_bool).unwrap_or(default)
}

pub fn require_int(args: &IndexMap<String, Value>, key: &str) -> EngineResult<i64> {
    match require(args, key)? {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => Ok(*f as i64),
        _ => Err(EngineError::invalid_argument(format!("argument {key:?} must be numeric"))),
    }
}

pub fn string_map(args: &IndexMap<String, Value>, key: &str) -> IndexMap<String, String> {
    match get(args, key) {
        Some(Value::Map(m)) => {
            m.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect()
        },
        _ => IndexMap::new(),
    }
}

pub fn string_list(args: &IndexMap<String, Value>, key: &str) -> Vec<String> {
    match get(args, key) {
        Some(Value::List(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

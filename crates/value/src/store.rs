//! Path-addressable get/set over a [`crate::Value`] tree.

use errors::{EngineError, EngineResult};
use indexmap::IndexMap;

use crate::{path::Segment, Value, VariablePath};

/// The root of a plan's variable graph. Always backed by a [`Value::Map`]
/// at the top level, mirroring the original `map[string]interface{}`
/// variable bag.
#[derive(Debug, Clone)]
pub struct VariableStore {
    root: Value,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore {
    pub fn new() -> Self {
        Self { root: Value::empty_map() }
    }

    pub fn from_map(map: IndexMap<String, Value>) -> Self {
        Self { root: Value::Map(map) }
    }

    pub fn into_map(self) -> IndexMap<String, Value> {
        match self.root {
            Value::Map(m) => m,
            _ => IndexMap::new(),
        }
    }

    pub fn as_map(&self) -> &IndexMap<String, Value> {
        match &self.root {
            Value::Map(m) => m,
            _ => unreachable!("VariableStore root is always a Map"),
        }
    }

    /// Reads the value at `path`, unchanged from however it was stored.
    pub fn get(&self, path: &VariablePath) -> EngineResult<Value> {
        if path.is_empty() {
            return Err(EngineError::invalid_argument("empty variable path"));
        }
        get_recursive(&self.root, path.segments())
    }

    /// Convenience wrapper over [`Self::get`] for a raw dotted/indexed
    /// path string.
    pub fn get_str(&self, path: &str) -> EngineResult<Value> {
        self.get(&VariablePath::parse(path))
    }

    /// Writes `value` at `path`. Intermediate name segments auto-vivify
    /// as maps; index segments never do (the array must already be long
    /// enough). Writing over an existing scalar coerces numerically
    /// between `Int`/`Float` and rejects any other type change.
    pub fn set(&mut self, path: &VariablePath, value: Value) -> EngineResult<()> {
        if path.is_empty() {
            return Err(EngineError::invalid_argument("empty variable path"));
        }
        set_recursive(&mut self.root, path.segments(), value, false)
    }

    pub fn set_str(&mut self, path: &str, value: Value) -> EngineResult<()> {
        self.set(&VariablePath::parse(path), value)
    }

    /// Writes `value` at `path` regardless of the existing leaf's type,
    /// deleting any prior differently-typed value first. Used by the
    /// math evaluator, whose result is always a `Float64` even when the
    /// destination previously held an `Int` or didn't exist.
    pub fn force_set(&mut self, path: &VariablePath, value: Value) -> EngineResult<()> {
        if path.is_empty() {
            return Err(EngineError::invalid_argument("empty variable path"));
        }
        set_recursive(&mut self.root, path.segments(), value, true)
    }

    pub fn force_set_str(&mut self, path: &str, value: Value) -> EngineResult<()> {
        self.force_set(&VariablePath::parse(path), value)
    }
}

fn get_recursive(current: &Value, segs: &[Segment]) -> EngineResult<Value> {
    let (head, rest) = segs.split_first().expect("non-empty path");
    match head {
        Segment::Name(name) => {
            let Value::Map(map) = current else {
                return Err(EngineError::type_mismatch(format!(
                    "cannot index {} by name {name:?}",
                    current.type_name()
                )));
            };
            let Some(found) = map.get(name) else {
                return Err(EngineError::not_found(format!("variable {name:?} does not exist")));
            };
            if rest.is_empty() {
                Ok(found.clone())
            } else {
                get_recursive(found, rest)
            }
        },
        Segment::Index(idx) => {
            let Value::List(list) = current else {
                return Err(EngineError::type_mismatch(format!(
                    "cannot index {} by position {idx}",
                    current.type_name()
                )));
            };
            if *idx >= list.len() {
                return Err(EngineError::index_out_of_range(format!(
                    "index {idx} out of range (len {})",
                    list.len()
                )));
            }
            if rest.is_empty() {
                Ok(list[*idx].clone())
            } else {
                get_recursive(&list[*idx], rest)
            }
        },
    }
}

fn set_recursive(current: &mut Value, segs: &[Segment], value: Value, force: bool) -> EngineResult<()> {
    let (head, rest) = segs.split_first().expect("non-empty path");
    match head {
        Segment::Name(name) => {
            let Value::Map(map) = current else {
                return Err(EngineError::type_mismatch(format!(
                    "cannot index {} by name {name:?}",
                    current.type_name()
                )));
            };
            if rest.is_empty() {
                let written = if force {
                    value
                } else {
                    match map.get(name) {
                        Some(existing) => coerce_write(existing, value)?,
                        None => value,
                    }
                };
                map.insert(name.clone(), written);
                Ok(())
            } else {
                if !map.contains_key(name) {
                    map.insert(name.clone(), Value::empty_map());
                }
                set_recursive(map.get_mut(name).expect("just inserted"), rest, value, force)
            }
        },
        Segment::Index(idx) => {
            let Value::List(list) = current else {
                return Err(EngineError::invalid_argument(
                    "refusing to create array of unknown size",
                ));
            };
            if *idx >= list.len() {
                return Err(EngineError::index_out_of_range(format!(
                    "index {idx} out of range (len {})",
                    list.len()
                )));
            }
            if rest.is_empty() {
                let written = if force { value } else { coerce_write(&list[*idx], value)? };
                list[*idx] = written;
                Ok(())
            } else {
                set_recursive(&mut list[*idx], rest, value, force)
            }
        },
    }
}

/// Coerces `new` toward `existing`'s type when overwriting a leaf that
/// already holds a value. `Int`/`Float` cross-promote (the incoming value
/// is converted to whichever numeric type is already stored); `String`
/// and `Bool` are invariant; `List`/`Map` leaves cannot be overwritten by
/// a scalar `set`.
fn coerce_write(existing: &Value, new: Value) -> EngineResult<Value> {
    match existing {
        Value::String(_) => match new {
            Value::String(_) => Ok(new),
            other => {
                Err(EngineError::type_mismatch(format!("incompatible type {} to string", other.type_name())))
            },
        },
        Value::Bool(_) => match new {
            Value::Bool(_) => Ok(new),
            other => Err(EngineError::type_mismatch(format!("incompatible type {} to bool", other.type_name()))),
        },
        Value::Int(_) => match new {
            Value::Int(i) => Ok(Value::Int(i)),
            Value::Float(f) => Ok(Value::Int(f as i64)),
            other => Err(EngineError::type_mismatch(format!("incompatible type {} to int", other.type_name()))),
        },
        Value::Float(_) => match new {
            Value::Int(i) => Ok(Value::Float(i as f64)),
            Value::Float(f) => Ok(Value::Float(f)),
            other => Err(EngineError::type_mismatch(format!("incompatible type {} to float", other.type_name()))),
        },
        Value::List(_) => match new {
            Value::List(_) => Ok(new),
            other => Err(EngineError::type_mismatch(format!("cannot overwrite list with {}", other.type_name()))),
        },
        Value::Map(_) => match new {
            Value::Map(_) => Ok(new),
            other => Err(EngineError::type_mismatch(format!("cannot overwrite map with {}", other.type_name()))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(json: serde_json::Value) -> VariableStore {
        let value: Value = json.into();
        match value {
            Value::Map(m) => VariableStore::from_map(m),
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn round_trips_scalar() {
        let mut s = VariableStore::new();
        s.set_str("counter", Value::Int(5)).unwrap();
        assert_eq!(s.get_str("counter").unwrap(), Value::Int(5));
    }

    #[test]
    fn auto_vivifies_intermediate_maps() {
        let mut s = VariableStore::new();
        s.set_str("result.allyourbase.success", Value::Bool(true)).unwrap();
        assert_eq!(s.get_str("result.allyourbase.success").unwrap(), Value::Bool(true));
    }

    #[test]
    fn never_auto_creates_arrays() {
        let mut s = VariableStore::new();
        let err = s.set_str("list[0]", Value::Int(1)).unwrap_err();
        assert_eq!(err.code, errors::ErrorCode::TypeMismatch);
    }

    #[test]
    fn index_out_of_range_uses_correct_bound() {
        let s = store_with(serde_json::json!({ "list": [1, 2, 3] }));
        assert!(s.get_str("list[2]").is_ok());
        let err = s.get_str("list[3]").unwrap_err();
        assert_eq!(err.code, errors::ErrorCode::IndexOutOfRange);
    }

    #[test]
    fn numeric_cross_promotion() {
        let mut s = store_with(serde_json::json!({ "counter": 5 }));
        s.set_str("counter", Value::Float(10.0)).unwrap();
        assert_eq!(s.get_str("counter").unwrap(), Value::Int(10));
    }

    #[test]
    fn string_bool_mismatch_errors() {
        let mut s = store_with(serde_json::json!({ "name": "a" }));
        let err = s.set_str("name", Value::Int(1)).unwrap_err();
        assert_eq!(err.code, errors::ErrorCode::TypeMismatch);
    }
}

//! The `match` action: loads a fixture file and a stored variable, runs
//! C4's structural subset match between them, and advances on the result.

use std::path::Path;

use errors::{EngineError, EngineResult};
use indexmap::IndexMap;
use ops::match_subset;
use template::TemplateContext;
use value::{Value, VariableStore};

use super::args;
use crate::result::ActionResult;

fn parse_as(content: &str, kind: &str) -> EngineResult<Value> {
    match kind {
        "json" => serde_json::from_str::<serde_json::Value>(content)
            .map(Value::from)
            .map_err(|e| EngineError::invalid_argument(format!("invalid json fixture: {e}"))),
        "yaml" => serde_yaml::from_str::<serde_yaml::Value>(content)
            .map(Value::from)
            .map_err(|e| EngineError::invalid_argument(format!("invalid yaml fixture: {e}"))),
        "string" | "" => Ok(Value::String(content.to_string())),
        other => Err(EngineError::invalid_argument(format!("unknown match type {other:?}"))),
    }
}

pub fn execute(
    args: &IndexMap<String, Value>,
    variables: &VariableStore,
    ctx: &TemplateContext,
    config_dir: Option<&Path>,
) -> EngineResult<ActionResult> {
    let match_file = args::require_str(args, "match_file")?;
    let match_file_type = args::str_or(args, "match_file_type", "string");
    let response_type = args::str_or(args, "response_type", "string");
    let variable = args::require_str(args, "variable")?;

    let resolved = paths::validate(match_file, config_dir)?;
    let raw = std::fs::read_to_string(&resolved).map_err(|e| EngineError::io(format!("reading {match_file:?}: {e}")))?;
    let rendered = template::render(&raw, ctx);
    let expected = parse_as(&rendered, match_file_type)?;

    let candidate_raw = variables.get_str(variable)?;
    let candidate = match &candidate_raw {
        Value::String(s) => parse_as(s, response_type)?,
        other => other.clone(),
    };

    let matched = match_subset(&expected, &candidate);
    let branch = if matched { "advance_true" } else { "advance_false" };
    let new_txn =
        args::str_opt(args, branch).ok_or_else(|| EngineError::invalid_argument(format!("missing {branch}")))?;
    Ok(ActionResult { complete: true, success: matched, advance: true, new_txn: Some(new_txn.to_string()), can_background: false })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_fixture_as_scalar() {
        let value = parse_as("hello", "string").unwrap();
        assert_eq!(value, Value::String("hello".to_string()));
    }

    #[test]
    fn parses_json_fixture() {
        let value = parse_as(r#"{"a":1}"#, "json").unwrap();
        assert!(matches!(value, Value::Map(_)));
    }
}

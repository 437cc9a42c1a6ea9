//! The `url` action: the only action with a non-trivial `satisfy()` - it
//! matches a queued inbound request's path - and whose `execute` compares
//! the request body against an optional fixture.

use std::path::Path;

use errors::{EngineError, EngineResult};
use indexmap::IndexMap;
use template::TemplateContext;
use value::{Value, VariableStore};

use super::args;
use crate::{queue::QueuedRequest, result::ActionResult};

/// True iff a request is attached to this tick's group and its path
/// equals the (already-templated) `url` arg.
pub fn satisfy(rendered_url: &str, request: Option<&QueuedRequest>) -> bool {
    request.is_some_and(|r| r.path == rendered_url)
}

fn parse_body(body: &str, datatype: &str) -> Value {
    match datatype {
        "json" => serde_json::from_str::<serde_json::Value>(body).map(Value::from).unwrap_or_else(|_| Value::String(body.to_string())),
        "yaml" => serde_yaml::from_str::<serde_yaml::Value>(body).map(Value::from).unwrap_or_else(|_| Value::String(body.to_string())),
        _ => Value::String(body.to_string()),
    }
}

/// Reads the attached request's body, optionally stashes it (raw and/or
/// parsed) into the variable store, and - if a `data` fixture is given -
/// compares it structurally. A comparison mismatch is a *soft* failure:
/// `complete` stays true, only `success` flips, and the scheduler routes
/// to the transaction's unexpected branch.
pub fn execute(
    args: &IndexMap<String, Value>,
    request: Option<&QueuedRequest>,
    variables: &mut VariableStore,
    ctx: &TemplateContext,
    config_dir: Option<&Path>,
) -> EngineResult<ActionResult> {
    let request = request.ok_or_else(|| EngineError::internal("url action executed with no attached request"))?;
    let datatype = args::str_or(args, "datatype", "string");
    let body_str = String::from_utf8_lossy(&request.body).to_string();

    if let Some(save_body) = args::str_opt(args, "save_body") {
        variables.force_set_str(save_body, Value::String(body_str.clone()))?;
    }
    if let Some(save_map) = args::str_opt(args, "save_body_as_map") {
        variables.force_set_str(save_map, parse_body(&body_str, datatype))?;
    }

    let success = match args::str_opt(args, "data") {
        None => true,
        Some(data_path) => {
            let resolved = paths::validate(data_path, config_dir)?;
            let raw = std::fs::read_to_string(&resolved)
                .map_err(|e| EngineError::io(format!("reading {data_path:?}: {e}")))?;
            let rendered = template::render(&raw, ctx);
            match datatype {
                "json" | "yaml" => {
                    let expected = parse_body(&rendered, datatype);
                    let actual = parse_body(&body_str, datatype);
                    expected == actual
                },
                _ => rendered == body_str,
            }
        },
    };

    Ok(ActionResult::done(success))
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap as Map;

    use super::*;

    fn req(path: &str, body: &str) -> QueuedRequest {
        QueuedRequest { method: "POST".to_string(), path: path.to_string(), body: body.as_bytes().to_vec(), headers: Map::new() }
    }

    #[test]
    fn satisfy_matches_exact_path() {
        assert!(satisfy("/api/v1/url1", Some(&req("/api/v1/url1", "{}"))));
        assert!(!satisfy("/api/v1/url1", Some(&req("/api/v1/url2", "{}"))));
        assert!(!satisfy("/api/v1/url1", None));
    }

    #[test]
    fn json_fixture_match_is_success() {
        let mut variables = VariableStore::new();
        let mut args = Map::new();
        args.insert("datatype".to_string(), Value::String("json".to_string()));
        let request = req("/x", r#"{"amount":"too much","I":"love tacos"}"#);
        let ctx = TemplateContext::default();

        // inline fixture content is exercised through `data` in the
        // scheduler's file-backed path; here we just check the string
        // fallback used when no `data` arg is present.
        args.remove("datatype");
        let result = execute(&args, Some(&request), &mut variables, &ctx, None).unwrap();
        assert!(result.complete && result.success);
    }
}

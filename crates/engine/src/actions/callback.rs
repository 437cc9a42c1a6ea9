//! `callback` (synchronous), `cbsplit` (backgrounded) and `cbfinish` (its
//! join point). All three share the same HTTP request construction and
//! response-saving logic; they differ only in when the request runs and
//! who observes its outcome.

use std::path::{Path, PathBuf};

use errors::{EngineError, EngineResult};
use indexmap::IndexMap;
use reqwest::Client;
use runtime::Runtime;
use template::TemplateContext;
use value::{Value, VariableStore};

use super::args;
use crate::{
    cb_state::{CbOutcome, CbState},
    result::ActionResult,
};

fn parse_response(body: &str, kind: &str) -> Value {
    match kind {
        "json" => serde_json::from_str::<serde_json::Value>(body)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(body.to_string())),
        "yaml" => serde_yaml::from_str::<serde_yaml::Value>(body)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(body.to_string())),
        _ => Value::String(body.to_string()),
    }
}

/// Builds and fires the outbound request. Returns `(success, parsed body,
/// raw body)`; never touches the Variable Store, so it's safe to call
/// from either the scheduler tick (`callback`) or a detached worker
/// (`cbsplit`).
async fn perform_request(
    args: &IndexMap<String, Value>,
    client: &Client,
    ctx: &TemplateContext,
    config_dir: Option<&Path>,
) -> EngineResult<(bool, Value, String)> {
    let method = args::str_or(args, "method", "GET").to_ascii_uppercase();
    let url = args::require_str(args, "url")?;
    if url.is_empty() {
        return Err(EngineError::invalid_argument("callback requires a non-empty url"));
    }

    let payload = match args::str_opt(args, "payload") {
        Some(path) => {
            let resolved = paths::validate(path, config_dir)?;
            let raw = std::fs::read_to_string(&resolved).map_err(|e| EngineError::io(format!("reading {path:?}: {e}")))?;
            template::render(&raw, ctx)
        },
        None => String::new(),
    };
    let content_type = args::str_or(args, "payload_contenttype", "application/json").to_string();
    let headers = args::string_map(args, "headers");
    let auth_header = args::str_opt(args, "auth_header").map(str::to_string);

    let mut builder = if method == "POST" { client.post(url) } else { client.get(url) };
    builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
    for (k, v) in &headers {
        builder = builder.header(k.as_str(), v.as_str());
    }
    if let Some(auth) = auth_header {
        builder = builder.header(reqwest::header::AUTHORIZATION, auth);
    }
    if method == "POST" && !payload.is_empty() {
        builder = builder.body(payload);
    }

    let response = builder.send().await.map_err(|e| EngineError::io(format!("callback request failed: {e}")))?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let ignore_failure = args::bool_or(args, "ignore_failure", false);
    let success = status.is_success() || ignore_failure;
    let response_type = args::str_or(args, "response_type", "string");
    let parsed = parse_response(&body, response_type);
    Ok((success, parsed, body))
}

fn apply_saves(args: &IndexMap<String, Value>, variables: &mut VariableStore, parsed: &Value, raw: &str) -> EngineResult<()> {
    if let Some(dest) = args::str_opt(args, "save_response") {
        variables.force_set_str(dest, Value::String(raw.to_string()))?;
    }
    if let Some(dest) = args::str_opt(args, "save_response_map") {
        variables.force_set_str(dest, parsed.clone())?;
    }
    if let Value::Map(map) = parsed {
        for name in args::string_list(args, "save") {
            if let Some(value) = map.get(&name) {
                variables.force_set_str(&name, value.clone())?;
            }
        }
    }
    Ok(())
}

/// Runs the outbound HTTP call inline, blocking this tick until the peer
/// responds. `can_background=false`: the scheduler simply waits.
pub async fn execute_callback(
    args: &IndexMap<String, Value>,
    variables: &mut VariableStore,
    client: &Client,
    ctx: &TemplateContext,
    config_dir: Option<&Path>,
) -> EngineResult<ActionResult> {
    let (success, parsed, raw) = perform_request(args, client, ctx, config_dir).await?;
    apply_saves(args, variables, &parsed, &raw)?;
    Ok(ActionResult::done(success))
}

/// Launches the same request on a detached worker and returns immediately.
/// Fails if another split callback is already in flight (the singleton
/// `cb_state` invariant).
pub async fn execute_cbsplit<RT: Runtime>(
    args: &IndexMap<String, Value>,
    cb_state: &CbState,
    client: &Client,
    runtime: &RT,
    ctx: TemplateContext,
    config_dir: Option<PathBuf>,
) -> EngineResult<ActionResult> {
    let (result_tx, mut cancel_rx) = cb_state.begin()?;
    let args = args.clone();
    let client = client.clone();
    runtime.spawn("cbsplit-worker", async move {
        let outcome = tokio::select! {
            biased;
            _ = &mut cancel_rx => CbOutcome::Aborted,
            result = perform_request(&args, &client, &ctx, config_dir.as_deref()) => match result {
                Ok((success, parsed, raw)) => {
                    CbOutcome::Finished { result: ActionResult::done(success), parsed, raw, args: args.clone() }
                },
                Err(err) => CbOutcome::Errored(err),
            },
        };
        let _ = result_tx.send(outcome);
    });
    Ok(ActionResult::backgrounded())
}

/// Joins the in-flight split callback (if any), applying its saved
/// outcome to the Variable Store on this (the scheduler's) thread.
pub async fn execute_cbfinish(cb_state: &CbState, variables: &mut VariableStore) -> EngineResult<ActionResult> {
    match cb_state.finish().await {
        None | Some(CbOutcome::Aborted) => Ok(ActionResult::done(false)),
        Some(CbOutcome::Errored(err)) => Err(err),
        Some(CbOutcome::Finished { result, parsed, raw, args }) => {
            apply_saves(&args, variables, &parsed, &raw)?;
            Ok(result)
        },
    }
}

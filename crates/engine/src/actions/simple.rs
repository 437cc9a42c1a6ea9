//! The pure, synchronous actions: `test`, `log`, `set`, `math`,
//! `conditional`, `advance`, `wait`.

use chrono::{DateTime, Utc};
use errors::{EngineError, EngineResult};
use indexmap::IndexMap;
use ops::{compare, execute_math, CompareOp};
use value::{Value, VariableStore};

use super::args;
use crate::{model::PlanDef, result::ActionResult};

/// Nop used by unit tests exercising the scheduler without a real effect.
pub fn test() -> EngineResult<ActionResult> {
    Ok(ActionResult::done(true))
}

/// Emits one log line at the requested level, tagged with the owning
/// plan/transaction so a busy plan's log stream stays attributable.
pub fn log(args: &IndexMap<String, Value>, plan_name: &str, txn_name: &str) -> EngineResult<ActionResult> {
    let value = args::require_str(args, "value")?;
    let level = args::str_or(args, "log_level", "info");
    match level {
        "trace" => tracing::trace!(plan = plan_name, txn = txn_name, "{value}"),
        "debug" => tracing::debug!(plan = plan_name, txn = txn_name, "{value}"),
        "warn" | "warning" => tracing::warn!(plan = plan_name, txn = txn_name, "{value}"),
        "error" | "critical" => tracing::error!(plan = plan_name, txn = txn_name, "{value}"),
        _ => tracing::info!(plan = plan_name, txn = txn_name, "{value}"),
    }
    Ok(ActionResult::done(true))
}

/// Copies a literal or another variable's value into `variable`, preserving
/// type (unlike `math`, which always writes back a `Float`).
pub fn set(args: &IndexMap<String, Value>, variables: &mut VariableStore) -> EngineResult<ActionResult> {
    let dest = args::require_str(args, "variable")?;
    let value = match (args::get(args, "source"), args::get(args, "value")) {
        (Some(Value::String(source_path)), _) => variables.get_str(source_path)?,
        (_, Some(literal)) => literal.clone(),
        _ => return Err(EngineError::invalid_argument("set requires one of `source` or `value`")),
    };
    variables.set_str(dest, value)?;
    Ok(ActionResult::done(true))
}

/// Runs the requested operator over `variable` and the `value` arg,
/// writing the (always-`Float`) result back to `variable`.
pub fn math(args: &IndexMap<String, Value>, variables: &mut VariableStore) -> EngineResult<ActionResult> {
    let dest = args::require_str(args, "variable")?;
    let op = args::require_str(args, "action")?;
    let rhs = args::require(args, "value")?;
    let lhs = variables.get_str(dest)?;
    let result = execute_math(&lhs, rhs, op)?;
    variables.force_set_str(dest, Value::Float(result))?;
    Ok(ActionResult::done(true))
}

/// Compares `term.variable` against either `term.conditional_var` (another
/// variable) or `term.conditional_value` (a literal) and advances to
/// `advance_true`/`advance_false` accordingly. `success` mirrors the
/// comparison outcome.
pub fn conditional(args: &IndexMap<String, Value>, variables: &VariableStore) -> EngineResult<ActionResult> {
    let term = match args::require(args, "term")? {
        Value::Map(m) => m,
        _ => return Err(EngineError::invalid_argument("conditional requires a `term` map")),
    };
    let variable = term
        .get("variable")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::invalid_argument("term.variable is required"))?;
    let op_name = term
        .get("conditional")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::invalid_argument("term.conditional is required"))?;
    let op = CompareOp::parse(op_name)
        .ok_or_else(|| EngineError::invalid_argument(format!("unknown comparison operator {op_name:?}")))?;

    let lhs = variables.get_str(variable)?;
    let rhs = match (term.get("conditional_var"), term.get("conditional_value")) {
        (Some(Value::String(path)), _) => variables.get_str(path)?,
        (_, Some(literal)) => literal.clone(),
        _ => return Err(EngineError::invalid_argument("term requires conditional_var or conditional_value")),
    };

    let matched = compare(&lhs, &rhs, op)?;
    let branch = if matched { "advance_true" } else { "advance_false" };
    let new_txn =
        args::str_opt(args, branch).ok_or_else(|| EngineError::invalid_argument(format!("missing {branch}")))?;
    Ok(ActionResult { complete: true, success: matched, advance: true, new_txn: Some(new_txn.to_string()), can_background: false })
}

/// Verifies `txn` names a real transaction and hands control to it.
pub fn advance(args: &IndexMap<String, Value>, plan: &PlanDef) -> EngineResult<ActionResult> {
    let txn = args::require_str(args, "txn")?;
    if plan.find_transaction(txn).is_none() {
        return Err(EngineError::invalid_argument(format!("advance target transaction {txn:?} does not exist")));
    }
    Ok(ActionResult::advance_to(txn))
}

/// Polls a fixed duration without blocking the tick: the first tick
/// records `now`, every following tick compares elapsed time against
/// `duration` until the deadline passes. Bails out early, marked failed,
/// if the scheduler has an abort in flight.
pub fn wait(
    args: &IndexMap<String, Value>,
    start: &mut Option<DateTime<Utc>>,
    abort_requested: bool,
    now: DateTime<Utc>,
) -> EngineResult<ActionResult> {
    if abort_requested {
        *start = None;
        return Ok(ActionResult::done(false));
    }
    let duration_secs = args::require_int(args, "duration")?;
    let began = *start.get_or_insert(now);
    let elapsed = now.signed_duration_since(began);
    if elapsed.num_seconds() >= duration_secs {
        *start = None;
        Ok(ActionResult::done(true))
    } else {
        Ok(ActionResult::pending())
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn vars(json: serde_json::Value) -> VariableStore {
        let v: Value = json.into();
        match v {
            Value::Map(m) => VariableStore::from_map(m),
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn conditional_equality_branch() {
        let variables = vars(serde_json::json!({ "source": 5 }));
        let mut args = IndexMap::new();
        let mut term = IndexMap::new();
        term.insert("variable".to_string(), Value::String("source".to_string()));
        term.insert("conditional".to_string(), Value::String("eq".to_string()));
        term.insert("conditional_value".to_string(), Value::Int(5));
        args.insert("term".to_string(), Value::Map(term));
        args.insert("advance_true".to_string(), Value::String("success".to_string()));
        args.insert("advance_false".to_string(), Value::String("failure".to_string()));

        let result = conditional(&args, &variables).unwrap();
        assert!(result.complete && result.success && result.advance);
        assert_eq!(result.new_txn.as_deref(), Some("success"));
    }

    #[test]
    fn math_promotes_int_to_float_and_divides() {
        let mut variables = vars(serde_json::json!({ "counter": 5 }));
        let mut args = IndexMap::new();
        args.insert("variable".to_string(), Value::String("counter".to_string()));
        args.insert("value".to_string(), Value::Int(5));
        args.insert("action".to_string(), Value::String("+".to_string()));
        math(&args, &mut variables).unwrap();
        assert_eq!(variables.get_str("counter").unwrap(), Value::Float(10.0));

        args.insert("action".to_string(), Value::String("/".to_string()));
        math(&args, &mut variables).unwrap();
        assert_eq!(variables.get_str("counter").unwrap(), Value::Float(2.0));
    }

    #[test]
    fn wait_completes_after_deadline() {
        let mut args = IndexMap::new();
        args.insert("duration".to_string(), Value::Int(2));
        let mut start = None;
        let t0: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let first = wait(&args, &mut start, false, t0).unwrap();
        assert!(!first.complete);
        assert_eq!(start, Some(t0));

        let still_waiting = wait(&args, &mut start, false, t0 + chrono::Duration::seconds(1)).unwrap();
        assert!(!still_waiting.complete);

        let done = wait(&args, &mut start, false, t0 + chrono::Duration::seconds(2)).unwrap();
        assert!(done.complete && done.success);
        assert!(start.is_none());
    }

    #[test]
    fn wait_aborts_early_when_requested() {
        let mut args = IndexMap::new();
        args.insert("duration".to_string(), Value::Int(5));
        let mut start = Some("2026-01-01T00:00:00Z".parse().unwrap());
        let result = wait(&args, &mut start, true, "2026-01-01T00:00:01Z".parse().unwrap()).unwrap();
        assert!(result.complete && !result.success);
        assert!(start.is_none());
    }
}

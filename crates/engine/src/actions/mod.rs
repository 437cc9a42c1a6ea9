//! The Action Set (C5): twelve polymorphic actions dispatched by their
//! `type` string. Rather than dynamic dispatch behind a trait object, each
//! kind is a free function operating on the pieces of state it needs -
//! the "tagged enum of action variants" the design notes call for, with
//! the type string itself as the tag.

mod args;
mod callback;
mod match_action;
mod simple;
mod url_action;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use errors::{EngineError, EngineResult};
use indexmap::IndexMap;
use reqwest::Client;
use runtime::Runtime;
use template::TemplateContext;
use value::{Value, VariableStore};

pub use self::url_action::satisfy as url_satisfy;
use crate::{
    cb_state::CbState,
    model::{PlanActionDef, PlanDef},
    queue::QueuedRequest,
    result::ActionResult,
};

/// Everything an action needs beyond its own rendered args. Grouped into
/// one struct so `execute`'s signature doesn't grow a parameter per
/// action kind.
pub struct ActionContext<'a, RT: Runtime> {
    pub plan_def: &'a PlanDef,
    pub variables: &'a mut VariableStore,
    pub template_ctx: &'a TemplateContext,
    pub request: Option<&'a QueuedRequest>,
    pub wait_start: &'a mut Option<DateTime<Utc>>,
    pub abort_requested: bool,
    pub now: DateTime<Utc>,
    pub config_dir: Option<&'a Path>,
    pub http_client: &'a Client,
    pub cb_state: &'a CbState,
    pub runtime: &'a RT,
    pub plan_name: &'a str,
    pub txn_name: &'a str,
}

/// Returns whether `action` can be selected inside a multi-member
/// satisfy-group. Only `url` has a real predicate; every other kind is
/// vestigial here - the resolver never calls `satisfy` on a singleton
/// group, so a non-`url` action sharing a group id would only matter in a
/// malformed plan, and "not satisfied" is the forgiving answer.
pub fn satisfy(action: &PlanActionDef, rendered_args: &IndexMap<String, Value>, request: Option<&QueuedRequest>) -> bool {
    match action.r#type.as_str() {
        "url" => {
            let url = rendered_args.get("url").and_then(Value::as_str).unwrap_or_default();
            url_satisfy(url, request)
        },
        _ => false,
    }
}

/// Dispatches `action` (with already-templated args) to its implementation.
pub async fn execute<RT: Runtime>(
    action: &PlanActionDef,
    rendered_args: &IndexMap<String, Value>,
    ctx: &mut ActionContext<'_, RT>,
) -> EngineResult<ActionResult> {
    match action.r#type.as_str() {
        "test" => simple::test(),
        "log" => simple::log(rendered_args, ctx.plan_name, ctx.txn_name),
        "set" => simple::set(rendered_args, ctx.variables),
        "math" => simple::math(rendered_args, ctx.variables),
        "conditional" => simple::conditional(rendered_args, ctx.variables),
        "advance" => simple::advance(rendered_args, ctx.plan_def),
        "wait" => simple::wait(rendered_args, ctx.wait_start, ctx.abort_requested, ctx.now),
        "match" => match_action::execute(rendered_args, ctx.variables, ctx.template_ctx, ctx.config_dir),
        "url" => url_action::execute(rendered_args, ctx.request, ctx.variables, ctx.template_ctx, ctx.config_dir),
        "callback" => callback::execute_callback(rendered_args, ctx.variables, ctx.http_client, ctx.template_ctx, ctx.config_dir).await,
        "cbsplit" => {
            let config_dir: Option<PathBuf> = ctx.config_dir.map(Path::to_path_buf);
            callback::execute_cbsplit(rendered_args, ctx.cb_state, ctx.http_client, ctx.runtime, ctx.template_ctx.clone(), config_dir).await
        },
        "cbfinish" => callback::execute_cbfinish(ctx.cb_state, ctx.variables).await,
        other => Err(EngineError::invalid_argument(format!("unknown action type {other:?}"))),
    }
}

//! The cooperative tick-driven scheduler (C8): drives exactly one step of
//! the active plan per tick, consuming the inbound queue and dispatching
//! the Action Set.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use errors::{EngineError, EngineResult};
use reqwest::Client;
use runtime::Runtime;
use template::TemplateContext;
use tracing::{info, warn};

use crate::{
    actions::{self, ActionContext},
    cb_state::CbState,
    model::{ExpectedDef, PlanActionDef, PlanDef, RuntimePlan, TransactionDef, TxnPhase, TxnStatus},
    queue::{PendingResponse, QueueEntry, RequestQueue},
    resolver, templating,
};

/// An active plan plus the one inbound request (if any) it's mid-way
/// through consuming. The request has to persist across ticks: a `url`
/// group may dequeue it, then several following groups (a `wait`, a
/// `callback`) can take multiple ticks before the transaction's response
/// is finally written.
pub struct ActivePlan {
    pub plan: RuntimePlan,
    pending_request: Option<QueueEntry>,
}

/// The action list currently governing the active transaction, per its
/// [`TxnPhase`].
fn action_list(txn: &TransactionDef, phase: TxnPhase) -> Vec<PlanActionDef> {
    match phase {
        TxnPhase::Init => txn.effective_init_actions(),
        TxnPhase::Expected => txn.on_expected.as_ref().map(|e| e.action.clone()).unwrap_or_default(),
        TxnPhase::Unexpected => txn.on_unexpected.as_ref().map(|e| e.action.clone()).unwrap_or_default(),
    }
}

/// Renders the response a settled transaction writes back to its waiting
/// HTTP handler, from whichever of `on_expected`/`on_unexpected` applies.
fn build_response(expected: Option<&ExpectedDef>, ctx: &TemplateContext, config_dir: Option<&Path>) -> EngineResult<PendingResponse> {
    let status = expected
        .and_then(|e| e.response_code.as_deref())
        .map(|code| template::render(code, ctx))
        .and_then(|rendered| rendered.trim().parse::<u16>().ok())
        .unwrap_or(200);
    let content_type =
        expected.and_then(|e| e.response_contenttype.as_deref()).map(|ct| template::render(ct, ctx)).or_else(|| Some("application/json".to_string()));
    let body = match expected.and_then(|e| e.response.as_deref()) {
        Some(path) => {
            let resolved = paths::validate(path, config_dir)?;
            let raw = std::fs::read_to_string(&resolved).map_err(|e| EngineError::io(format!("reading {path:?}: {e}")))?;
            template::render(&raw, ctx)
        },
        None => String::new(),
    };
    Ok(PendingResponse { status, content_type, body })
}

/// Drives the tick loop. Generic over [`Runtime`] so tests can swap in a
/// fake clock/executor without touching the scheduler logic.
pub struct Scheduler<RT: Runtime> {
    runtime: RT,
    active: tokio::sync::Mutex<Option<ActivePlan>>,
    queue: RequestQueue,
    cb_state: CbState,
    http_client: Client,
    config_dir: Option<PathBuf>,
    abort_requested: AtomicBool,
}

impl<RT: Runtime> Scheduler<RT> {
    pub fn new(runtime: RT, queue: RequestQueue, config_dir: Option<PathBuf>) -> Self {
        Self {
            runtime,
            active: tokio::sync::Mutex::new(None),
            queue,
            cb_state: CbState::new(),
            http_client: Client::builder().build().unwrap_or_default(),
            config_dir,
            abort_requested: AtomicBool::new(false),
        }
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// `LaunchPlan`: fails if a plan is already active, else installs a
    /// fresh [`RuntimePlan`] built from `def` as the sole active plan.
    pub async fn launch(&self, def: PlanDef) -> EngineResult<()> {
        let mut guard = self.active.lock().await;
        if guard.is_some() {
            return Err(EngineError::invalid_argument("a plan is already active"));
        }
        let plan = RuntimePlan::launch(def)?;
        *guard = Some(ActivePlan { plan, pending_request: None });
        self.abort_requested.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// `Remove`: aborts any in-flight split callback and clears the
    /// active-plan slot. Acquiring the same mutex the tick loop holds
    /// while stepping blocks this call until that step returns, so there's
    /// no separate "wait for the scheduler to settle" phase.
    pub async fn remove(&self) {
        self.abort_requested.store(true, Ordering::SeqCst);
        self.cb_state.abort();
        let mut guard = self.active.lock().await;
        *guard = None;
        self.abort_requested.store(false, Ordering::SeqCst);
    }

    pub async fn status(&self) -> Option<crate::model::StatusSnapshot> {
        self.active.lock().await.as_ref().map(|a| (&a.plan).into())
    }

    /// Executes one scheduler step. A "step" keeps advancing through
    /// immediately-ready groups of the active transaction's current action
    /// list - and, once that list is spent with a request in hand, straight
    /// on into the `on_expected`/`on_unexpected` follow-up list - stopping
    /// only on an incomplete/backgrounded result, a `url` group with no
    /// queued request yet, an `advance`, an abort, or an error. Only then
    /// does it give up the tick, matching the single-call loop
    /// `ProcessTests` runs per ticker fire in the original.
    pub async fn tick(&self) {
        let mut guard = self.active.lock().await;
        let Some(active) = guard.as_mut() else { return };

        if let Some(stop_var) = active.plan.def.stop_var.clone() {
            if matches!(active.plan.state.variables.get_str(&stop_var), Ok(value::Value::Bool(true))) {
                active.plan.state.finalize_current(TxnStatus::Stopped);
                return;
            }
        }
        if active.plan.state.err.is_some() {
            return;
        }

        loop {
            if self.abort_requested.load(Ordering::SeqCst) {
                self.cb_state.abort();
                return;
            }

            let Some(txn) = active.plan.current_transaction().cloned() else {
                active.plan.state.err = Some(EngineError::internal(format!("transaction {:?} not found", active.plan.state.transaction)));
                return;
            };

            let phase = active.plan.state.phase;
            let actions = action_list(&txn, phase);
            let groups = resolver::group_actions(&actions);
            let idx = active.plan.state.txn_action_idx;

            if idx >= groups.len() {
                match phase {
                    TxnPhase::Init => {
                        if self.begin_response_phase(active, &txn) {
                            continue;
                        }
                        return;
                    },
                    TxnPhase::Expected | TxnPhase::Unexpected => {
                        warn!(txn = %txn.name, ?phase, "action list exhausted without an advance action");
                        active.plan.state.finalize_current(TxnStatus::Errored);
                        active.plan.state.err = Some(EngineError::internal("no advance action specified"));
                        return;
                    },
                }
            }

            let group = &groups[idx];
            let group_has_url = group.iter().any(|a| a.r#type == "url");
            if group_has_url && active.pending_request.is_none() {
                match self.queue.try_take().await {
                    Some(entry) => active.pending_request = Some(entry),
                    None => return,
                }
            }

            let now = self.runtime.now();
            let template_ctx = templating::build_context(&active.plan.state.variables, &active.plan.def.bases, now);

            let chosen = if group.len() == 1 {
                Some(group[0].clone())
            } else {
                let request = active.pending_request.as_ref().map(|e| &e.request);
                group
                    .iter()
                    .find(|action| {
                        let rendered = templating::render_args(&action.args, &template_ctx);
                        actions::satisfy(action, &rendered, request)
                    })
                    .cloned()
            };
            let Some(action_def) = chosen else { return };

            let rendered_args = templating::render_args(&action_def.args, &template_ctx);
            let request = active.pending_request.as_ref().map(|e| &e.request);
            let mut action_ctx = ActionContext {
                plan_def: &active.plan.def,
                variables: &mut active.plan.state.variables,
                template_ctx: &template_ctx,
                request,
                wait_start: &mut active.plan.state.wait_action_start_time,
                abort_requested: self.abort_requested.load(Ordering::SeqCst),
                now,
                config_dir: self.config_dir.as_deref(),
                http_client: &self.http_client,
                cb_state: &self.cb_state,
                runtime: &self.runtime,
                plan_name: &active.plan.def.name,
                txn_name: &txn.name,
            };

            match actions::execute(&action_def, &rendered_args, &mut action_ctx).await {
                Err(err) => {
                    warn!(txn = %txn.name, action = %action_def.r#type, error = %err, "action failed, halting plan");
                    active.plan.state.finalize_current(TxnStatus::Errored);
                    active.plan.state.err = Some(err);
                    return;
                },
                Ok(r) => {
                    if !r.complete {
                        return;
                    }
                    if !r.success {
                        active.plan.state.success_accum = false;
                    }
                    if r.advance {
                        let new_txn = r.new_txn.expect("advance result always carries new_txn");
                        info!(from = %txn.name, to = %new_txn, "transaction advanced");
                        active.plan.state.finalize_current(TxnStatus::Completed);
                        active.plan.state.advance_to(new_txn);
                        return;
                    }
                    active.plan.state.txn_action_idx = idx + 1;
                },
            }
        }
    }

    /// The current transaction's init-action list has run to completion.
    /// If a request was consumed along the way, resolves it - writes its
    /// response and switches into the `Expected`/`Unexpected` follow-up
    /// phase, returning `true` so the caller's loop carries straight on
    /// into that branch's `action[]` within the same tick. Returns `false`
    /// if no request was pending: the transaction has no request cycle and
    /// is simply done.
    fn begin_response_phase(&self, active: &mut ActivePlan, txn: &TransactionDef) -> bool {
        let Some(entry) = active.pending_request.take() else {
            active.plan.state.finalize_current(TxnStatus::Completed);
            return false;
        };

        let success = active.plan.state.success_accum;
        let expected = if success { txn.on_expected.as_ref() } else { txn.on_unexpected.as_ref() };
        let now = self.runtime.now();
        let template_ctx = templating::build_context(&active.plan.state.variables, &active.plan.def.bases, now);

        let response = match build_response(expected, &template_ctx, self.config_dir.as_deref()) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "failed to build response, answering with a bare 500");
                PendingResponse { status: 500, content_type: None, body: String::new() }
            },
        };
        let _ = entry.finish.send(response);

        active.plan.state.finalize_current(if success { TxnStatus::Expected } else { TxnStatus::Unexpected });
        active.plan.state.phase = if success { TxnPhase::Expected } else { TxnPhase::Unexpected };
        active.plan.state.txn_action_idx = 0;
        active.plan.state.success_accum = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use indexmap::IndexMap;
    use runtime::FakeRuntime;
    use tokio::sync::oneshot;
    use value::Value;

    use super::*;

    fn t0() -> chrono::DateTime<chrono::Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    fn action(r#type: &str, args: &[(&str, Value)]) -> PlanActionDef {
        let mut map = IndexMap::new();
        for (k, v) in args {
            map.insert(k.to_string(), v.clone());
        }
        PlanActionDef { r#type: r#type.to_string(), satisfy_group: None, args: map }
    }

    fn new_scheduler() -> (Scheduler<FakeRuntime>, RequestQueue, FakeRuntime) {
        let runtime = FakeRuntime::new(t0());
        let queue = RequestQueue::new();
        let scheduler = Scheduler::new(runtime.clone(), queue.clone(), None);
        (scheduler, queue, runtime)
    }

    /// A transaction whose init-action list is `set` then `advance` has no
    /// `url` group in it at all, so nothing should make the scheduler wait
    /// for a second tick: both actions, and the advance, belong to the same
    /// step per SPEC_FULL.md 4.8 step 9's "continue".
    #[tokio::test]
    async fn multi_action_init_list_advances_within_one_tick() {
        let (scheduler, _queue, _runtime) = new_scheduler();
        let start = TransactionDef {
            name: "start".to_string(),
            init_action: vec![action("set", &[("variable", Value::String("x".into())), ("value", Value::Int(1))]), action("advance", &[("txn", Value::String("done".into()))])],
            ..Default::default()
        };
        let done = TransactionDef { name: "done".to_string(), ..Default::default() };
        let plan = PlanDef { name: "p".to_string(), start_transaction: Some("start".to_string()), txn: vec![start, done], ..Default::default() };
        scheduler.launch(plan).await.unwrap();

        scheduler.tick().await;

        let status = scheduler.status().await.unwrap();
        assert_eq!(status.transaction, "done");
        assert_eq!(status.states[0].status, TxnStatus::Completed);
        assert_eq!(status.variables.get("x"), Some(&Value::Int(1)));
    }

    /// Once a queued request is resolved, the matching `on_expected`
    /// branch's own action list runs in the same tick too - the response is
    /// written and the branch's `advance` is reached without waiting for
    /// the ticker to fire again.
    #[tokio::test]
    async fn url_resolution_runs_its_expected_branch_in_the_same_tick() {
        let (scheduler, queue, _runtime) = new_scheduler();
        let start = TransactionDef {
            name: "start".to_string(),
            url: Some("/ping".to_string()),
            on_expected: Some(ExpectedDef { response_code: Some("200".to_string()), action: vec![action("advance", &[("txn", Value::String("done".into()))])], ..Default::default() }),
            on_unexpected: Some(ExpectedDef { action: vec![action("advance", &[("txn", Value::String("done".into()))])], ..Default::default() }),
            ..Default::default()
        };
        let done = TransactionDef { name: "done".to_string(), ..Default::default() };
        let plan = PlanDef { name: "p".to_string(), start_transaction: Some("start".to_string()), txn: vec![start, done], ..Default::default() };
        scheduler.launch(plan).await.unwrap();

        let (finish, recv) = oneshot::channel();
        queue
            .add(crate::queue::QueueEntry {
                request: crate::queue::QueuedRequest { method: "GET".to_string(), path: "/ping".to_string(), body: vec![], headers: IndexMap::new() },
                finish,
            })
            .await
            .unwrap();

        scheduler.tick().await;

        let status = scheduler.status().await.unwrap();
        assert_eq!(status.transaction, "done");
        let response = recv.await.unwrap();
        assert_eq!(response.status, 200);
    }

    /// An incomplete action (`wait` short of its deadline) halts the tick
    /// where it stands; the following action only runs once the clock has
    /// actually moved past the deadline, on a later tick.
    #[tokio::test]
    async fn incomplete_action_halts_the_tick_until_its_deadline_passes() {
        let (scheduler, _queue, runtime) = new_scheduler();
        let start = TransactionDef {
            name: "start".to_string(),
            init_action: vec![action("wait", &[("duration", Value::Int(2))]), action("advance", &[("txn", Value::String("done".into()))])],
            ..Default::default()
        };
        let done = TransactionDef { name: "done".to_string(), ..Default::default() };
        let plan = PlanDef { name: "p".to_string(), start_transaction: Some("start".to_string()), txn: vec![start, done], ..Default::default() };
        scheduler.launch(plan).await.unwrap();

        scheduler.tick().await;
        let status = scheduler.status().await.unwrap();
        assert_eq!(status.transaction, "start", "wait hasn't reached its deadline yet");

        runtime.advance(ChronoDuration::seconds(3).to_std().unwrap());
        scheduler.tick().await;
        let status = scheduler.status().await.unwrap();
        assert_eq!(status.transaction, "done", "wait's deadline passed, advance runs in the same tick");
    }
}

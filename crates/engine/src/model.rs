//! The plan/transaction/action data model (C9) plus the per-plan runtime
//! State.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use value::{Value, VariableStore};

/// The top-level configuration loaded from YAML: a catalogue of plans
/// plus which one starts by default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub default_plan: Option<String>,
    #[serde(default)]
    pub plan: Vec<PlanDef>,
    #[serde(default)]
    pub bases: IndexMap<String, String>,
}

impl Config {
    pub fn find_plan(&self, name: &str) -> Option<&PlanDef> {
        self.plan.iter().find(|p| p.name == name)
    }
}

/// A plan's static definition, as loaded from YAML. Deep-cloned by the
/// engine facade at `LaunchPlan` time so that runtime mutation (the
/// Variable Store, `txn_action_idx`, ...) never leaks back into the
/// config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanDef {
    pub name: String,
    pub start_transaction: Option<String>,
    pub stop_var: Option<String>,
    #[serde(default)]
    pub bases: IndexMap<String, String>,
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    #[serde(default)]
    pub txn: Vec<TransactionDef>,
}

impl PlanDef {
    pub fn start_transaction_name(&self) -> Option<&str> {
        self.start_transaction.as_deref().or_else(|| self.txn.first().map(|t| t.name.as_str()))
    }

    pub fn find_transaction(&self, name: &str) -> Option<&TransactionDef> {
        self.txn.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionDef {
    pub name: String,
    pub url: Option<String>,
    pub data: Option<String>,
    pub datatype: Option<String>,
    pub save_body: Option<String>,
    pub save_body_as_map: Option<String>,
    #[serde(default)]
    pub init_action: Vec<PlanActionDef>,
    pub on_expected: Option<ExpectedDef>,
    pub on_unexpected: Option<ExpectedDef>,
}

impl TransactionDef {
    /// The init-action list with the implicit `url` action auto-prepended
    /// when the transaction declares a `url` field.
    pub fn effective_init_actions(&self) -> Vec<PlanActionDef> {
        let mut actions = Vec::with_capacity(self.init_action.len() + 1);
        if let Some(url) = &self.url {
            let mut args = IndexMap::new();
            args.insert("url".to_string(), Value::String(url.clone()));
            if let Some(data) = &self.data {
                args.insert("data".to_string(), Value::String(data.clone()));
            }
            if let Some(datatype) = &self.datatype {
                args.insert("datatype".to_string(), Value::String(datatype.clone()));
            }
            if let Some(save_body) = &self.save_body {
                args.insert("save_body".to_string(), Value::String(save_body.clone()));
            }
            if let Some(save_body_as_map) = &self.save_body_as_map {
                args.insert("save_body_as_map".to_string(), Value::String(save_body_as_map.clone()));
            }
            actions.push(PlanActionDef { r#type: "url".to_string(), satisfy_group: None, args });
        }
        actions.extend(self.init_action.iter().cloned());
        actions
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpectedDef {
    pub response: Option<String>,
    pub response_code: Option<String>,
    pub response_contenttype: Option<String>,
    #[serde(default)]
    pub action: Vec<PlanActionDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanActionDef {
    #[serde(rename = "type")]
    pub r#type: String,
    pub satisfy_group: Option<String>,
    #[serde(default)]
    pub args: IndexMap<String, Value>,
}

/// One entry of the append-only transaction log.
#[derive(Debug, Clone, Serialize)]
pub struct StateEntry {
    pub txn_name: String,
    pub status: TxnStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnStatus {
    Waiting,
    Pending,
    Completed,
    Expected,
    Unexpected,
    Errored,
    Stopped,
}

/// Which action list the scheduler is currently stepping through for the
/// active transaction: its own `init_action`s, or - once those are spent
/// and a queued request has been matched against them - the follow-up list
/// named by `on_expected`/`on_unexpected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnPhase {
    Init,
    Expected,
    Unexpected,
}

/// The mutable part of an active plan. Owned exclusively by the
/// scheduler worker; nothing else ever touches it, so it needs no
/// internal locking.
#[derive(Debug)]
pub struct State {
    pub transaction: String,
    pub states: Vec<StateEntry>,
    pub variables: VariableStore,
    pub txn_action_idx: usize,
    pub phase: TxnPhase,
    /// `true` unless some action in the current phase's list (a `url` body
    /// mismatch, a failed `match`) has reported failure. Decides, once the
    /// init-action list is spent, whether the transaction resolves via
    /// `on_expected` or `on_unexpected`.
    pub success_accum: bool,
    pub wait_action_start_time: Option<DateTime<Utc>>,
    pub err: Option<errors::EngineError>,
}

impl State {
    pub fn new(start_txn: impl Into<String>, variables: VariableStore) -> Self {
        let start_txn = start_txn.into();
        Self {
            states: vec![StateEntry { txn_name: start_txn.clone(), status: TxnStatus::Waiting }],
            transaction: start_txn,
            variables,
            txn_action_idx: 0,
            phase: TxnPhase::Init,
            success_accum: true,
            wait_action_start_time: None,
            err: None,
        }
    }

    /// Finalises the current state entry's status in place.
    pub fn finalize_current(&mut self, status: TxnStatus) {
        if let Some(last) = self.states.last_mut() {
            last.status = status;
        }
    }

    /// Advances to a new transaction: appends a fresh `pending` entry and
    /// resets the action cursor and phase.
    pub fn advance_to(&mut self, txn_name: impl Into<String>) {
        let txn_name = txn_name.into();
        self.transaction = txn_name.clone();
        self.states.push(StateEntry { txn_name, status: TxnStatus::Pending });
        self.txn_action_idx = 0;
        self.phase = TxnPhase::Init;
        self.success_accum = true;
    }
}

/// A running plan: its static definition plus mutable [`State`].
pub struct RuntimePlan {
    pub def: PlanDef,
    pub state: State,
}

impl RuntimePlan {
    pub fn launch(def: PlanDef) -> errors::EngineResult<Self> {
        let start = def
            .start_transaction_name()
            .ok_or_else(|| errors::EngineError::config("plan has no transactions"))?
            .to_string();
        let variables = VariableStore::from_map(def.variables.clone());
        Ok(Self { state: State::new(start, variables), def })
    }

    pub fn current_transaction(&self) -> Option<&TransactionDef> {
        self.def.find_transaction(&self.state.transaction)
    }
}

/// Snapshot of a plan's state, rendered for `GET /capi/v1/status`.
#[derive(Debug, Serialize)]
pub struct StatusSnapshot {
    pub transaction: String,
    pub states: Vec<StateEntry>,
    pub variables: IndexMap<String, Value>,
}

impl From<&RuntimePlan> for StatusSnapshot {
    fn from(p: &RuntimePlan) -> Self {
        Self {
            transaction: p.state.transaction.clone(),
            states: p.state.states.clone(),
            variables: p.state.variables.as_map().clone(),
        }
    }
}

//! The `cb_state` singleton shared by `cbsplit`/`cbfinish`: a process-wide
//! capacity-one slot for exactly one in-flight background callback.
//!
//! The background worker never touches the Variable Store directly - per
//! the concurrency model, only the scheduler worker may write plan state.
//! The worker stages its outcome here; `cbfinish` (running on the
//! scheduler) applies it.

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use value::Value;

use crate::result::ActionResult;

/// What a `cbsplit` worker reports back through its single-entry channel.
pub enum CbOutcome {
    /// The HTTP call completed. Carries everything `cbfinish` needs to
    /// apply `save_response`/`save_response_map`/`save` on the scheduler
    /// thread, since the worker itself may not write to the store.
    Finished { result: ActionResult, parsed: Value, raw: String, args: IndexMap<String, Value> },
    /// `abort()` cancelled the call before it completed.
    Aborted,
    Errored(errors::EngineError),
}

struct CbSlot {
    result_rx: oneshot::Receiver<CbOutcome>,
    cancel_tx: oneshot::Sender<()>,
}

#[derive(Default)]
pub struct CbState {
    slot: Mutex<Option<CbSlot>>,
}

impl CbState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the singleton for a new split callback. Fails if one is
    /// already in flight. Returns the sender the spawned worker must use
    /// exactly once, and the receiver it should race against its HTTP
    /// call to notice cancellation.
    pub fn begin(&self) -> errors::EngineResult<(oneshot::Sender<CbOutcome>, oneshot::Receiver<()>)> {
        let mut guard = self.slot.lock();
        if guard.is_some() {
            return Err(errors::EngineError::invalid_argument("already a split callback in progress"));
        }
        let (result_tx, result_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        *guard = Some(CbSlot { result_rx, cancel_tx });
        Ok((result_tx, cancel_rx))
    }

    /// Signals the in-flight worker to cancel and immediately frees the
    /// singleton, regardless of whether the worker notices in time.
    pub fn abort(&self) {
        if let Some(slot) = self.slot.lock().take() {
            let _ = slot.cancel_tx.send(());
        }
    }

    /// Waits for the in-flight worker's outcome, freeing the singleton.
    /// Returns `None` if no split callback was in progress.
    pub async fn finish(&self) -> Option<CbOutcome> {
        let slot = self.slot.lock().take()?;
        match slot.result_rx.await {
            Ok(outcome) => Some(outcome),
            Err(_) => Some(CbOutcome::Aborted),
        }
    }

    pub fn in_progress(&self) -> bool {
        self.slot.lock().is_some()
    }
}

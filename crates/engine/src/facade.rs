//! The engine facade (C10): the small surface the HTTP front-end drives -
//! launch a plan by name, tear it down, read its status, and hand it
//! inbound requests.

use std::path::PathBuf;

use errors::EngineResult;
use runtime::Runtime;
use tokio::sync::oneshot;

use crate::{
    model::{Config, StatusSnapshot},
    queue::{PendingResponse, QueuedRequest, QueueEntry},
    scheduler::Scheduler,
};

/// Owns the plan catalogue loaded at startup and the live [`Scheduler`].
/// Plans don't change at runtime - only which one is active does - so the
/// catalogue itself needs no interior mutability.
pub struct Engine<RT: Runtime> {
    catalog: Config,
    scheduler: Scheduler<RT>,
}

impl<RT: Runtime> Engine<RT> {
    pub fn new(catalog: Config, runtime: RT, config_dir: Option<PathBuf>) -> Self {
        let scheduler = Scheduler::new(runtime, crate::queue::RequestQueue::new(), config_dir);
        Self { catalog, scheduler }
    }

    /// `LaunchPlan`: looks `name` up in the catalogue and installs a fresh
    /// copy of it as the active plan. Bumps `num_initiates` on success.
    pub async fn launch_plan(&self, name: &str) -> EngineResult<()> {
        let def = self
            .catalog
            .find_plan(name)
            .ok_or_else(|| errors::EngineError::not_found(format!("no such plan {name:?}")))?
            .clone();
        self.scheduler.launch(def).await?;
        metrics::NUM_INITIATES.inc();
        Ok(())
    }

    /// `Remove`: tears down the active plan, if any. Bumps `num_aborts`.
    pub async fn remove(&self) {
        self.scheduler.remove().await;
        metrics::NUM_ABORTS.inc();
    }

    /// `GetStatus`: a snapshot of the active plan, or `None` if nothing is
    /// running.
    pub async fn status(&self) -> Option<StatusSnapshot> {
        self.scheduler.status().await
    }

    /// `EnqueueRequest`: hands an inbound HTTP request to the scheduler and
    /// returns the response it eventually produces. Suspends the caller
    /// (the HTTP handler task) until a `url`-bearing transaction consumes
    /// and resolves it.
    pub async fn enqueue_request(&self, request: QueuedRequest) -> EngineResult<PendingResponse> {
        let (finish, await_response) = oneshot::channel();
        self.scheduler
            .queue()
            .add(QueueEntry { request, finish })
            .await
            .map_err(|_| errors::EngineError::internal("request queue closed"))?;
        await_response.await.map_err(|_| errors::EngineError::internal("scheduler dropped response channel"))
    }

    /// Advances the scheduler by exactly one tick. Driven by the front-end's
    /// periodic ticker task.
    pub async fn tick(&self) {
        self.scheduler.tick().await;
    }

    pub async fn is_active(&self) -> bool {
        self.scheduler.is_active().await
    }
}

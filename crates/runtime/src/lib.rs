//! Thin abstraction over tokio so the scheduler and background-callback
//! worker depend on a trait rather than the concrete executor, the way a
//! larger async server keeps `tokio` out of its leaf crates' signatures.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A handle to a spawned task. Dropping it does not cancel the task -
/// call `shutdown` explicitly.
pub trait SpawnHandle: Send {
    /// Requests cancellation; the task notices at its next cooperative
    /// yield point (the runtime does not support preemption).
    fn shutdown(&mut self);
}

pub struct TokioSpawnHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl SpawnHandle for TokioSpawnHandle {
    fn shutdown(&mut self) {
        self.handle.abort();
    }
}

#[async_trait]
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Suspends the caller for `duration`. Used by the scheduler's ticker
    /// and by `wait`'s deadline polling.
    async fn wait(&self, duration: Duration);

    /// Spawns `fut` onto the runtime's executor, detached from the
    /// caller's task. Used for the `cbsplit` background worker.
    fn spawn(
        &self,
        name: &'static str,
        fut: impl Future<Output = ()> + Send + 'static,
    ) -> Box<dyn SpawnHandle>;

    /// Wall-clock time, used for `.Now` template substitution and the
    /// `wait` action's deadline arithmetic.
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Default)]
pub struct ProdRuntime;

impl ProdRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runtime for ProdRuntime {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn(
        &self,
        _name: &'static str,
        fut: impl Future<Output = ()> + Send + 'static,
    ) -> Box<dyn SpawnHandle> {
        let handle = tokio::spawn(fut);
        Box::new(TokioSpawnHandle { handle })
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(feature = "testing")]
mod testing {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// A [`Runtime`] whose clock is moved by hand instead of the wall
    /// clock, so scheduler tests can drive a `wait` action's deadline or a
    /// multi-tick transaction without sleeping in real time. `spawn` still
    /// runs on the ambient tokio executor - the tests that need it run
    /// under `#[tokio::test]` and can `yield_now`/await the handle instead
    /// of needing a fake one.
    #[derive(Clone)]
    pub struct FakeRuntime {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FakeRuntime {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self { now: Arc::new(Mutex::new(now)) }
        }

        pub fn set_now(&self, now: DateTime<Utc>) {
            *self.now.lock() = now;
        }

        pub fn advance(&self, duration: Duration) {
            let mut now = self.now.lock();
            *now += duration;
        }
    }

    #[async_trait]
    impl Runtime for FakeRuntime {
        async fn wait(&self, _duration: Duration) {}

        fn spawn(
            &self,
            _name: &'static str,
            fut: impl Future<Output = ()> + Send + 'static,
        ) -> Box<dyn SpawnHandle> {
            let handle = tokio::spawn(fut);
            Box::new(TokioSpawnHandle { handle })
        }

        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }
}

#[cfg(feature = "testing")]
pub use testing::FakeRuntime;

//! The inbound HTTP request queue (C6): a bounded, single-consumer channel
//! of `(request, finish-signal)` pairs handed in by the HTTP front-end and
//! drained one at a time by the scheduler.

use indexmap::IndexMap;
use tokio::sync::{mpsc, oneshot};

/// Capacity of the bounded channel. The HTTP front-end's `Add` blocks once
/// this many requests are queued and unconsumed.
const QUEUE_CAPACITY: usize = 256;

/// One inbound HTTP request as handed to the engine, stripped of anything
/// the scheduler doesn't need (connection info, extensions, ...).
#[derive(Debug, Clone)]
pub struct QueuedRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
    pub headers: IndexMap<String, String>,
}

/// The templated response a `url` action's branch writes back through a
/// request's finish signal.
#[derive(Debug, Clone)]
pub struct PendingResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// One queue entry: the request plus the single-shot sender the scheduler
/// must use exactly once to unblock the HTTP handler that's waiting on it.
pub struct QueueEntry {
    pub request: QueuedRequest,
    pub finish: oneshot::Sender<PendingResponse>,
}

/// A handle to the bounded MPSC queue. Clone freely - every HTTP handler
/// task gets its own clone of the sender half; the scheduler owns the
/// single receiver.
#[derive(Clone)]
pub struct RequestQueue {
    tx: mpsc::Sender<QueueEntry>,
    rx: std::sync::Arc<tokio::sync::Mutex<mpsc::Receiver<QueueEntry>>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        Self { tx, rx: std::sync::Arc::new(tokio::sync::Mutex::new(rx)) }
    }

    /// Enqueues `entry`, suspending the caller if the queue is full.
    pub async fn add(&self, entry: QueueEntry) -> Result<(), QueueClosed> {
        self.tx.send(entry).await.map_err(|_| QueueClosed)
    }

    /// Non-blocking: returns the head entry if one is waiting, else `None`.
    /// Used by the scheduler, which must never suspend waiting for a
    /// request - if none has arrived it simply tries again next tick.
    pub async fn try_take(&self) -> Option<QueueEntry> {
        self.rx.lock().await.try_recv().ok()
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct QueueClosed;

impl std::fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inbound request queue is closed")
    }
}

impl std::error::Error for QueueClosed {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order_preserved() {
        let queue = RequestQueue::new();
        for i in 0..3 {
            let (finish, _rx) = oneshot::channel();
            queue
                .add(QueueEntry {
                    request: QueuedRequest {
                        method: "GET".into(),
                        path: format!("/r{i}"),
                        body: vec![],
                        headers: IndexMap::new(),
                    },
                    finish,
                })
                .await
                .unwrap();
        }
        for i in 0..3 {
            let entry = queue.try_take().await.unwrap();
            assert_eq!(entry.request.path, format!("/r{i}"));
        }
        assert!(queue.try_take().await.is_none());
    }
}

//! `cadence-notify` — fan-out of execution results to live observers.
//!
//! A thin wrapper over a tokio broadcast channel. Delivery is fire-and-forget
//! and at-most-once per execution: no acknowledgement, no retry, no replay.
//! Observers that subscribe after an event never see it — acceptable for the
//! live-dashboard use case this feeds.

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use cadence_core::result::ExecutionResult;

/// Fan-out execution results to all connected subscribers.
#[derive(Clone)]
pub struct ResultBroadcaster {
    tx: broadcast::Sender<ExecutionResult>,
}

impl ResultBroadcaster {
    /// `capacity` bounds how far a slow subscriber may lag before it starts
    /// losing the oldest events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// New observer subscribes to the result stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionResult> {
        self.tx.subscribe()
    }

    /// Stream-flavoured subscription for `Stream`-based consumers.
    pub fn subscribe_stream(&self) -> BroadcastStream<ExecutionResult> {
        BroadcastStream::new(self.tx.subscribe())
    }

    /// Push a result to all subscribers.
    /// Silently dropped when no subscriber exists.
    pub fn publish(&self, result: ExecutionResult) {
        let _ = self.tx.send(result);
    }
}

impl Default for ResultBroadcaster {
    fn default() -> Self {
        Self::new(cadence_core::config::DEFAULT_NOTIFY_CAPACITY)
    }
}

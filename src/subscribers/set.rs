//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`] to multiple subscribers
//! **without awaiting** their processing: `emit` pushes into per-subscriber
//! bounded queues, and one worker task per subscriber drains its queue in
//! FIFO order.
//!
//! A slow subscriber only ever fills its own queue; overflow drops the event
//! for that subscriber alone. Panics inside a subscriber are caught and
//! reported, never propagated.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::events::Event;

use super::Subscribe;

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    queues: Vec<(&'static str, mpsc::Sender<Arc<Event>>)>,
    workers: JoinSet<()>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut queues = Vec::with_capacity(subs.len());
        let mut workers = JoinSet::new();

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            queues.push((name, tx));

            workers.spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let handled = AssertUnwindSafe(sub.on_event(ev.as_ref()))
                        .catch_unwind()
                        .await;
                    if let Err(panic) = handled {
                        eprintln!("[treevisor] subscriber '{name}' panicked: {panic:?}");
                    }
                }
            });
        }

        Self { queues, workers }
    }

    /// Fan-out one event to all subscribers (non-blocking).
    ///
    /// If a subscriber's queue is full or its worker is gone, the event is
    /// dropped for that subscriber and a warning names it.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for (name, queue) in &self.queues {
            if let Err(err) = queue.try_send(Arc::clone(&ev)) {
                let cause = match err {
                    mpsc::error::TrySendError::Full(_) => "queue full",
                    mpsc::error::TrySendError::Closed(_) => "worker closed",
                };
                eprintln!("[treevisor] subscriber '{name}' dropped event: {cause}");
            }
        }
    }

    /// Graceful shutdown: close all queues and wait for every worker to
    /// finish draining.
    pub async fn shutdown(mut self) {
        self.queues.clear();
        while self.workers.join_next().await.is_some() {}
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.len()
    }
}

//! Per-session fan-out of progress events
//!
//! Each observer owns an unbounded channel; the broadcaster keeps the
//! sending halves grouped by session id. A send that fails (the
//! observer's receiver is gone) drops that observer without affecting
//! the others. Delivery order per observer follows publish order.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::ProgressEvent;

/// Registry of live observers per session
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    inner: Arc<BroadcasterInner>,
}

#[derive(Default)]
struct BroadcasterInner {
    observers: Mutex<HashMap<String, Vec<Observer>>>,
    next_id: AtomicU64,
}

struct Observer {
    id: u64,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl BroadcasterInner {
    fn observers(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Observer>>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, session_id: &str, observer_id: u64) -> bool {
        let mut observers = self.observers();
        let Some(list) = observers.get_mut(session_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|o| o.id != observer_id);
        let removed = list.len() != before;
        if list.is_empty() {
            observers.remove(session_id);
        }
        removed
    }
}

impl EventBroadcaster {
    /// Create an empty broadcaster
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer for `session_id`
    ///
    /// The returned [`Subscription`] yields every event published for the
    /// session from now on. Dropping it unsubscribes.
    pub fn subscribe(&self, session_id: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .observers()
            .entry(session_id.to_string())
            .or_default()
            .push(Observer { id, tx });

        tracing::debug!(session_id = %session_id, observer = id, "Observer subscribed");

        Subscription {
            id,
            session_id: session_id.to_string(),
            rx,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every observer of `session_id`
    ///
    /// Returns the number of observers that received it. Observers whose
    /// channel is closed are removed.
    pub fn publish(&self, session_id: &str, event: &ProgressEvent) -> usize {
        let mut observers = self.inner.observers();
        let Some(list) = observers.get_mut(session_id) else {
            return 0;
        };

        list.retain(|observer| {
            let delivered = observer.tx.send(event.clone()).is_ok();
            if !delivered {
                tracing::debug!(
                    session_id = %session_id,
                    observer = observer.id,
                    "Dropping closed observer"
                );
            }
            delivered
        });

        let delivered = list.len();
        if list.is_empty() {
            observers.remove(session_id);
        }
        delivered
    }

    /// Remove one observer explicitly
    ///
    /// Returns `false` if it was already gone.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.inner
            .remove(&subscription.session_id, subscription.id)
    }

    /// Drop every observer of a session, ending their streams
    pub fn close_session(&self, session_id: &str) -> usize {
        self.inner
            .observers()
            .remove(session_id)
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// Current number of observers for a session
    pub fn observer_count(&self, session_id: &str) -> usize {
        self.inner
            .observers()
            .get(session_id)
            .map(|list| list.len())
            .unwrap_or(0)
    }
}

/// One observer's view of a session's event stream
///
/// Implements [`Stream`]; the stream ends when the session is closed.
pub struct Subscription {
    id: u64,
    session_id: String,
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
    registry: Weak<BroadcasterInner>,
}

impl Subscription {
    /// Session this observer is attached to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Wait for the next event; `None` once the stream is closed
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Take an already-delivered event without waiting
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.session_id, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("session_id", &self.session_id)
            .finish()
    }
}

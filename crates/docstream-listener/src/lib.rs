//! # Docstream Listener
//!
//! Turns a query into a live, ordered stream of change events delivered to
//! a caller-supplied handler, surviving transient reconnects until
//! explicitly cancelled.
//!
//! ## State machine
//!
//! ```text
//! Idle → Subscribing → Streaming → (Reconnecting → Streaming)* → Stopped
//!                 └────────── unrecoverable error ──────────► Failed
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let listener = Listener::new(store);
//! let handle = listener.start(query, Arc::new(PrintHandler::new()));
//! // ...
//! handle.stop().await;
//! ```
//!
//! Re-subscription after a transient failure starts from "now": events
//! emitted during the gap are not recovered. Reconnects are surfaced
//! through [`ChangeHandler::on_reconnect`] so the gap stays observable.

pub mod handler;
pub mod reconnect;

pub use handler::*;
pub use reconnect::*;

use docstream_core::prelude::*;
use docstream_core::ListenerMetrics;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Listener lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Constructed, not yet subscribed
    Idle,
    /// Subscription request sent, no change-set observed yet
    Subscribing,
    /// At least one change-set received
    Streaming,
    /// Transient failure, waiting to re-subscribe
    Reconnecting,
    /// Cancelled or deadline reached; terminal
    Stopped,
    /// Unrecoverable failure; terminal
    Failed,
}

impl ListenerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Subscribing => "subscribing",
            Self::Streaming => "streaming",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    /// Whether the listener has finished for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Listener behavior knobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerOptions {
    /// Reconnect policy applied to transient subscription failures
    #[serde(default)]
    pub reconnect: ReconnectPolicy,

    /// Stop the listener after this long, exactly as explicit cancellation
    /// would (unbounded when unset)
    #[serde(default, with = "humantime_serde::option")]
    pub max_lifetime: Option<Duration>,
}

struct Inner {
    state: RwLock<ListenerState>,
    stop_tx: watch::Sender<bool>,
}

fn set_state(inner: &Inner, next: ListenerState) {
    let mut state = inner.state.write().expect("state lock poisoned");
    let current = *state;
    if current != next {
        debug!(from = %current, to = %next, "listener state changed");
        *state = next;
    }
}

/// Handle to a running listener
///
/// Dropping the handle does not stop the listener; call [`stop`] for a
/// deterministic shutdown.
///
/// [`stop`]: ListenerHandle::stop
pub struct ListenerHandle {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ListenerHandle {
    /// Current listener state
    pub fn state(&self) -> ListenerState {
        *self.inner.state.read().expect("state lock poisoned")
    }

    /// Signal the listener to stop without waiting for it
    ///
    /// Safe from any context, including synchronous code. Idempotent.
    pub fn request_stop(&self) {
        let _ = self.inner.stop_tx.send(true);
    }

    /// Stop the listener and wait for its delivery task to finish
    ///
    /// After this returns no further handler invocations occur and the
    /// underlying subscription is released. Idempotent: stopping an
    /// already-stopped listener is a no-op.
    pub async fn stop(&self) {
        self.request_stop();
        self.join().await;
    }

    /// Wait for the listener to reach a terminal state on its own
    pub async fn join(&self) {
        let mut guard = self.task.lock().await;
        if let Some(task) = guard.as_mut() {
            let _ = task.await;
            *guard = None;
        }
    }
}

/// Change listener factory bound to one store
///
/// Every [`start`] call spawns an independent delivery task; listeners
/// share nothing but the store handle, so events of different listeners
/// may interleave freely while events of one listener stay serialized.
///
/// [`start`]: Listener::start
pub struct Listener {
    store: Arc<dyn DocumentStore>,
    options: ListenerOptions,
    metrics: ListenerMetrics,
}

impl Listener {
    /// Create a listener factory with default options
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_options(store, ListenerOptions::default())
    }

    /// Create a listener factory with explicit options
    pub fn with_options(store: Arc<dyn DocumentStore>, options: ListenerOptions) -> Self {
        Self {
            store,
            options,
            metrics: ListenerMetrics::new("listener"),
        }
    }

    /// Start listening; returns immediately with a handle
    ///
    /// Delivery happens on a separate task. The handler is invoked once
    /// per change event, in store delivery order, never concurrently with
    /// itself.
    pub fn start(&self, query: Query, handler: Arc<dyn ChangeHandler>) -> ListenerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let inner = Arc::new(Inner {
            state: RwLock::new(ListenerState::Idle),
            stop_tx,
        });

        let task = tokio::spawn(run(
            self.store.clone(),
            query,
            handler,
            self.options.clone(),
            inner.clone(),
            stop_rx,
            self.metrics.clone(),
        ));

        ListenerHandle {
            inner,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Delivery loop: the state machine proper
///
/// Every exit path drops the subscription stream, releasing the store-side
/// subscription.
async fn run(
    store: Arc<dyn DocumentStore>,
    query: Query,
    handler: Arc<dyn ChangeHandler>,
    options: ListenerOptions,
    inner: Arc<Inner>,
    mut stop_rx: watch::Receiver<bool>,
    metrics: ListenerMetrics,
) {
    let deadline = async {
        match options.max_lifetime {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let collection = query.path().to_string();
    let mut attempt: u32 = 0;
    let mut last_error: Option<StoreError> = None;

    'subscribe: loop {
        if attempt > 0 {
            if !options.reconnect.should_retry(attempt) {
                let error = last_error
                    .take()
                    .unwrap_or_else(|| StoreError::subscription_lost("subscription stream ended"));
                error!(collection = %collection, error = %error, "reconnect attempts exhausted");
                metrics.record_error("reconnect_exhausted");
                handler.on_subscription_error(&error).await;
                set_state(&inner, ListenerState::Failed);
                return;
            }

            set_state(&inner, ListenerState::Reconnecting);
            metrics.record_reconnect();
            handler.on_reconnect(attempt).await;

            let delay = options.reconnect.delay(attempt);
            debug!(collection = %collection, attempt, ?delay, "backing off before re-subscribe");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop_rx.changed() => {
                    set_state(&inner, ListenerState::Stopped);
                    return;
                }
                _ = &mut deadline => {
                    set_state(&inner, ListenerState::Stopped);
                    return;
                }
            }
        }

        set_state(&inner, ListenerState::Subscribing);
        let mut stream = tokio::select! {
            _ = stop_rx.changed() => {
                set_state(&inner, ListenerState::Stopped);
                return;
            }
            _ = &mut deadline => {
                set_state(&inner, ListenerState::Stopped);
                return;
            }
            result = store.listen(query.clone()) => match result {
                Ok(stream) => stream,
                Err(error) if error.is_transient() => {
                    warn!(collection = %collection, error = %error, "subscribe failed");
                    attempt += 1;
                    last_error = Some(error);
                    continue 'subscribe;
                }
                Err(error) => {
                    error!(collection = %collection, error = %error, "subscription rejected");
                    metrics.record_error("subscribe_failed");
                    handler.on_subscription_error(&error).await;
                    set_state(&inner, ListenerState::Failed);
                    return;
                }
            }
        };

        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    set_state(&inner, ListenerState::Stopped);
                    return;
                }
                _ = &mut deadline => {
                    set_state(&inner, ListenerState::Stopped);
                    return;
                }
                next = stream.next() => match next {
                    Some(Ok(change_set)) => {
                        attempt = 0;
                        set_state(&inner, ListenerState::Streaming);
                        for change in change_set {
                            metrics.record_event(&collection, change.kind.as_str());
                            handler.on_change(change).await;
                        }
                    }
                    Some(Err(error)) if error.is_transient() => {
                        warn!(collection = %collection, error = %error, "subscription dropped");
                        attempt += 1;
                        last_error = Some(error);
                        continue 'subscribe;
                    }
                    Some(Err(error)) => {
                        error!(collection = %collection, error = %error, "subscription failed");
                        metrics.record_error("subscription_failed");
                        handler.on_subscription_error(&error).await;
                        set_state(&inner, ListenerState::Failed);
                        return;
                    }
                    None => {
                        warn!(collection = %collection, "subscription stream ended");
                        attempt += 1;
                        continue 'subscribe;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstream_core::{MemoryStore, MemoryStoreConfig, SubscriptionErrorKind, WriteBatch};

    const WAIT: Duration = Duration::from_secs(2);

    fn notifications() -> CollectionPath {
        CollectionPath::parse("rooms/1/notifications").unwrap()
    }

    async fn started_store(config: MemoryStoreConfig) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::with_config(config));
        store.start().await.unwrap();
        store
    }

    async fn wait_for_subscription(store: &MemoryStore, count: usize) {
        for _ in 0..200 {
            if store.subscription_count().await >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("subscription never opened");
    }

    fn live_only() -> MemoryStoreConfig {
        MemoryStoreConfig {
            deliver_initial_snapshot: false,
        }
    }

    #[tokio::test]
    async fn test_filtered_delivery_from_mixed_change_sets() {
        let store = started_store(live_only()).await;
        let handler = Arc::new(CollectingHandler::new());

        let query = Query::new(notifications())
            .with_filter(Filter::in_set("RoomId", ["1", "3"]).unwrap());
        let listener = Listener::new(store.clone());
        let handle = listener.start(query, handler.clone());
        wait_for_subscription(&store, 1).await;

        let mut batch = WriteBatch::new();
        for room in ["1", "2", "3", "4"] {
            batch.set(
                notifications(),
                Document::new().with("RoomId", room).with("Sender", "alice"),
            );
        }
        store.commit(batch).await.unwrap();

        assert!(handler.wait_for_changes(2, WAIT).await);
        // Give a non-matching event time to (wrongly) arrive
        tokio::time::sleep(Duration::from_millis(50)).await;

        let rooms: Vec<String> = handler
            .changes()
            .iter()
            .map(|c| c.document.get_str("RoomId").unwrap().to_string())
            .collect();
        assert_eq!(rooms, vec!["1", "3"]);

        handle.stop().await;
        store.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_events_delivered_in_store_order() {
        let store = started_store(live_only()).await;
        let handler = Arc::new(CollectingHandler::new());

        let listener = Listener::new(store.clone());
        let handle = listener.start(Query::new(notifications()), handler.clone());
        wait_for_subscription(&store, 1).await;

        let mut batch = WriteBatch::new();
        for sender in ["a", "b", "c"] {
            batch.set(notifications(), Document::new().with("Sender", sender));
        }
        store.commit(batch).await.unwrap();

        assert!(handler.wait_for_changes(3, WAIT).await);
        let changes = handler.changes();
        let senders: Vec<&str> = changes
            .iter()
            .map(|c| c.document.get_str("Sender").unwrap())
            .collect();
        assert_eq!(senders, vec!["a", "b", "c"]);
        assert!(changes.iter().all(|c| c.kind == ChangeKind::Added));
        assert!(changes.windows(2).all(|w| w[0].sequence < w[1].sequence));

        handle.stop().await;
        store.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_halts_delivery_and_is_idempotent() {
        let store = started_store(live_only()).await;
        let handler = Arc::new(CollectingHandler::new());

        let listener = Listener::new(store.clone());
        let handle = listener.start(Query::new(notifications()), handler.clone());
        wait_for_subscription(&store, 1).await;

        let mut batch = WriteBatch::new();
        batch.set(notifications(), Document::new().with("Sender", "alice"));
        store.commit(batch).await.unwrap();
        assert!(handler.wait_for_changes(1, WAIT).await);

        handle.stop().await;
        assert_eq!(handle.state(), ListenerState::Stopped);

        // Further change-sets from the store must never reach the handler.
        let mut batch = WriteBatch::new();
        batch.set(notifications(), Document::new().with("Sender", "bob"));
        store.commit(batch).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handler.changes().len(), 1);

        // Stopping again is a no-op, not an error.
        handle.stop().await;
        assert_eq!(handle.state(), ListenerState::Stopped);

        store.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_transient_interrupt_triggers_reconnect() {
        let store = started_store(MemoryStoreConfig::default()).await;
        store
            .set(&notifications(), "n1", Document::new().with("Sender", "alice"))
            .await
            .unwrap();

        let handler = Arc::new(CollectingHandler::new());
        let listener = Listener::new(store.clone());
        let handle = listener.start(Query::new(notifications()), handler.clone());

        // Initial snapshot delivers the existing document.
        assert!(handler.wait_for_changes(1, WAIT).await);

        store
            .interrupt_subscriptions(SubscriptionErrorKind::TransportLost)
            .await;

        // The listener re-subscribes from "now"; the fresh snapshot
        // re-delivers the document (at-least-once).
        assert!(handler.wait_for_changes(2, WAIT).await);
        assert!(handler.reconnects() >= 1);
        assert!(handler.errors().is_empty());
        assert_eq!(handle.state(), ListenerState::Streaming);

        handle.stop().await;
        store.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_permanent_error_fails_listener() {
        let store = started_store(live_only()).await;
        let handler = Arc::new(CollectingHandler::new());

        let listener = Listener::new(store.clone());
        let handle = listener.start(Query::new(notifications()), handler.clone());
        wait_for_subscription(&store, 1).await;

        store
            .interrupt_subscriptions(SubscriptionErrorKind::BadQuery)
            .await;

        assert!(handler.wait_for_error(WAIT).await);
        handle.join().await;
        assert_eq!(handle.state(), ListenerState::Failed);
        assert_eq!(handler.reconnects(), 0);

        store.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_bounded_policy_exhausts_and_fails() {
        let store = started_store(live_only()).await;
        let handler = Arc::new(CollectingHandler::new());

        let options = ListenerOptions {
            reconnect: ReconnectPolicy::bounded(0),
            max_lifetime: None,
        };
        let listener = Listener::with_options(store.clone(), options);
        let handle = listener.start(Query::new(notifications()), handler.clone());
        wait_for_subscription(&store, 1).await;

        store
            .interrupt_subscriptions(SubscriptionErrorKind::TransportLost)
            .await;

        assert!(handler.wait_for_error(WAIT).await);
        handle.join().await;
        assert_eq!(handle.state(), ListenerState::Failed);

        store.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_deadline_stops_listener() {
        let store = started_store(live_only()).await;
        let handler = Arc::new(CollectingHandler::new());

        let options = ListenerOptions {
            reconnect: ReconnectPolicy::default(),
            max_lifetime: Some(Duration::from_millis(50)),
        };
        let listener = Listener::with_options(store.clone(), options);
        let handle = listener.start(Query::new(notifications()), handler.clone());

        handle.join().await;
        assert_eq!(handle.state(), ListenerState::Stopped);

        store.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_independent_listeners_run_concurrently() {
        let store = started_store(live_only()).await;
        let rooms_handler = Arc::new(CollectingHandler::new());
        let cities_handler = Arc::new(CollectingHandler::new());
        let cities = CollectionPath::parse("cities").unwrap();

        let listener = Listener::new(store.clone());
        let rooms_handle = listener.start(Query::new(notifications()), rooms_handler.clone());
        let cities_handle = listener.start(Query::new(cities.clone()), cities_handler.clone());
        wait_for_subscription(&store, 2).await;

        let mut batch = WriteBatch::new();
        batch.set(notifications(), Document::new().with("Sender", "alice"));
        batch.set_with_id(cities, "TOK", Document::new().with("name", "Tokyo"));
        store.commit(batch).await.unwrap();

        assert!(rooms_handler.wait_for_changes(1, WAIT).await);
        assert!(cities_handler.wait_for_changes(1, WAIT).await);
        assert_eq!(rooms_handler.changes()[0].document.get_str("Sender"), Some("alice"));
        assert_eq!(cities_handler.changes()[0].doc_id, "TOK");

        rooms_handle.stop().await;
        cities_handle.stop().await;
        store.stop().await.unwrap();
    }
}

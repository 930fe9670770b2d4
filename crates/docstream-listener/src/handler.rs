//! Change handlers
//!
//! A handler receives the events of exactly one listener, one at a time,
//! in store delivery order. Invocations for a single listener never
//! overlap; handlers of independent listeners may run concurrently.

use async_trait::async_trait;
use docstream_core::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, warn};

/// Callback contract for one listener
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    /// Called once per change event, in delivery order
    async fn on_change(&self, change: DocumentChange);

    /// Called before each reconnect attempt after a transient failure
    ///
    /// Events emitted during the reconnect gap are not recovered; this hook
    /// makes the gap observable.
    async fn on_reconnect(&self, attempt: u32) {
        let _ = attempt;
    }

    /// Called when the subscription fails permanently or reconnect
    /// attempts are exhausted; the listener transitions to `Failed` after
    /// this returns
    async fn on_subscription_error(&self, error: &StoreError) {
        let _ = error;
    }
}

/// Handler that prints each change, the way the demo binaries consume events
#[derive(Debug, Default)]
pub struct PrintHandler;

impl PrintHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChangeHandler for PrintHandler {
    async fn on_change(&self, change: DocumentChange) {
        println!(
            "{} {} seq={} data: {}",
            change.kind, change.doc_id, change.sequence, change.document
        );
    }

    async fn on_reconnect(&self, attempt: u32) {
        warn!(attempt, "listener reconnecting");
    }

    async fn on_subscription_error(&self, error: &StoreError) {
        error!(error = %error, "listener subscription error");
    }
}

/// Handler that records everything it sees (for tests)
#[derive(Default)]
pub struct CollectingHandler {
    changes: Mutex<Vec<DocumentChange>>,
    errors: Mutex<Vec<String>>,
    reconnects: AtomicU32,
    notify: Notify,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded changes, in delivery order
    pub fn changes(&self) -> Vec<DocumentChange> {
        self.changes.lock().expect("changes lock poisoned").clone()
    }

    /// Rendered subscription errors, in arrival order
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("errors lock poisoned").clone()
    }

    /// Number of reconnect notifications observed
    pub fn reconnects(&self) -> u32 {
        self.reconnects.load(Ordering::SeqCst)
    }

    /// Wait until the predicate holds or the timeout elapses
    pub async fn wait_until<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&Self) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if predicate(self) {
                return true;
            }
            let notified = self.notify.notified();
            if predicate(self) {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return predicate(self);
            }
        }
    }

    /// Wait until at least `count` changes have arrived
    pub async fn wait_for_changes(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |h| {
            h.changes.lock().expect("changes lock poisoned").len() >= count
        })
        .await
    }

    /// Wait until at least one subscription error has arrived
    pub async fn wait_for_error(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |h| {
            !h.errors.lock().expect("errors lock poisoned").is_empty()
        })
        .await
    }
}

#[async_trait]
impl ChangeHandler for CollectingHandler {
    async fn on_change(&self, change: DocumentChange) {
        self.changes
            .lock()
            .expect("changes lock poisoned")
            .push(change);
        self.notify.notify_one();
    }

    async fn on_reconnect(&self, _attempt: u32) {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_one();
    }

    async fn on_subscription_error(&self, error: &StoreError) {
        self.errors
            .lock()
            .expect("errors lock poisoned")
            .push(error.to_string());
        self.notify.notify_one();
    }
}

//! In-memory store backend
//!
//! Reference implementation of the [`DocumentStore`] facade, used by tests
//! and the demo binaries. Documents live in per-collection maps; live
//! subscriptions are fed through unbounded channels with per-subscription
//! query filtering, the way the vendor store filters server-side.
//!
//! Test affordances: one-shot commit fault injection and subscription
//! interruption with a chosen error kind.

use crate::batch::{WriteBatch, WriteOp};
use crate::document::{ChangeSet, Document, DocumentChange};
use crate::error::{Result, StoreError, SubscriptionErrorKind, WriteErrorKind};
use crate::metrics::StoreMetrics;
use crate::path::CollectionPath;
use crate::query::Query;
use crate::store::{ChangeStream, DocumentStore, HealthCheck, Lifecycle};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, trace};
use uuid::Uuid;

/// Configuration for the in-memory backend
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Deliver the current matching documents as one `Added` change-set
    /// when a subscription opens
    pub deliver_initial_snapshot: bool,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            deliver_initial_snapshot: true,
        }
    }
}

struct Subscriber {
    query: Query,
    sender: mpsc::UnboundedSender<Result<ChangeSet>>,
}

/// In-memory document store
pub struct MemoryStore {
    config: MemoryStoreConfig,
    collections: RwLock<HashMap<CollectionPath, BTreeMap<String, Document>>>,
    subscribers: RwLock<Vec<Subscriber>>,
    next_sequence: AtomicU64,
    running: AtomicBool,
    fail_next_commit: Mutex<Option<WriteErrorKind>>,
    metrics: StoreMetrics,
}

impl MemoryStore {
    /// Create a store with default configuration
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Create a store with explicit configuration
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            config,
            collections: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(Vec::new()),
            next_sequence: AtomicU64::new(1),
            running: AtomicBool::new(false),
            fail_next_commit: Mutex::new(None),
            metrics: StoreMetrics::new("memory_store"),
        }
    }

    /// Fail the next commit with the given kind, leaving no partial state
    pub fn inject_commit_failure(&self, kind: WriteErrorKind) {
        *self.fail_next_commit.lock().expect("fault lock poisoned") = Some(kind);
    }

    /// Terminate every open subscription with an error of the given kind
    ///
    /// The error is delivered as the final stream item, then the stream
    /// ends. Transient kinds let listeners exercise their reconnect path.
    pub async fn interrupt_subscriptions(&self, kind: SubscriptionErrorKind) {
        let mut subs = self.subscribers.write().await;
        let interrupted = subs.len();
        for sub in subs.drain(..) {
            let _ = sub
                .sender
                .send(Err(StoreError::subscription(kind, "subscription interrupted by store")));
        }
        self.metrics.set_active_subscriptions(0);
        debug!(interrupted, kind = %kind, "interrupted subscriptions");
    }

    /// Number of currently open subscriptions
    pub async fn subscription_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(StoreError::network_unavailable("store is not started"))
        }
    }

    /// Deliver changes to every subscription whose query matches, pruning
    /// disconnected subscribers.
    async fn dispatch(&self, changes: &[(CollectionPath, DocumentChange)]) {
        let mut subs = self.subscribers.write().await;
        subs.retain(|sub| {
            let matched: ChangeSet = changes
                .iter()
                .filter(|(path, change)| {
                    path == sub.query.path() && sub.query.matches(&change.document)
                })
                .map(|(_, change)| change.clone())
                .collect();

            if matched.is_empty() {
                return !sub.sender.is_closed();
            }
            sub.sender.send(Ok(matched)).is_ok()
        });
        self.metrics.set_active_subscriptions(subs.len());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Lifecycle for MemoryStore {
    async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        info!("memory store started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);

        // Dropping the senders ends every subscription stream.
        let mut subs = self.subscribers.write().await;
        let released = subs.len();
        subs.clear();
        self.metrics.set_active_subscriptions(0);

        info!(released, "memory store stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn health_check(&self) -> Result<()> {
        self.ensure_running()
    }

    fn component_name(&self) -> &'static str {
        "memory_store"
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn listen(&self, query: Query) -> Result<ChangeStream> {
        self.ensure_running()?;

        let (sender, mut receiver) = mpsc::unbounded_channel();

        if self.config.deliver_initial_snapshot {
            let collections = self.collections.read().await;
            if let Some(docs) = collections.get(query.path()) {
                let snapshot: ChangeSet = docs
                    .iter()
                    .filter(|(_, doc)| query.matches(doc))
                    .map(|(id, doc)| {
                        DocumentChange::added(id.clone(), doc.clone(), self.next_sequence())
                    })
                    .collect();
                if !snapshot.is_empty() {
                    let _ = sender.send(Ok(snapshot));
                }
            }
        }

        {
            let mut subs = self.subscribers.write().await;
            subs.push(Subscriber {
                query: query.clone(),
                sender,
            });
            self.metrics.set_active_subscriptions(subs.len());
        }
        trace!(path = %query.path(), filters = query.filters().len(), "subscription opened");

        let stream = async_stream::stream! {
            while let Some(item) = receiver.recv().await {
                yield item;
            }
        };
        Ok(Box::pin(stream))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<usize> {
        self.ensure_running()?;

        if let Some(kind) = self.fail_next_commit.lock().expect("fault lock poisoned").take() {
            return Err(StoreError::write(kind, "injected commit failure"));
        }
        if batch.is_empty() {
            return Ok(0);
        }

        let mut changes: Vec<(CollectionPath, DocumentChange)> = Vec::with_capacity(batch.len());
        {
            let mut collections = self.collections.write().await;
            for op in batch {
                match op {
                    WriteOp::Set { path, id, document } => {
                        let docs = collections.entry(path.clone()).or_default();
                        let id = id.unwrap_or_else(|| Uuid::now_v7().simple().to_string());
                        let change = if docs.contains_key(&id) {
                            DocumentChange::modified(
                                id.clone(),
                                document.clone(),
                                self.next_sequence(),
                            )
                        } else {
                            DocumentChange::added(id.clone(), document.clone(), self.next_sequence())
                        };
                        docs.insert(id, document);
                        changes.push((path, change));
                    }
                    WriteOp::Delete { path, id } => {
                        if let Some(docs) = collections.get_mut(&path) {
                            if let Some(document) = docs.remove(&id) {
                                changes.push((
                                    path,
                                    DocumentChange::removed(id, document, self.next_sequence()),
                                ));
                            }
                        }
                    }
                }
            }
        }

        let applied = changes.len();
        self.dispatch(&changes).await;
        trace!(applied, "committed batch");
        Ok(applied)
    }

    async fn set(&self, path: &CollectionPath, id: &str, document: Document) -> Result<()> {
        let mut batch = WriteBatch::with_capacity(1);
        batch.set_with_id(path.clone(), id, document);
        self.commit(batch).await.map(|_| ())
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<(String, Document)>> {
        self.ensure_running()?;

        let collections = self.collections.read().await;
        let results = collections
            .get(query.path())
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| query.matches(doc))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(results)
    }
}

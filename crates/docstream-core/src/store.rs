//! Store facade traits
//!
//! The vendor database is an external collaborator reached through the
//! [`DocumentStore`] trait. This repository ships one in-tree
//! implementation, the in-memory backend in [`crate::memory`], used by
//! tests and the demo binaries; a vendor-backed implementation would live
//! out-of-tree.
//!
//! ## Design
//!
//! - **Async-first**: every store round trip is async
//! - **Stream-based**: live subscriptions are async streams of change-sets
//! - **Shared**: one store instance is created at startup, shared as
//!   `Arc<dyn DocumentStore>` by every loader and listener, and stopped
//!   exactly once after all listeners have stopped

use crate::batch::WriteBatch;
use crate::document::{ChangeSet, Document};
use crate::error::Result;
use crate::path::CollectionPath;
use crate::query::Query;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Type alias for boxed async streams of change-sets
pub type ChangeStream = Pin<Box<dyn Stream<Item = Result<ChangeSet>> + Send>>;

/// Lifecycle management for components
///
/// Provides graceful startup and shutdown semantics.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Start the component
    ///
    /// Called once before any operations. Should establish connections,
    /// initialize state, and prepare for operation.
    async fn start(&self) -> Result<()>;

    /// Stop the component gracefully
    ///
    /// Called during shutdown. Should release subscriptions, close
    /// connections, and free resources. May be called even if start() failed.
    async fn stop(&self) -> Result<()>;

    /// Check if the component is running
    fn is_running(&self) -> bool;
}

/// Health check capability
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Perform health check
    ///
    /// Returns Ok(()) if healthy, Err with details if not.
    async fn health_check(&self) -> Result<()>;

    /// Get component name for health reporting
    fn component_name(&self) -> &'static str;
}

/// Document store facade
///
/// Implementations:
/// - `MemoryStore`: in-memory reference backend (tests, demos)
/// - vendor SDK adapters (out-of-tree)
#[async_trait]
pub trait DocumentStore: Lifecycle + HealthCheck {
    /// Open a live subscription for a query
    ///
    /// Returns a stream of change-sets in the store's delivery order. The
    /// subscription is released when the stream is dropped. A transient
    /// failure surfaces as an `Err` item with a transient subscription
    /// kind; callers re-subscribe from "now" (events emitted during the gap
    /// are not recovered).
    async fn listen(&self, query: Query) -> Result<ChangeStream>;

    /// Commit a write batch atomically
    ///
    /// Either every operation in the batch becomes visible to subsequent
    /// reads or none do, so a failed commit is always safe to retry
    /// wholesale. Returns the number of operations applied.
    async fn commit(&self, batch: WriteBatch) -> Result<usize>;

    /// Create or overwrite a single document
    async fn set(&self, path: &CollectionPath, id: &str, document: Document) -> Result<()>;

    /// One-shot read of all documents matching a query
    ///
    /// Returns `(doc_id, document)` pairs; ordering follows the store.
    async fn fetch(&self, query: &Query) -> Result<Vec<(String, Document)>>;
}

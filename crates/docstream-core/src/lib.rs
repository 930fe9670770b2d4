//! # Docstream Core
//!
//! Core types, strategy traits, and utilities for the docstream system: a
//! change-feed listener and seed-loader facade over a document-oriented
//! database.
//!
//! The vendor database itself is an external collaborator reached through
//! the [`DocumentStore`] trait. This crate defines:
//! - The document data model (values, documents, collection paths)
//! - The query model (filters with conjunctive AND semantics)
//! - Change events and change-sets delivered by live subscriptions
//! - Atomic write batches
//! - The store facade traits and an in-memory reference backend
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ Seed Loader │────►│ DocumentStore│────►│  Listener   │
//! │  (batches)  │     │   (facade)   │     │ (change-sets│
//! └─────────────┘     └──────────────┘     │  → handler) │
//!                                          └─────────────┘
//! ```

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod path;
pub mod query;
pub mod store;

pub use batch::*;
pub use config::*;
pub use document::*;
pub use error::*;
pub use memory::*;
pub use path::*;
pub use query::*;
pub use store::*;
// `self::` disambiguates the module from the `metrics` crate.
pub use self::metrics::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::batch::{WriteBatch, WriteOp};
    pub use crate::config::Identity;
    pub use crate::document::{ChangeKind, ChangeSet, Document, DocumentChange, Value};
    pub use crate::error::{
        ConfigErrorKind, ConnectionErrorKind, Result, StoreError, SubscriptionErrorKind,
        WriteErrorKind,
    };
    pub use crate::path::CollectionPath;
    pub use crate::query::{Filter, Predicate, Query};
    pub use crate::store::{ChangeStream, DocumentStore, HealthCheck, Lifecycle};
}

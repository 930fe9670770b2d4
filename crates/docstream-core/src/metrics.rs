//! Metrics for docstream
//!
//! Thin facades over the `metrics` crate so components record consistent
//! counter/gauge/histogram names.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Metric names as constants for consistency
pub mod names {
    // Listener metrics
    pub const LISTENER_EVENTS_TOTAL: &str = "docstream_listener_events_total";
    pub const LISTENER_RECONNECTS_TOTAL: &str = "docstream_listener_reconnects_total";
    pub const LISTENER_ERRORS_TOTAL: &str = "docstream_listener_errors_total";

    // Seeder metrics
    pub const SEEDER_COMMITS_TOTAL: &str = "docstream_seeder_commits_total";
    pub const SEEDER_DOCS_WRITTEN_TOTAL: &str = "docstream_seeder_docs_written_total";
    pub const SEEDER_COMMIT_LATENCY: &str = "docstream_seeder_commit_latency_seconds";

    // Store metrics
    pub const STORE_ACTIVE_SUBSCRIPTIONS: &str = "docstream_store_active_subscriptions";
}

/// Labels for metrics
pub mod labels {
    pub const COMPONENT: &str = "component";
    pub const COLLECTION: &str = "collection";
    pub const KIND: &str = "kind";
    pub const ERROR_TYPE: &str = "error_type";
    pub const STATUS: &str = "status";
}

/// Listener metrics
#[derive(Clone)]
pub struct ListenerMetrics {
    component: String,
}

impl ListenerMetrics {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Record a delivered change event
    pub fn record_event(&self, collection: &str, kind: &str) {
        counter!(
            names::LISTENER_EVENTS_TOTAL,
            labels::COMPONENT => self.component.clone(),
            labels::COLLECTION => collection.to_string(),
            labels::KIND => kind.to_string(),
        )
        .increment(1);
    }

    /// Record a reconnect attempt
    pub fn record_reconnect(&self) {
        counter!(
            names::LISTENER_RECONNECTS_TOTAL,
            labels::COMPONENT => self.component.clone(),
        )
        .increment(1);
    }

    /// Record an error
    pub fn record_error(&self, error_type: &str) {
        counter!(
            names::LISTENER_ERRORS_TOTAL,
            labels::COMPONENT => self.component.clone(),
            labels::ERROR_TYPE => error_type.to_string(),
        )
        .increment(1);
    }
}

/// Seeder metrics
#[derive(Clone)]
pub struct SeederMetrics {
    component: String,
}

impl SeederMetrics {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Record a batch commit outcome
    pub fn record_commit(&self, status: &str) {
        counter!(
            names::SEEDER_COMMITS_TOTAL,
            labels::COMPONENT => self.component.clone(),
            labels::STATUS => status.to_string(),
        )
        .increment(1);
    }

    /// Record documents written
    pub fn record_docs_written(&self, count: u64) {
        counter!(
            names::SEEDER_DOCS_WRITTEN_TOTAL,
            labels::COMPONENT => self.component.clone(),
        )
        .increment(count);
    }

    /// Record commit latency
    pub fn record_commit_latency(&self, duration: Duration) {
        histogram!(
            names::SEEDER_COMMIT_LATENCY,
            labels::COMPONENT => self.component.clone(),
        )
        .record(duration.as_secs_f64());
    }
}

/// Store metrics
#[derive(Clone)]
pub struct StoreMetrics {
    component: String,
}

impl StoreMetrics {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Update the active subscription gauge
    pub fn set_active_subscriptions(&self, count: usize) {
        gauge!(
            names::STORE_ACTIVE_SUBSCRIPTIONS,
            labels::COMPONENT => self.component.clone(),
        )
        .set(count as f64);
    }
}

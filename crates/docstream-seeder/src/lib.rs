//! # Docstream Seeder
//!
//! Seeds reference data into a document store as atomic batches.
//!
//! A `seed` call issues exactly one commit: either every record in the call
//! is visible to subsequent reads, or none are. Atomicity is delegated to
//! the store, and the seeder performs no retry of its own; because batches
//! are atomic, a failed call is always safe for the caller to retry
//! wholesale with no partial-application risk.

use docstream_core::prelude::*;
use docstream_core::SeederMetrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// One record to seed: a collection path, an optional explicit identifier,
/// and the document itself
///
/// Records without an identifier get one assigned by the store at commit
/// time.
#[derive(Debug, Clone)]
pub struct SeedRecord {
    pub path: CollectionPath,
    pub id: Option<String>,
    pub document: Document,
}

impl SeedRecord {
    /// Record with a store-assigned identifier
    pub fn new(path: CollectionPath, document: Document) -> Self {
        Self {
            path,
            id: None,
            document,
        }
    }

    /// Record with an explicit identifier
    pub fn with_id(path: CollectionPath, id: impl Into<String>, document: Document) -> Self {
        Self {
            path,
            id: Some(id.into()),
            document,
        }
    }
}

/// Seed loader bound to one store
pub struct Seeder {
    store: Arc<dyn DocumentStore>,
    metrics: SeederMetrics,
}

impl Seeder {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            metrics: SeederMetrics::new("seeder"),
        }
    }

    /// Commit all records as one atomic batch
    ///
    /// Returns the number of records written. On failure nothing was
    /// written and the whole call may be retried.
    pub async fn seed(&self, records: Vec<SeedRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::with_capacity(records.len());
        for record in records {
            match record.id {
                Some(id) => batch.set_with_id(record.path, id, record.document),
                None => batch.set(record.path, record.document),
            }
        }

        let start = Instant::now();
        match self.store.commit(batch).await {
            Ok(count) => {
                self.metrics.record_commit("ok");
                self.metrics.record_docs_written(count as u64);
                self.metrics.record_commit_latency(start.elapsed());
                info!(count, "seeded batch");
                Ok(count)
            }
            Err(error) => {
                self.metrics.record_commit("error");
                warn!(error = %error, "seed batch rejected");
                Err(error)
            }
        }
    }

    /// Create or overwrite a single document outside any batch
    pub async fn put(&self, path: &CollectionPath, id: &str, document: Document) -> Result<()> {
        self.store.set(path, id, document).await?;
        self.metrics.record_docs_written(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstream_core::{MemoryStore, WriteErrorKind};
    use docstream_listener::{CollectingHandler, Listener};
    use std::time::Duration;

    fn notifications() -> CollectionPath {
        CollectionPath::parse("rooms/1/notifications").unwrap()
    }

    async fn started_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.start().await.unwrap();
        store
    }

    fn sample_records() -> Vec<SeedRecord> {
        [("1", "a"), ("2", "b"), ("3", "c")]
            .into_iter()
            .map(|(id, sender)| {
                SeedRecord::with_id(
                    notifications(),
                    id,
                    Document::new().with("Sender", sender),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_seed_writes_all_records() {
        let store = started_store().await;
        let seeder = Seeder::new(store.clone());

        let count = seeder.seed(sample_records()).await.unwrap();
        assert_eq!(count, 3);

        let docs = store.fetch(&Query::new(notifications())).await.unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_seed_writes_nothing() {
        let store = started_store().await;
        store.inject_commit_failure(WriteErrorKind::QuotaExceeded);
        let seeder = Seeder::new(store.clone());

        let err = seeder.seed(sample_records()).await.unwrap_err();
        assert_eq!(err.write_kind(), Some(WriteErrorKind::QuotaExceeded));

        let docs = store.fetch(&Query::new(notifications())).await.unwrap();
        assert!(docs.is_empty());

        // Atomicity makes the retry safe: same batch, no duplicates.
        assert_eq!(seeder.seed(sample_records()).await.unwrap(), 3);
        let docs = store.fetch(&Query::new(notifications())).await.unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[tokio::test]
    async fn test_seed_empty_is_a_no_op() {
        let store = started_store().await;
        let seeder = Seeder::new(store.clone());
        assert_eq!(seeder.seed(Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_overwrites_single_document() {
        let store = started_store().await;
        let seeder = Seeder::new(store.clone());
        let cities = CollectionPath::parse("cities").unwrap();

        seeder
            .put(&cities, "TOK", Document::new().with("population", 9_000_000_i64))
            .await
            .unwrap();
        seeder
            .put(&cities, "TOK", Document::new().with("population", 9_100_000_i64))
            .await
            .unwrap();

        let docs = store.fetch(&Query::new(cities)).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].1.get_i64("population"), Some(9_100_000));
    }

    /// Seed three records, then listen with no filter: three `added`
    /// events arrive, one per record, in the order the store delivers.
    #[tokio::test]
    async fn test_seeded_records_reach_a_listener() {
        let store = started_store().await;
        let handler = Arc::new(CollectingHandler::new());

        let listener = Listener::new(store.clone() as Arc<dyn DocumentStore>);
        let handle = listener.start(Query::new(notifications()), handler.clone());
        for _ in 0..200 {
            if store.subscription_count().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let seeder = Seeder::new(store.clone());
        seeder.seed(sample_records()).await.unwrap();

        assert!(handler.wait_for_changes(3, Duration::from_secs(2)).await);
        let changes = handler.changes();
        let senders: Vec<&str> = changes
            .iter()
            .map(|c| c.document.get_str("Sender").unwrap())
            .collect();
        assert_eq!(senders, vec!["a", "b", "c"]);
        assert!(changes.iter().all(|c| c.kind == ChangeKind::Added));

        handle.stop().await;
        store.stop().await.unwrap();
    }
}

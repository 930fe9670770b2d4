//! Atomic write batches
//!
//! A batch is an ordered list of write operations committed as one unit:
//! either every operation is visible to subsequent reads or none are.
//! Atomicity is the store's guarantee and is not reimplemented locally.

use crate::document::Document;
use crate::path::CollectionPath;

/// One write operation inside a batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create or overwrite a document
    ///
    /// With `id: None` the store assigns an identifier at commit time.
    Set {
        path: CollectionPath,
        id: Option<String>,
        document: Document,
    },
    /// Delete a document; deleting a missing document is not an error
    Delete { path: CollectionPath, id: String },
}

/// Ordered batch of write operations committed atomically
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Create empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Create batch with capacity hint
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
        }
    }

    /// Add a set with a store-assigned identifier
    pub fn set(&mut self, path: CollectionPath, document: Document) {
        self.ops.push(WriteOp::Set {
            path,
            id: None,
            document,
        });
    }

    /// Add a set with an explicit identifier
    pub fn set_with_id(&mut self, path: CollectionPath, id: impl Into<String>, document: Document) {
        self.ops.push(WriteOp::Set {
            path,
            id: Some(id.into()),
            document,
        });
    }

    /// Add a delete
    pub fn delete(&mut self, path: CollectionPath, id: impl Into<String>) {
        self.ops.push(WriteOp::Delete {
            path,
            id: id.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterate over operations in commit order
    pub fn iter(&self) -> impl Iterator<Item = &WriteOp> {
        self.ops.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl FromIterator<WriteOp> for WriteBatch {
    fn from_iter<T: IntoIterator<Item = WriteOp>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_builder_keeps_order() {
        let cities = CollectionPath::parse("cities").unwrap();
        let notifications = CollectionPath::parse("rooms/1/notifications").unwrap();

        let mut batch = WriteBatch::new();
        batch.set_with_id(cities.clone(), "TOK", Document::new().with("name", "Tokyo"));
        batch.set(notifications.clone(), Document::new().with("Sender", "alice"));
        batch.delete(cities, "SF");

        assert_eq!(batch.len(), 3);

        let ops: Vec<WriteOp> = batch.into_iter().collect();
        assert!(matches!(&ops[0], WriteOp::Set { id: Some(id), .. } if id == "TOK"));
        assert!(matches!(&ops[1], WriteOp::Set { id: None, .. }));
        assert!(matches!(&ops[2], WriteOp::Delete { id, .. } if id == "SF"));
    }
}

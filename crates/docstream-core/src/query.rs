//! Query model
//!
//! A query is one collection path plus an ordered list of filters combined
//! with conjunctive AND semantics. Queries are immutable value objects:
//! `with_filter` returns a new query and building is referentially
//! transparent.
//!
//! Local evaluation (`Query::matches`) exists so in-tree store backends can
//! apply the same semantics the vendor store would apply server-side. No
//! validation of field existence happens locally; an absent field simply
//! fails the predicate.

use crate::document::{Document, Value};
use crate::error::{Result, StoreError};
use crate::path::CollectionPath;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Maximum number of elements a membership-in-set filter may carry
///
/// Mirrors the store's documented cap; oversized sets are rejected locally
/// and never sent to the store.
pub const MAX_IN_SET: usize = 30;

/// Predicate applied to one document field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Equals(Value),
    GreaterThan(Value),
    LessThan(Value),
    In(Vec<Value>),
}

impl Predicate {
    fn eval(&self, value: &Value) -> bool {
        match self {
            Predicate::Equals(expected) => value == expected,
            Predicate::GreaterThan(threshold) => {
                value.compare(threshold) == Some(Ordering::Greater)
            }
            Predicate::LessThan(threshold) => value.compare(threshold) == Some(Ordering::Less),
            Predicate::In(values) => values.contains(value),
        }
    }
}

/// A single field filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    field: String,
    predicate: Predicate,
}

impl Filter {
    /// Field equals value
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            predicate: Predicate::Equals(value.into()),
        }
    }

    /// Field strictly greater than value
    pub fn greater_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            predicate: Predicate::GreaterThan(value.into()),
        }
    }

    /// Field strictly less than value
    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            predicate: Predicate::LessThan(value.into()),
        }
    }

    /// Field is a member of the given set
    ///
    /// The set must be non-empty and hold at most [`MAX_IN_SET`] elements;
    /// violations fail locally with `InvalidFilter`.
    pub fn in_set(
        field: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Result<Self> {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();

        if values.is_empty() {
            return Err(StoreError::invalid_filter(
                "membership-in-set filter requires a non-empty set",
            ));
        }
        if values.len() > MAX_IN_SET {
            return Err(StoreError::invalid_filter(format!(
                "membership-in-set filter holds {} elements, store maximum is {}",
                values.len(),
                MAX_IN_SET
            )));
        }

        Ok(Self {
            field: field.into(),
            predicate: Predicate::In(values),
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Evaluate this filter against a document
    pub fn matches(&self, document: &Document) -> bool {
        match document.get(&self.field) {
            Some(value) => self.predicate.eval(value),
            None => false,
        }
    }
}

/// An immutable query descriptor: one collection path plus conjunctive filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    path: CollectionPath,
    filters: Vec<Filter>,
}

impl Query {
    /// Create an unfiltered query over a collection
    pub fn new(path: CollectionPath) -> Self {
        Self {
            path,
            filters: Vec::new(),
        }
    }

    /// Return a new query with the filter appended
    ///
    /// Filters keep the order in which they were applied.
    pub fn with_filter(&self, filter: Filter) -> Self {
        let mut next = self.clone();
        next.filters.push(filter);
        next
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Filters in application order
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Evaluate all filters against a document (AND semantics)
    pub fn matches(&self, document: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(document))
    }
}

//! Collection path addressing
//!
//! A collection path names a group of documents inside the store, e.g.
//! `rooms/1/notifications`: alternating collection and document segments,
//! always ending on a collection.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hierarchical address of a collection of documents
///
/// Invariants, enforced at parse time:
/// - at least one segment
/// - an odd number of segments (the path ends on a collection)
/// - no empty segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// Parse a `/`-separated collection path
    pub fn parse(path: impl AsRef<str>) -> Result<Self> {
        let raw = path.as_ref();
        let segments: Vec<String> = raw.split('/').map(str::to_string).collect();

        if raw.is_empty() || segments.is_empty() {
            return Err(StoreError::invalid_path(raw, "path is empty"));
        }
        if segments.iter().any(String::is_empty) {
            return Err(StoreError::invalid_path(raw, "path contains an empty segment"));
        }
        if segments.len() % 2 == 0 {
            return Err(StoreError::invalid_path(
                raw,
                "path must end on a collection (odd number of segments)",
            ));
        }

        Ok(Self { segments })
    }

    /// All path segments, in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final collection segment, e.g. `notifications` for
    /// `rooms/1/notifications`
    pub fn collection_id(&self) -> &str {
        self.segments.last().expect("path is never empty")
    }

    /// Nesting depth in collections (1 for `cities`, 2 for
    /// `rooms/1/notifications`)
    pub fn depth(&self) -> usize {
        self.segments.len() / 2 + 1
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromStr for CollectionPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CollectionPath {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for CollectionPath {
    type Error = StoreError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<CollectionPath> for String {
    fn from(path: CollectionPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_paths() {
        let path = CollectionPath::parse("cities").unwrap();
        assert_eq!(path.collection_id(), "cities");
        assert_eq!(path.depth(), 1);

        let path = CollectionPath::parse("rooms/1/notifications").unwrap();
        assert_eq!(path.collection_id(), "notifications");
        assert_eq!(path.depth(), 2);
        assert_eq!(path.segments(), &["rooms", "1", "notifications"]);
    }

    #[test]
    fn test_parse_rejects_invalid_paths() {
        assert!(CollectionPath::parse("").is_err());
        assert!(CollectionPath::parse("rooms/1").is_err());
        assert!(CollectionPath::parse("rooms//notifications").is_err());
        assert!(CollectionPath::parse("/rooms").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let raw = "workspaces/workspace_1/notifications";
        let path = CollectionPath::parse(raw).unwrap();
        assert_eq!(path.to_string(), raw);
        assert_eq!(raw.parse::<CollectionPath>().unwrap(), path);
    }
}

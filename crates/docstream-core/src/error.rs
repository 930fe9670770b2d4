//! Error types for docstream
//!
//! Uses `thiserror` for ergonomic error handling with full context preservation.

use std::fmt;
use thiserror::Error;

/// Result type alias for docstream operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Configuration failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// A required configuration key is absent
    MissingField,
    /// The configuration file exists but could not be read or parsed
    FileUnreadable,
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField => write!(f, "missing field"),
            Self::FileUnreadable => write!(f, "file unreadable"),
        }
    }
}

/// Connection failure kinds, fatal at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    AuthFailure,
    NetworkUnavailable,
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthFailure => write!(f, "auth failure"),
            Self::NetworkUnavailable => write!(f, "network unavailable"),
        }
    }
}

/// Write failure kinds reported for a rejected batch commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteErrorKind {
    Transport,
    QuotaExceeded,
    PermissionDenied,
}

impl fmt::Display for WriteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::QuotaExceeded => write!(f, "quota exceeded"),
            Self::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

/// Subscription failure kinds
///
/// `TransportLost` is the only transient kind; a listener reacts to it by
/// re-subscribing. The other kinds are permanent and end the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionErrorKind {
    TransportLost,
    BadQuery,
    AuthRevoked,
}

impl SubscriptionErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::TransportLost)
    }
}

impl fmt::Display for SubscriptionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportLost => write!(f, "transport lost"),
            Self::BadQuery => write!(f, "bad query"),
            Self::AuthRevoked => write!(f, "auth revoked"),
        }
    }
}

/// Primary error type for all docstream operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Configuration errors, fatal at startup and never retried
    #[error("configuration error ({kind}): {message}")]
    Config { kind: ConfigErrorKind, message: String },

    /// Connection errors, fatal at startup; listeners never start
    #[error("connection error ({kind}): {message}")]
    Connection {
        kind: ConnectionErrorKind,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Filter validation errors, raised locally and never sent to the store
    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    /// Collection path validation errors, raised at parse time
    #[error("invalid collection path `{path}`: {message}")]
    InvalidPath { path: String, message: String },

    /// Batch commit errors; the whole batch failed and is safe to retry
    #[error("write error ({kind}): {message}")]
    Write {
        kind: WriteErrorKind,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Live subscription errors; transient kinds trigger a reconnect
    #[error("subscription error ({kind}): {message}")]
    Subscription {
        kind: SubscriptionErrorKind,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization errors
    #[error("serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Create a missing-field configuration error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::Config {
            kind: ConfigErrorKind::MissingField,
            message: field.into(),
        }
    }

    /// Create a file-unreadable configuration error
    pub fn file_unreadable(message: impl Into<String>) -> Self {
        Self::Config {
            kind: ConfigErrorKind::FileUnreadable,
            message: message.into(),
        }
    }

    /// Create an auth-failure connection error
    pub fn auth_failure(message: impl Into<String>) -> Self {
        Self::Connection {
            kind: ConnectionErrorKind::AuthFailure,
            message: message.into(),
            source: None,
        }
    }

    /// Create a network-unavailable connection error
    pub fn network_unavailable(message: impl Into<String>) -> Self {
        Self::Connection {
            kind: ConnectionErrorKind::NetworkUnavailable,
            message: message.into(),
            source: None,
        }
    }

    /// Create a filter validation error
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    /// Create a path validation error
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a write error
    pub fn write(kind: WriteErrorKind, message: impl Into<String>) -> Self {
        Self::Write {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a write error with source
    pub fn write_with_source(
        kind: WriteErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Write {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a subscription error
    pub fn subscription(kind: SubscriptionErrorKind, message: impl Into<String>) -> Self {
        Self::Subscription {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a transient transport-lost subscription error
    pub fn subscription_lost(message: impl Into<String>) -> Self {
        Self::subscription(SubscriptionErrorKind::TransportLost, message)
    }

    /// Create a permanent bad-query subscription error
    pub fn bad_query(message: impl Into<String>) -> Self {
        Self::subscription(SubscriptionErrorKind::BadQuery, message)
    }

    /// Create a serialization error with source
    pub fn serialization(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Check if the error may resolve by re-subscribing
    ///
    /// Drives the listener reconnect loop; everything non-transient either
    /// ends the listener or propagates to the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Subscription { kind, .. } if kind.is_transient()
        )
    }

    /// Configuration kind, if this is a configuration error
    pub fn config_kind(&self) -> Option<ConfigErrorKind> {
        match self {
            Self::Config { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Write kind, if this is a write error
    pub fn write_kind(&self) -> Option<WriteErrorKind> {
        match self {
            Self::Write { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Subscription kind, if this is a subscription error
    pub fn subscription_kind(&self) -> Option<SubscriptionErrorKind> {
        match self {
            Self::Subscription { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::subscription_lost("dropped").is_transient());
        assert!(!StoreError::bad_query("no such field").is_transient());
        assert!(!StoreError::write(WriteErrorKind::Transport, "reset").is_transient());
        assert!(!StoreError::missing_field("ProjectID").is_transient());
    }

    #[test]
    fn test_kind_accessors() {
        let err = StoreError::missing_field("ProjectID");
        assert_eq!(err.config_kind(), Some(ConfigErrorKind::MissingField));
        assert_eq!(err.write_kind(), None);

        let err = StoreError::write(WriteErrorKind::QuotaExceeded, "over quota");
        assert_eq!(err.write_kind(), Some(WriteErrorKind::QuotaExceeded));
    }
}

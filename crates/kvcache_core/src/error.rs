//! Error types for KV cache operations.

use std::io;
use thiserror::Error;

/// Result type for KV cache operations.
pub type KvResult<T> = Result<T, KvCacheError>;

/// Errors that can occur in the KV cache layer.
///
/// Every failure reported by this crate is one of these variants, so callers
/// can match on a single type regardless of which backend produced it.
#[derive(Debug, Error)]
pub enum KvCacheError {
    /// The requested backend is unknown or its native engine could not be loaded.
    #[error("backend not found: {backend}: {reason}")]
    BackendNotFound {
        /// Name of the requested backend.
        backend: String,
        /// Why it could not be constructed.
        reason: String,
    },

    /// Auto-detection found no loadable backend.
    #[error("no KV cache backends are available")]
    NoBackendsAvailable,

    /// `setup` failed or returned a non-zero status.
    #[error("store initialization failed: {message}")]
    StoreInitialization {
        /// Description of the failure.
        message: String,
    },

    /// A data operation failed against an initialized store.
    #[error("storage error: failed to {operation}{}: {message}", key_suffix(.key))]
    Storage {
        /// Operation that failed (`put`, `get`, ...).
        operation: &'static str,
        /// Key involved, if any.
        key: Option<String>,
        /// Underlying failure text.
        message: String,
    },

    /// Key not found, for call sites that signal absence by error.
    #[error("key not found: '{key}'")]
    KeyNotFound {
        /// The missing key.
        key: String,
    },

    /// Operation not permitted in the current sequence.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Buffer protocol violation.
    #[error("buffer error: {message}")]
    Buffer {
        /// Description of the failure.
        message: String,
    },

    /// A data operation was attempted before `setup` or after `close`.
    #[error("store not initialized: call setup() first")]
    NotInitialized,

    /// Configuration or argument validation failed.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the invalid value.
        message: String,
    },

    /// I/O error while reading or writing configuration files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML could not be parsed or emitted.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(" key '{key}'"),
        None => String::new(),
    }
}

impl KvCacheError {
    /// Creates a backend-not-found error.
    pub fn backend_not_found(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BackendNotFound {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Creates a store initialization error.
    pub fn store_initialization(message: impl Into<String>) -> Self {
        Self::StoreInitialization {
            message: message.into(),
        }
    }

    /// Creates a storage error for an operation on a key.
    pub fn storage(operation: &'static str, key: &str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            key: Some(key.to_string()),
            message: message.into(),
        }
    }

    /// Creates a storage error for an operation without a key (e.g. `close`).
    pub fn storage_unkeyed(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            key: None,
            message: message.into(),
        }
    }

    /// Creates a key-not-found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a buffer error.
    pub fn buffer(message: impl Into<String>) -> Self {
        Self::Buffer {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by invalid configuration or arguments.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns true for lifecycle sequencing errors.
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::InvalidOperation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_mentions_operation_and_key() {
        let err = KvCacheError::storage("put", "k1", "segment full");
        assert_eq!(
            err.to_string(),
            "storage error: failed to put key 'k1': segment full"
        );
    }

    #[test]
    fn unkeyed_storage_error() {
        let err = KvCacheError::storage_unkeyed("close", "engine gone");
        assert_eq!(err.to_string(), "storage error: failed to close: engine gone");
    }

    #[test]
    fn not_initialized_display() {
        assert_eq!(
            KvCacheError::NotInitialized.to_string(),
            "store not initialized: call setup() first"
        );
        assert!(KvCacheError::NotInitialized.is_state_error());
    }

    #[test]
    fn classification() {
        assert!(KvCacheError::validation("bad").is_validation());
        assert!(!KvCacheError::NoBackendsAvailable.is_validation());
        assert!(KvCacheError::invalid_operation("twice").is_state_error());
    }

    #[test]
    fn backend_not_found_keeps_reason() {
        let err = KvCacheError::backend_not_found("mooncake", "library not linked");
        assert!(err.to_string().contains("mooncake"));
        assert!(err.to_string().contains("library not linked"));
    }
}

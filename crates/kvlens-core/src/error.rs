//! Error types shared by every store implementation

use std::fmt::Debug;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading from or writing to a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An add targeted a key that already holds a value
    #[error("Key already exists: {key}")]
    KeyAlreadyExists {
        /// The conflicting key, rendered for display
        key: String,
    },

    /// An update, remove, or strict lookup targeted an absent key
    #[error("Key not found: {key}")]
    KeyNotFound {
        /// The missing key, rendered for display
        key: String,
    },

    /// A backend-specific failure surfaced by the underlying store
    #[error("Store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Builds a [`StoreError::KeyAlreadyExists`] for `key`.
    #[must_use]
    pub fn key_already_exists<K: Debug>(key: &K) -> Self {
        Self::KeyAlreadyExists {
            key: format!("{key:?}"),
        }
    }

    /// Builds a [`StoreError::KeyNotFound`] for `key`.
    #[must_use]
    pub fn key_not_found<K: Debug>(key: &K) -> Self {
        Self::KeyNotFound {
            key: format!("{key:?}"),
        }
    }

    /// Returns `true` when the error is a key conflict rather than a backend
    /// failure.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::KeyAlreadyExists { .. } | Self::KeyNotFound { .. }
        )
    }
}

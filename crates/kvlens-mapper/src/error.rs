//! Error types for the mapping layer

use std::any::type_name;

/// Result type for mapping-session operations
pub type Result<T> = std::result::Result<T, MapError>;

/// Errors that can occur while wiring conversions through a session
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// A conversion pair was requested before being initialized
    #[error("No conversion initialized for {source_type} -> {target_type}")]
    PairNotInitialized {
        /// Type name of the conversion's source side
        source_type: &'static str,
        /// Type name of the conversion's target side
        target_type: &'static str,
    },
}

impl MapError {
    /// Builds a [`MapError::PairNotInitialized`] for the `S -> T` pair.
    #[must_use]
    pub fn pair_not_initialized<S, T>() -> Self {
        Self::PairNotInitialized {
            source_type: type_name::<S>(),
            target_type: type_name::<T>(),
        }
    }
}

//! Mapped views over key-value stores with reference-preserving conversion.
//!
//! A [`MapSession`] owns one identity cache per initialized `(source,
//! target)` type pair. Conversions built over a shared session reuse
//! previously-built instances: converting the same source instance twice
//! yields the same target instance, across every adapter wired to that
//! session. [`MappedStore`] exposes a store under mapped key and value
//! types through any [`Bimapper`], and
//! [`MapStoreExt::with_cached_mapping`] stacks a write buffer on top so
//! view-side writes convert only at flush time.

/// Mapped view over a differently-typed store.
pub mod adapter;
/// Bidirectional converter seam and its implementations.
pub mod bimapper;
/// Error types for the mapping layer.
pub mod error;
/// Builder-style helpers for assembling mapped stacks.
pub mod ext;
/// Per-pair conversion cache keyed by source instance identity.
pub mod pair_cache;
/// Shared registry of conversion pairs.
pub mod session;

pub use crate::adapter::MappedStore;
pub use crate::bimapper::{Bimapper, CloneBimapper, FnBimapper, PreservingBimapper};
pub use crate::error::{MapError, Result};
pub use crate::ext::MapStoreExt;
pub use crate::pair_cache::PairCache;
pub use crate::session::MapSession;

//! Store contract and type-uniform decorators for composable key-value
//! stores.
//!
//! The [`KvReadStore`] / [`KvStore`] trait pair defines the contract; every
//! mutation funnels through one batched [`KvStore::write`] entry point so a
//! decorator that intercepts it intercepts everything. [`MemoryStore`] is
//! the plain backing implementation, [`WriteCachedStore`] buffers writes
//! until [`KvStore::flush`] drains them in one batch, and
//! [`ReadCachedStore`] keeps recently read values in an LRU cache.

/// Error types shared by every store implementation.
pub mod error;
/// Builder-style composition helpers.
pub mod ext;
/// In-memory store backed by a hash map.
pub mod memory;
/// Read-through LRU cache decorator.
pub mod read_cache;
/// Capability-split read and write traits.
pub mod store;
/// Shared boolean switches for coordinating composed layers.
pub mod toggle;
/// Batched write operations and their results.
pub mod write;
/// Write-back buffer decorator.
pub mod write_cache;

pub use crate::error::{Result, StoreError};
pub use crate::ext::KvStoreExt;
pub use crate::memory::MemoryStore;
pub use crate::read_cache::{ReadCacheConfig, ReadCachedStore};
pub use crate::store::{KvReadStore, KvStore};
pub use crate::toggle::Toggle;
pub use crate::write::{UpdateFn, ValueFn, WriteKind, WriteOp, WriteOutcome, WriteRecord};
pub use crate::write_cache::WriteCachedStore;

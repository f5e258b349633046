//! Builder-style composition helpers

use crate::error::Result;
use crate::read_cache::{ReadCacheConfig, ReadCachedStore};
use crate::store::{KvReadStore, KvStore};
use crate::write_cache::WriteCachedStore;

/// Chainable constructors for the store decorators.
///
/// Implemented for every store, so decorator stacks read top-down at the
/// call site: `MemoryStore::new().with_write_cache()`.
pub trait KvStoreExt: KvReadStore + Sized {
    /// Wraps `self` in a write-back buffer.
    #[must_use]
    fn with_write_cache(self) -> WriteCachedStore<Self>
    where
        Self: KvStore,
    {
        WriteCachedStore::new(self)
    }

    /// Wraps `self` in a read-through LRU cache.
    ///
    /// # Errors
    /// Returns an error when `config` is invalid or preloading fails.
    fn with_read_cache(self, config: ReadCacheConfig) -> Result<ReadCachedStore<Self>> {
        ReadCachedStore::new(self, config)
    }
}

impl<S: KvReadStore + Sized> KvStoreExt for S {}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn decorators_chain() {
        let stacked = MemoryStore::<u32, String>::new()
            .with_write_cache()
            .with_read_cache(ReadCacheConfig::default())
            .unwrap();

        stacked.add(1, "one".into()).unwrap();
        assert_eq!(stacked.get(&1).unwrap(), "one");

        // Still buffered below the read cache until flushed.
        assert!(stacked.source().is_buffering());
        stacked.flush().unwrap();
        assert!(!stacked.source().is_buffering());
        assert_eq!(stacked.source().source().get(&1).unwrap(), "one");
    }
}

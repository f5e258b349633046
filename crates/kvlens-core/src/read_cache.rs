//! Read-through LRU cache decorator

use std::num::NonZeroUsize;
use std::sync::Mutex;

use anyhow::anyhow;
use lru::LruCache;
use tracing::{debug, trace};

use crate::error::Result;
use crate::store::{KvReadStore, KvStore};
use crate::write::{WriteOp, WriteOutcome, WriteRecord};

const DEFAULT_CAPACITY: usize = 256;

/// Configuration for [`ReadCachedStore`].
#[derive(Debug, Clone, Copy)]
pub struct ReadCacheConfig {
    /// Maximum number of cached entries. Must be non-zero.
    pub capacity: usize,
    /// Fill the cache from the source's current entries at construction.
    pub preload: bool,
}

impl Default for ReadCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            preload: false,
        }
    }
}

/// Decorator that keeps recently read values in an LRU cache.
///
/// Lookups fill the cache; writes pass through to the source and reconcile
/// the cache from the returned outcomes. Values changed in the source behind
/// this decorator's back stay visible as stale cache hits until they are
/// evicted or [`invalidate`](Self::invalidate) drops them.
///
/// Cache bookkeeping is best-effort: a poisoned cache lock degrades reads to
/// source lookups instead of failing them.
pub struct ReadCachedStore<S: KvReadStore> {
    source: S,
    cache: Mutex<LruCache<S::Key, S::Value>>,
}

impl<S: KvReadStore> ReadCachedStore<S> {
    /// Wraps `source` with a cache sized by `config`, preloading it when
    /// requested.
    ///
    /// # Errors
    /// Returns an error when the configured capacity is zero, or when
    /// preloading fails to enumerate the source.
    pub fn new(source: S, config: ReadCacheConfig) -> Result<Self> {
        let capacity = NonZeroUsize::new(config.capacity)
            .ok_or_else(|| anyhow!("read cache capacity must be non-zero"))?;
        let store = Self {
            source,
            cache: Mutex::new(LruCache::new(capacity)),
        };
        if config.preload {
            store.preload()?;
        }
        Ok(store)
    }

    /// Borrows the wrapped source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Fills the cache from the source's current entries.
    ///
    /// With a capacity smaller than the source, only the most recently
    /// inserted entries stay cached.
    ///
    /// # Errors
    /// Returns a store-specific error when enumerating the source fails.
    pub fn preload(&self) -> Result<()> {
        let entries = self.source.entries()?;
        let count = entries.len();
        for (key, value) in entries {
            self.cache_value(key, value);
        }
        debug!(count, "preloaded read cache");
        Ok(())
    }

    /// Drops the cached values for `keys`, forcing the next reads through to
    /// the source.
    pub fn invalidate(&self, keys: &[S::Key]) {
        if let Ok(mut cache) = self.cache.lock() {
            for key in keys {
                cache.pop(key);
            }
        }
        debug!(count = keys.len(), "invalidated cached reads");
    }

    /// Drops every cached value.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    fn cached(&self, key: &S::Key) -> Option<S::Value> {
        self.cache
            .lock()
            .ok()
            .and_then(|mut cache| cache.get(key).cloned())
    }

    fn cache_value(&self, key: S::Key, value: S::Value) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, value);
        }
    }

    fn evict(&self, key: &S::Key) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(key);
        }
    }
}

impl<S: KvReadStore> KvReadStore for ReadCachedStore<S> {
    type Key = S::Key;
    type Value = S::Value;

    fn try_get_value(&self, key: &Self::Key) -> Result<Option<Self::Value>> {
        if let Some(value) = self.cached(key) {
            trace!(key = ?key, "read cache hit");
            return Ok(Some(value));
        }
        let value = self.source.try_get_value(key)?;
        if let Some(value) = &value {
            self.cache_value(key.clone(), value.clone());
        }
        Ok(value)
    }

    fn entries(&self) -> Result<Vec<(Self::Key, Self::Value)>> {
        // Enumeration stays authoritative and does not churn the hot set.
        self.source.entries()
    }

    fn len(&self) -> Result<usize> {
        self.source.len()
    }
}

impl<S: KvStore> KvStore for ReadCachedStore<S> {
    fn write(
        &self,
        ops: Vec<WriteOp<Self::Key, Self::Value>>,
    ) -> Result<Vec<WriteRecord<Self::Key, Self::Value>>> {
        let records = self.source.write(ops)?;
        for record in &records {
            match &record.outcome {
                WriteOutcome::Added { new } | WriteOutcome::Updated { new, .. } => {
                    self.cache_value(record.key.clone(), new.clone());
                }
                WriteOutcome::Removed { .. } => self.evict(&record.key),
                WriteOutcome::AddSkipped
                | WriteOutcome::UpdateSkipped
                | WriteOutcome::RemoveSkipped => {}
            }
        }
        Ok(records)
    }

    fn flush(&self) -> Result<()> {
        self.source.flush()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::memory::MemoryStore;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Delegating store that counts lookups hitting the source.
    struct CountingStore {
        inner: MemoryStore<String, i64>,
        lookups: AtomicUsize,
    }

    impl CountingStore {
        fn seeded() -> Arc<Self> {
            let inner = MemoryStore::new();
            inner.add("a".into(), 1).unwrap();
            inner.add("b".into(), 2).unwrap();
            Arc::new(Self {
                inner,
                lookups: AtomicUsize::new(0),
            })
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl KvReadStore for CountingStore {
        type Key = String;
        type Value = i64;

        fn try_get_value(&self, key: &String) -> Result<Option<i64>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.try_get_value(key)
        }

        fn entries(&self) -> Result<Vec<(String, i64)>> {
            self.inner.entries()
        }
    }

    impl KvStore for CountingStore {
        fn write(&self, ops: Vec<WriteOp<String, i64>>) -> Result<Vec<WriteRecord<String, i64>>> {
            self.inner.write(ops)
        }
    }

    #[test]
    fn repeated_reads_hit_the_cache() {
        let source = CountingStore::seeded();
        let cached = ReadCachedStore::new(Arc::clone(&source), ReadCacheConfig::default()).unwrap();

        assert_eq!(cached.get(&"a".into()).unwrap(), 1);
        assert_eq!(cached.get(&"a".into()).unwrap(), 1);
        assert_eq!(cached.get(&"a".into()).unwrap(), 1);
        assert_eq!(source.lookups(), 1);
    }

    #[test]
    fn writes_reconcile_the_cache() {
        let source = CountingStore::seeded();
        let cached = ReadCachedStore::new(Arc::clone(&source), ReadCacheConfig::default()).unwrap();

        cached.update("a".into(), 10).unwrap();
        assert_eq!(cached.get(&"a".into()).unwrap(), 10);
        assert_eq!(source.lookups(), 0);

        cached.remove("a".into()).unwrap();
        assert_eq!(cached.try_get_value(&"a".into()).unwrap(), None);
    }

    #[test]
    fn invalidate_forces_the_next_read_through() {
        let source = CountingStore::seeded();
        let cached = ReadCachedStore::new(Arc::clone(&source), ReadCacheConfig::default()).unwrap();

        assert_eq!(cached.get(&"a".into()).unwrap(), 1);
        // Mutate behind the decorator's back; the stale hit persists until
        // invalidated.
        source.inner.update("a".into(), 5).unwrap();
        assert_eq!(cached.get(&"a".into()).unwrap(), 1);

        cached.invalidate(&["a".to_string()]);
        assert_eq!(cached.get(&"a".into()).unwrap(), 5);
    }

    #[test]
    fn preload_warms_every_entry() {
        let source = CountingStore::seeded();
        let config = ReadCacheConfig {
            preload: true,
            ..ReadCacheConfig::default()
        };
        let cached = ReadCachedStore::new(Arc::clone(&source), config).unwrap();

        assert_eq!(cached.get(&"a".into()).unwrap(), 1);
        assert_eq!(cached.get(&"b".into()).unwrap(), 2);
        assert_eq!(source.lookups(), 0);
    }

    #[test]
    fn capacity_bounds_the_cached_set() {
        let source = CountingStore::seeded();
        let config = ReadCacheConfig {
            capacity: 1,
            preload: false,
        };
        let cached = ReadCachedStore::new(Arc::clone(&source), config).unwrap();

        cached.get(&"a".into()).unwrap();
        cached.get(&"b".into()).unwrap();
        // "a" was evicted by "b"; reading it again goes to the source.
        cached.get(&"a".into()).unwrap();
        assert_eq!(source.lookups(), 3);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let source = CountingStore::seeded();
        let config = ReadCacheConfig {
            capacity: 0,
            preload: false,
        };
        assert!(ReadCachedStore::new(source, config).is_err());
    }
}

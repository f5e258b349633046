//! Per-pair conversion cache keyed by source instance identity

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

/// Identity-preserving conversion cache for one `S -> T` direction.
///
/// Distinct source instances are told apart by the address behind their
/// [`Arc`] handle. The first conversion of an instance runs the registered
/// factory and stores the result; every later conversion of the same
/// instance returns a handle to that same target, so object identity
/// survives the mapping. Each cached entry retains a clone of its source
/// handle, which keeps the address alive and unambiguous for the lifetime
/// of the entry.
///
/// Handles are cheap to clone and share one underlying cache.
pub struct PairCache<S, T> {
    shared: Arc<PairShared<S, T>>,
}

struct PairShared<S, T> {
    factory: Box<dyn Fn(&S) -> T + Send + Sync>,
    entries: Mutex<HashMap<usize, CacheEntry<S, T>>>,
}

struct CacheEntry<S, T> {
    // Held only to pin the source address while the entry lives.
    #[allow(dead_code)]
    source: Arc<S>,
    target: Arc<T>,
}

impl<S, T> PairCache<S, T> {
    /// Creates an empty cache around `factory`.
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(PairShared {
                factory: Box::new(factory),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the target for `source`, converting it on first sight.
    ///
    /// The factory runs under the cache's lock, so concurrent calls for the
    /// same instance agree on a single winner and the factory runs at most
    /// once per instance.
    #[must_use]
    pub fn get_or_convert(&self, source: &Arc<S>) -> Arc<T> {
        let address = Arc::as_ptr(source).addr();
        let mut entries = self
            .shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(&address) {
            return Arc::clone(&entry.target);
        }
        let target = Arc::new((self.shared.factory)(source.as_ref()));
        entries.insert(
            address,
            CacheEntry {
                source: Arc::clone(source),
                target: Arc::clone(&target),
            },
        );
        trace!(
            source = type_name::<S>(),
            target = type_name::<T>(),
            "converted new instance"
        );
        target
    }

    /// Whether `source` has already been converted.
    #[must_use]
    pub fn contains(&self, source: &Arc<S>) -> bool {
        self.shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&Arc::as_ptr(source).addr())
    }

    /// Number of cached conversions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no conversions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached conversion. The factory stays in place, so later
    /// conversions rebuild fresh targets.
    pub fn clear(&self) {
        self.shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<S, T> Clone for PairCache<S, T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, T> fmt::Debug for PairCache<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairCache")
            .field("source", &type_name::<S>())
            .field("target", &type_name::<T>())
            .finish_non_exhaustive()
    }
}

//! Shared registry of conversion pairs and their identity caches

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::bimapper::PreservingBimapper;
use crate::error::{MapError, Result};
use crate::pair_cache::PairCache;

type PairKey = (TypeId, TypeId);
type ResetFn = Box<dyn Fn() + Send + Sync>;

/// Explicit, caller-owned context that backs reference-preserving mapping.
///
/// A session holds one [`PairCache`] per initialized `(source, target)` type
/// pair. Adapters that share a session share its caches, so the same source
/// instance converts to the same target instance no matter which adapter
/// asked. The two directions of a conversion are independent pairs; register
/// both to build a [`PreservingBimapper`].
///
/// All registry operations serialize on one internal lock. Conversions never
/// take that lock; they go through cheaply cloned [`PairCache`] handles.
#[derive(Default)]
pub struct MapSession {
    inner: Mutex<SessionInner>,
}

#[derive(Default)]
struct SessionInner {
    caches: HashMap<PairKey, Box<dyn Any + Send + Sync>>,
    resets: Vec<ResetFn>,
}

impl MapSession {
    /// Creates a session with no initialized pairs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for the `S -> T` pair.
    ///
    /// Idempotent: returns `true` only when this call performed the
    /// registration; a pair that is already initialized is left untouched
    /// and `false` is returned. Concurrent calls race safely to one winner.
    #[must_use = "returns whether this call registered the pair"]
    pub fn initialize<S, T, F>(&self, factory: F) -> bool
    where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if lookup::<S, T>(&inner).is_some() {
            return false;
        }
        register(&mut inner, factory);
        true
    }

    /// Registers the `S -> T` pair using `T::default()` for every source
    /// instance. Constructibility is a compile-time bound here, not a
    /// runtime check.
    #[must_use = "returns whether this call registered the pair"]
    pub fn initialize_default<S, T>(&self) -> bool
    where
        S: Send + Sync + 'static,
        T: Default + Send + Sync + 'static,
    {
        self.initialize(|_: &S| T::default())
    }

    /// Returns the identity cache for the `S -> T` pair.
    ///
    /// # Errors
    /// Returns [`MapError::PairNotInitialized`] when the pair has not been
    /// initialized on this session.
    pub fn cache<S, T>(&self) -> Result<PairCache<S, T>>
    where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        lookup::<S, T>(&inner).ok_or_else(MapError::pair_not_initialized::<S, T>)
    }

    /// Returns the identity cache for the `S -> T` pair, initializing it
    /// with the `T::default()` factory when missing.
    #[must_use]
    pub fn cache_or_default<S, T>(&self) -> PairCache<S, T>
    where
        S: Send + Sync + 'static,
        T: Default + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cache) = lookup::<S, T>(&inner) {
            return cache;
        }
        register(&mut inner, |_: &S| T::default())
    }

    /// Whether the `S -> T` pair has been initialized.
    #[must_use]
    pub fn is_initialized<S, T>(&self) -> bool
    where
        S: 'static,
        T: 'static,
    {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .caches
            .contains_key(&(TypeId::of::<S>(), TypeId::of::<T>()))
    }

    /// Number of initialized pairs.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .caches
            .len()
    }

    /// Builds a bidirectional mapper over the `A <-> B` caches.
    ///
    /// # Errors
    /// Returns [`MapError::PairNotInitialized`] naming the missing direction
    /// when either `A -> B` or `B -> A` has not been initialized.
    pub fn bimapper<A, B>(&self) -> Result<PreservingBimapper<A, B>>
    where
        A: Send + Sync + 'static,
        B: Send + Sync + 'static,
    {
        let forward = self.cache::<A, B>()?;
        let reverse = self.cache::<B, A>()?;
        Ok(PreservingBimapper::new(forward, reverse))
    }

    /// Empties every pair cache. Registered factories stay in place, so the
    /// next conversions rebuild fresh targets.
    pub fn clear(&self) {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for reset in &inner.resets {
            reset();
        }
        debug!(pairs = inner.resets.len(), "cleared conversion caches");
    }
}

fn lookup<S, T>(inner: &SessionInner) -> Option<PairCache<S, T>>
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    // The pair key pins the boxed concrete type, so the downcast cannot
    // miss for a present entry; a miss simply reads as not-initialized.
    inner
        .caches
        .get(&(TypeId::of::<S>(), TypeId::of::<T>()))
        .and_then(|boxed| boxed.downcast_ref::<PairCache<S, T>>())
        .cloned()
}

fn register<S, T, F>(inner: &mut SessionInner, factory: F) -> PairCache<S, T>
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
    F: Fn(&S) -> T + Send + Sync + 'static,
{
    let cache = PairCache::new(factory);
    let reset = cache.clone();
    inner.resets.push(Box::new(move || reset.clear()));
    inner
        .caches
        .insert((TypeId::of::<S>(), TypeId::of::<T>()), Box::new(cache.clone()));
    debug!(
        source = type_name::<S>(),
        target = type_name::<T>(),
        "initialized conversion pair"
    );
    cache
}

impl fmt::Debug for MapSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapSession")
            .field("pairs", &self.pair_count())
            .finish_non_exhaustive()
    }
}

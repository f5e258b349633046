//! Bidirectional converters between a store's types and a mapped view

use std::marker::PhantomData;
use std::sync::Arc;

use crate::pair_cache::PairCache;

/// A conversion between an inner (store-side) type and an outer (view-side)
/// type, usable in both directions.
///
/// The mapped adapter treats implementations as opaque: it never inspects
/// how values are converted, it only calls through this interface. How a
/// mapper behaves on repeated conversions of the same value is an
/// implementation property; [`PreservingBimapper`] is the variant that
/// keeps instance identity stable.
pub trait Bimapper {
    /// Store-side type.
    type Inner;
    /// View-side type.
    type Outer;

    /// Converts a store-side value to its view-side representation.
    fn outward(&self, inner: &Self::Inner) -> Self::Outer;

    /// Converts a view-side value to its store-side representation.
    fn inward(&self, outer: &Self::Outer) -> Self::Inner;
}

/// Closure-backed [`Bimapper`].
pub struct FnBimapper<A, B, F, G> {
    outward: F,
    inward: G,
    marker: PhantomData<fn(&A) -> B>,
}

impl<A, B, F, G> FnBimapper<A, B, F, G>
where
    F: Fn(&A) -> B,
    G: Fn(&B) -> A,
{
    /// Builds a mapper from an outward and an inward conversion.
    #[must_use]
    pub const fn new(outward: F, inward: G) -> Self {
        Self {
            outward,
            inward,
            marker: PhantomData,
        }
    }
}

impl<A, B, F, G> Bimapper for FnBimapper<A, B, F, G>
where
    F: Fn(&A) -> B,
    G: Fn(&B) -> A,
{
    type Inner = A;
    type Outer = B;

    fn outward(&self, inner: &A) -> B {
        (self.outward)(inner)
    }

    fn inward(&self, outer: &B) -> A {
        (self.inward)(outer)
    }
}

/// Identity [`Bimapper`] for the side of a view that keeps the store's type.
pub struct CloneBimapper<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> CloneBimapper<T> {
    /// Builds the identity mapper.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<T> Default for CloneBimapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CloneBimapper<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Copy for CloneBimapper<T> {}

impl<T: Clone> Bimapper for CloneBimapper<T> {
    type Inner = T;
    type Outer = T;

    fn outward(&self, inner: &T) -> T {
        inner.clone()
    }

    fn inward(&self, outer: &T) -> T {
        outer.clone()
    }
}

/// Identity-preserving [`Bimapper`] over shared handles.
///
/// Conversions go through the two [`PairCache`]s of a session, one per
/// direction, so converting the same instance twice yields the same mapped
/// instance, and mapping a converted instance back yields the original.
/// Build one with [`MapSession::bimapper`](crate::session::MapSession::bimapper).
pub struct PreservingBimapper<A, B> {
    forward: PairCache<A, B>,
    reverse: PairCache<B, A>,
}

impl<A, B> PreservingBimapper<A, B> {
    /// Pairs a forward and a reverse cache into one bidirectional mapper.
    #[must_use]
    pub const fn new(forward: PairCache<A, B>, reverse: PairCache<B, A>) -> Self {
        Self { forward, reverse }
    }

    /// The `A -> B` cache.
    #[must_use]
    pub const fn forward(&self) -> &PairCache<A, B> {
        &self.forward
    }

    /// The `B -> A` cache.
    #[must_use]
    pub const fn reverse(&self) -> &PairCache<B, A> {
        &self.reverse
    }
}

impl<A, B> Clone for PreservingBimapper<A, B> {
    fn clone(&self) -> Self {
        Self {
            forward: self.forward.clone(),
            reverse: self.reverse.clone(),
        }
    }
}

impl<A, B> Bimapper for PreservingBimapper<A, B> {
    type Inner = Arc<A>;
    type Outer = Arc<B>;

    fn outward(&self, inner: &Arc<A>) -> Arc<B> {
        self.forward.get_or_convert(inner)
    }

    fn inward(&self, outer: &Arc<B>) -> Arc<A> {
        self.reverse.get_or_convert(outer)
    }
}

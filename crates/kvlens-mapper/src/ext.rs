//! Builder-style helpers for assembling mapped store stacks

use kvlens_core::store::{KvReadStore, KvStore};
use kvlens_core::write_cache::WriteCachedStore;

use crate::adapter::MappedStore;
use crate::bimapper::{Bimapper, CloneBimapper};

/// Chainable constructors for mapped views.
pub trait MapStoreExt: KvReadStore + Sized {
    /// Maps both keys and values of `self`.
    #[must_use]
    fn with_mapping<KM, VM>(self, keys: KM, values: VM) -> MappedStore<Self, KM, VM>
    where
        KM: Bimapper<Inner = Self::Key>,
        VM: Bimapper<Inner = Self::Value>,
    {
        MappedStore::new(self, keys, values)
    }

    /// Maps only the values of `self`, keeping its key type.
    #[must_use]
    fn with_value_mapping<VM>(self, values: VM) -> MappedStore<Self, CloneBimapper<Self::Key>, VM>
    where
        VM: Bimapper<Inner = Self::Value>,
    {
        MappedStore::new(self, CloneBimapper::new(), values)
    }

    /// Maps the values of `self` and buffers writes on top, so view-side
    /// writes convert to store types only when the stack is flushed.
    #[must_use]
    fn with_cached_mapping<VM>(
        self,
        values: VM,
    ) -> WriteCachedStore<MappedStore<Self, CloneBimapper<Self::Key>, VM>>
    where
        Self: KvStore,
        VM: Bimapper<Inner = Self::Value> + Send + Sync + 'static,
        VM::Outer: Clone + Send + Sync + 'static,
    {
        WriteCachedStore::new(self.with_value_mapping(values))
    }
}

impl<S: KvReadStore + Sized> MapStoreExt for S {}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::bimapper::FnBimapper;
    use kvlens_core::memory::MemoryStore;

    #[test]
    fn value_mapping_keeps_the_key_type() {
        let source: MemoryStore<String, u32> = MemoryStore::new();
        source.add("a".into(), 7).unwrap();

        let view = source.with_value_mapping(FnBimapper::new(
            |stored: &u32| i64::from(*stored),
            |viewed: &i64| u32::try_from(*viewed).unwrap_or_default(),
        ));
        assert_eq!(view.get(&"a".to_string()).unwrap(), 7_i64);
    }

    #[test]
    fn cached_mapping_buffers_view_side_writes() {
        let source: MemoryStore<String, u32> = MemoryStore::new();
        source.add("a".into(), 7).unwrap();

        let stack = source.with_cached_mapping(FnBimapper::new(
            |stored: &u32| i64::from(*stored),
            |viewed: &i64| u32::try_from(*viewed).unwrap_or_default(),
        ));

        stack.update("a".to_string(), 70).unwrap();
        assert_eq!(stack.get(&"a".to_string()).unwrap(), 70);
        assert_eq!(
            stack.source().source().get(&"a".to_string()).unwrap(),
            7_u32
        );

        stack.flush().unwrap();
        assert_eq!(
            stack.source().source().get(&"a".to_string()).unwrap(),
            70_u32
        );
    }
}

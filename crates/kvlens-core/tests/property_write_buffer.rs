//! Model-based tests for the write-back buffer
//!
//! Random operation sequences run against a buffered in-memory store and a
//! plain map side by side. Every outcome and every visible state must agree
//! no matter where flushes land in the sequence.

#![cfg(feature = "property-tests")]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;

use kvlens_core::error::StoreError;
use kvlens_core::memory::MemoryStore;
use kvlens_core::store::{KvReadStore, KvStore};
use kvlens_core::write_cache::WriteCachedStore;
use proptest::prelude::*;

#[derive(Clone, Copy, Debug)]
enum StoreOp {
    Add(u8, u32),
    TryAdd(u8, u32),
    Update(u8, u32),
    TryUpdate(u8, u32),
    AddOrUpdate(u8, u32),
    Remove(u8),
    TryRemove(u8),
    Read(u8),
    Flush,
}

fn op_strategy() -> impl Strategy<Value = StoreOp> {
    let key = 0u8..4;
    let value = 0u32..100;
    prop_oneof![
        (key.clone(), value.clone()).prop_map(|(k, v)| StoreOp::Add(k, v)),
        (key.clone(), value.clone()).prop_map(|(k, v)| StoreOp::TryAdd(k, v)),
        (key.clone(), value.clone()).prop_map(|(k, v)| StoreOp::Update(k, v)),
        (key.clone(), value.clone()).prop_map(|(k, v)| StoreOp::TryUpdate(k, v)),
        (key.clone(), value).prop_map(|(k, v)| StoreOp::AddOrUpdate(k, v)),
        key.clone().prop_map(StoreOp::Remove),
        key.clone().prop_map(StoreOp::TryRemove),
        key.prop_map(StoreOp::Read),
        Just(StoreOp::Flush),
    ]
}

fn apply<S: KvStore<Key = u8, Value = u32>>(store: &S, op: StoreOp) {
    match op {
        StoreOp::Add(k, v) => {
            let _ = store.add(k, v);
        }
        StoreOp::TryAdd(k, v) => {
            let _ = store.try_add(k, v);
        }
        StoreOp::Update(k, v) => {
            let _ = store.update(k, v);
        }
        StoreOp::TryUpdate(k, v) => {
            let _ = store.try_update(k, v);
        }
        StoreOp::AddOrUpdate(k, v) => {
            let _ = store.add_or_update(k, v);
        }
        StoreOp::Remove(k) => {
            let _ = store.remove(k);
        }
        StoreOp::TryRemove(k) => {
            let _ = store.try_remove(k);
        }
        StoreOp::Read(k) => {
            let _ = store.try_get_value(&k);
        }
        StoreOp::Flush => {
            let _ = store.flush();
        }
    }
}

proptest! {
    /// The composed buffer-over-source view behaves exactly like a plain
    /// map, no matter where flushes land in the operation sequence.
    #[test]
    fn buffered_store_matches_naive_map(ops in prop::collection::vec(op_strategy(), 1..48)) {
        let store = WriteCachedStore::new(MemoryStore::<u8, u32>::new());
        let mut model: HashMap<u8, u32> = HashMap::new();

        for op in ops {
            match op {
                StoreOp::Add(k, v) => {
                    let result = store.add(k, v);
                    if model.contains_key(&k) {
                        let err = result.unwrap_err();
                        prop_assert!(
                            matches!(err, StoreError::KeyAlreadyExists { .. }),
                            "got {err:?}"
                        );
                    } else {
                        prop_assert!(result.is_ok());
                        model.insert(k, v);
                    }
                }
                StoreOp::TryAdd(k, v) => {
                    let added = store.try_add(k, v).unwrap();
                    prop_assert_eq!(added, !model.contains_key(&k));
                    model.entry(k).or_insert(v);
                }
                StoreOp::Update(k, v) => {
                    let result = store.update(k, v);
                    if model.contains_key(&k) {
                        prop_assert_eq!(Some(result.unwrap()), model.insert(k, v));
                    } else {
                        let err = result.unwrap_err();
                        prop_assert!(
                            matches!(err, StoreError::KeyNotFound { .. }),
                            "got {err:?}"
                        );
                    }
                }
                StoreOp::TryUpdate(k, v) => {
                    let previous = store.try_update(k, v).unwrap();
                    if model.contains_key(&k) {
                        prop_assert_eq!(previous, model.insert(k, v));
                    } else {
                        prop_assert_eq!(previous, None);
                    }
                }
                StoreOp::AddOrUpdate(k, v) => {
                    let previous = store.add_or_update(k, v).unwrap();
                    prop_assert_eq!(previous, model.insert(k, v));
                }
                StoreOp::Remove(k) => {
                    let result = store.remove(k);
                    if let Some(old) = model.remove(&k) {
                        prop_assert_eq!(result.unwrap(), old);
                    } else {
                        let err = result.unwrap_err();
                        prop_assert!(
                            matches!(err, StoreError::KeyNotFound { .. }),
                            "got {err:?}"
                        );
                    }
                }
                StoreOp::TryRemove(k) => {
                    prop_assert_eq!(store.try_remove(k).unwrap(), model.remove(&k));
                }
                StoreOp::Read(k) => {
                    prop_assert_eq!(store.try_get_value(&k).unwrap(), model.get(&k).copied());
                }
                StoreOp::Flush => {
                    store.flush().unwrap();
                    prop_assert!(store.writes().is_empty());
                }
            }
        }

        let viewed: HashMap<u8, u32> = store.entries().unwrap().into_iter().collect();
        prop_assert_eq!(&viewed, &model);

        // Draining the buffer lands the same state in the backing store.
        store.flush().unwrap();
        let backed: HashMap<u8, u32> = store.source().entries().unwrap().into_iter().collect();
        prop_assert_eq!(backed, model);
    }

    /// A flush moves state between layers without changing what readers see.
    #[test]
    fn flush_preserves_the_composed_view(ops in prop::collection::vec(op_strategy(), 1..32)) {
        let store = WriteCachedStore::new(MemoryStore::<u8, u32>::new());
        for op in ops {
            apply(&store, op);
        }

        let before: HashMap<u8, u32> = store.entries().unwrap().into_iter().collect();
        store.flush().unwrap();
        let after: HashMap<u8, u32> = store.entries().unwrap().into_iter().collect();
        prop_assert_eq!(before, after);
    }
}

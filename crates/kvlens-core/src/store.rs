//! Store contract: capability-split read and write traits

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::write::{WriteKind, WriteOp, WriteOutcome, WriteRecord};

/// Read half of the store contract.
///
/// Implementations use interior mutability, so all methods take `&self` and
/// a store can sit behind shared handles. Enumeration methods return owned
/// snapshots taken under the store's internal locking.
pub trait KvReadStore {
    /// Key type exposed by this store.
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    /// Value type exposed by this store.
    type Value: Clone + Send + Sync + 'static;

    /// Look up the value for `key`, if any.
    ///
    /// # Errors
    /// Returns a store-specific error when the lookup fails.
    fn try_get_value(&self, key: &Self::Key) -> Result<Option<Self::Value>>;

    /// Snapshot every key/value pair.
    ///
    /// # Errors
    /// Returns a store-specific error when enumeration fails.
    fn entries(&self) -> Result<Vec<(Self::Key, Self::Value)>>;

    /// Look up the value for `key`, failing when it is absent.
    ///
    /// # Errors
    /// Returns [`StoreError::KeyNotFound`] when the key is absent, or a
    /// store-specific error when the lookup fails.
    fn get(&self, key: &Self::Key) -> Result<Self::Value> {
        self.try_get_value(key)?
            .ok_or_else(|| StoreError::key_not_found(key))
    }

    /// Whether `key` currently holds a value.
    ///
    /// # Errors
    /// Returns a store-specific error when the lookup fails.
    fn contains_key(&self, key: &Self::Key) -> Result<bool> {
        Ok(self.try_get_value(key)?.is_some())
    }

    /// Number of stored entries.
    ///
    /// The default implementation counts [`entries`](Self::entries); stores
    /// that can answer cheaper should override it.
    ///
    /// # Errors
    /// Returns a store-specific error when enumeration fails.
    fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    /// Whether the store holds no entries.
    ///
    /// # Errors
    /// Returns a store-specific error when enumeration fails.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Snapshot every key.
    ///
    /// # Errors
    /// Returns a store-specific error when enumeration fails.
    fn keys(&self) -> Result<Vec<Self::Key>> {
        Ok(self.entries()?.into_iter().map(|(k, _)| k).collect())
    }

    /// Snapshot every value.
    ///
    /// # Errors
    /// Returns a store-specific error when enumeration fails.
    fn values(&self) -> Result<Vec<Self::Value>> {
        Ok(self.entries()?.into_iter().map(|(_, v)| v).collect())
    }
}

/// Write half of the store contract.
///
/// Batched [`write`](Self::write) is the single required mutation entry
/// point; every convenience method funnels through it, so a decorator that
/// intercepts `write` intercepts all mutations.
pub trait KvStore: KvReadStore {
    /// Apply `ops` as one batch, returning one record per operation, in
    /// operation order.
    ///
    /// Whether a partially failing batch leaves earlier operations applied
    /// is implementation-defined; the implementations in this workspace are
    /// all-or-nothing and document it.
    ///
    /// # Errors
    /// Returns a conflict error when a non-try operation fails its presence
    /// check, or a store-specific error when applying the batch fails.
    fn write(
        &self,
        ops: Vec<WriteOp<Self::Key, Self::Value>>,
    ) -> Result<Vec<WriteRecord<Self::Key, Self::Value>>>;

    /// Push buffered state down towards the ultimate backing store.
    ///
    /// The default implementation does nothing, as most stores hold no
    /// buffer. Buffering decorators override it and forward it to their
    /// source afterwards, so one call drains a whole composed stack.
    ///
    /// # Errors
    /// Returns a store-specific error when draining fails.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Insert `key`, failing if it already holds a value.
    ///
    /// # Errors
    /// Returns [`StoreError::KeyAlreadyExists`] on conflict, or a
    /// store-specific error when the write fails.
    fn add(&self, key: Self::Key, value: Self::Value) -> Result<()> {
        self.write(vec![WriteOp::add(key, value)])?;
        Ok(())
    }

    /// Insert `key` if absent, reporting whether the insert happened.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn try_add(&self, key: Self::Key, value: Self::Value) -> Result<bool> {
        let outcome = single_outcome(self.write(vec![WriteOp::try_add(key, value)])?)?;
        Ok(matches!(outcome, WriteOutcome::Added { .. }))
    }

    /// Replace the value for `key`, returning the previous value.
    ///
    /// # Errors
    /// Returns [`StoreError::KeyNotFound`] when the key is absent, or a
    /// store-specific error when the write fails.
    fn update(&self, key: Self::Key, value: Self::Value) -> Result<Self::Value> {
        match single_outcome(self.write(vec![WriteOp::update_to(key, value)])?)? {
            WriteOutcome::Updated { old, .. } => Ok(old),
            _ => Err(mismatched_outcome(WriteKind::Update)),
        }
    }

    /// Replace the value for `key` if present, returning the previous value.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn try_update(&self, key: Self::Key, value: Self::Value) -> Result<Option<Self::Value>> {
        match single_outcome(self.write(vec![WriteOp::try_update_to(key, value)])?)? {
            WriteOutcome::Updated { old, .. } => Ok(Some(old)),
            WriteOutcome::UpdateSkipped => Ok(None),
            _ => Err(mismatched_outcome(WriteKind::TryUpdate)),
        }
    }

    /// Insert or replace the value for `key`, returning the previous value
    /// when one was replaced.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn add_or_update(&self, key: Self::Key, value: Self::Value) -> Result<Option<Self::Value>> {
        match single_outcome(self.write(vec![WriteOp::add_or_update(key, value)])?)? {
            WriteOutcome::Added { .. } => Ok(None),
            WriteOutcome::Updated { old, .. } => Ok(Some(old)),
            _ => Err(mismatched_outcome(WriteKind::AddOrUpdate)),
        }
    }

    /// Remove `key`, returning the removed value.
    ///
    /// # Errors
    /// Returns [`StoreError::KeyNotFound`] when the key is absent, or a
    /// store-specific error when the write fails.
    fn remove(&self, key: Self::Key) -> Result<Self::Value> {
        match single_outcome(self.write(vec![WriteOp::remove(key)])?)? {
            WriteOutcome::Removed { old } => Ok(old),
            _ => Err(mismatched_outcome(WriteKind::Remove)),
        }
    }

    /// Remove `key` if present, returning the removed value.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn try_remove(&self, key: Self::Key) -> Result<Option<Self::Value>> {
        match single_outcome(self.write(vec![WriteOp::try_remove(key)])?)? {
            WriteOutcome::Removed { old } => Ok(Some(old)),
            WriteOutcome::RemoveSkipped => Ok(None),
            _ => Err(mismatched_outcome(WriteKind::TryRemove)),
        }
    }
}

fn single_outcome<K, V>(mut records: Vec<WriteRecord<K, V>>) -> Result<WriteOutcome<V>> {
    if records.len() == 1 {
        records
            .pop()
            .map(|record| record.outcome)
            .ok_or_else(batch_contract_error)
    } else {
        Err(batch_contract_error())
    }
}

fn batch_contract_error() -> StoreError {
    StoreError::Backend(anyhow::anyhow!(
        "store returned a mismatched record count for a single-operation batch"
    ))
}

fn mismatched_outcome(kind: WriteKind) -> StoreError {
    StoreError::Backend(anyhow::anyhow!(
        "store returned a mismatched outcome for a {kind:?} operation"
    ))
}

impl<S> KvReadStore for &S
where
    S: KvReadStore + ?Sized,
{
    type Key = S::Key;
    type Value = S::Value;

    fn try_get_value(&self, key: &Self::Key) -> Result<Option<Self::Value>> {
        (*self).try_get_value(key)
    }

    fn entries(&self) -> Result<Vec<(Self::Key, Self::Value)>> {
        (*self).entries()
    }

    fn len(&self) -> Result<usize> {
        (*self).len()
    }
}

impl<S> KvStore for &S
where
    S: KvStore + ?Sized,
{
    fn write(
        &self,
        ops: Vec<WriteOp<Self::Key, Self::Value>>,
    ) -> Result<Vec<WriteRecord<Self::Key, Self::Value>>> {
        (*self).write(ops)
    }

    fn flush(&self) -> Result<()> {
        (*self).flush()
    }
}

impl<S> KvReadStore for Arc<S>
where
    S: KvReadStore + ?Sized,
{
    type Key = S::Key;
    type Value = S::Value;

    fn try_get_value(&self, key: &Self::Key) -> Result<Option<Self::Value>> {
        (**self).try_get_value(key)
    }

    fn entries(&self) -> Result<Vec<(Self::Key, Self::Value)>> {
        (**self).entries()
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}

impl<S> KvStore for Arc<S>
where
    S: KvStore + ?Sized,
{
    fn write(
        &self,
        ops: Vec<WriteOp<Self::Key, Self::Value>>,
    ) -> Result<Vec<WriteRecord<Self::Key, Self::Value>>> {
        (**self).write(ops)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn convenience_methods_funnel_through_write() {
        let store: MemoryStore<String, i64> = MemoryStore::new();
        store.add("a".into(), 1).unwrap();
        assert!(store.try_add("b".into(), 2).unwrap());
        assert!(!store.try_add("b".into(), 3).unwrap());

        assert_eq!(store.update("a".into(), 10).unwrap(), 1);
        assert_eq!(store.try_update("a".into(), 11).unwrap(), Some(10));
        assert_eq!(store.try_update("missing".into(), 0).unwrap(), None);

        assert_eq!(store.add_or_update("c".into(), 3).unwrap(), None);
        assert_eq!(store.add_or_update("c".into(), 4).unwrap(), Some(3));

        assert_eq!(store.remove("c".into()).unwrap(), 4);
        assert_eq!(store.try_remove("c".into()).unwrap(), None);
        assert_eq!(store.try_remove("b".into()).unwrap(), Some(2));

        assert_eq!(store.get(&"a".into()).unwrap(), 11);
        assert!(store.contains_key(&"a".into()).unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn strict_methods_surface_conflicts() {
        let store: MemoryStore<String, i64> = MemoryStore::new();
        store.add("a".into(), 1).unwrap();

        let dup = store.add("a".into(), 2).unwrap_err();
        assert!(matches!(dup, StoreError::KeyAlreadyExists { .. }));

        let missing = store.update("zzz".into(), 0).unwrap_err();
        assert!(matches!(missing, StoreError::KeyNotFound { .. }));

        let gone = store.remove("zzz".into()).unwrap_err();
        assert!(matches!(gone, StoreError::KeyNotFound { .. }));

        let lookup = store.get(&"zzz".into()).unwrap_err();
        assert!(matches!(lookup, StoreError::KeyNotFound { .. }));
    }

    fn add_through<S: KvStore<Key = u32, Value = String>>(store: S) -> Result<()> {
        store.add(1, "one".into())
    }

    #[test]
    fn blanket_impls_preserve_store_behavior() {
        let store = Arc::new(MemoryStore::<u32, String>::new());

        // An Arc clone and a plain reference both satisfy the trait.
        add_through(Arc::clone(&store)).unwrap();
        assert_eq!(store.try_get_value(&1).unwrap(), Some("one".to_string()));

        let by_ref: &MemoryStore<u32, String> = &store;
        assert_eq!(by_ref.len().unwrap(), 1);
        assert!(add_through(by_ref).unwrap_err().is_conflict());
    }
}

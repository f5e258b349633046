//! In-memory store backed by a hash map

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{Result, StoreError};
use crate::store::{KvReadStore, KvStore};
use crate::write::{WriteOp, WriteOutcome, WriteRecord};

/// Thread-safe in-memory key-value store.
///
/// Batches are applied all-or-nothing: the whole batch is staged against a
/// copy of the map and swapped in only when every operation succeeds, so a
/// conflicting operation leaves the store untouched.
#[derive(Debug)]
pub struct MemoryStore<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> MemoryStore<K, V> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> From<HashMap<K, V>> for MemoryStore<K, V> {
    fn from(entries: HashMap<K, V>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryStore<K, V>
where
    K: Eq + std::hash::Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<HashMap<K, V>>())
    }
}

impl<K, V> KvReadStore for MemoryStore<K, V>
where
    K: Clone + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn try_get_value(&self, key: &K) -> Result<Option<V>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn entries(&self) -> Result<Vec<(K, V)>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn len(&self) -> Result<usize> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries.len())
    }
}

impl<K, V> KvStore for MemoryStore<K, V>
where
    K: Clone + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn write(&self, ops: Vec<WriteOp<K, V>>) -> Result<Vec<WriteRecord<K, V>>> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // Stage against a copy so a failing operation leaves the live map
        // untouched.
        let mut staged = entries.clone();
        let mut records = Vec::with_capacity(ops.len());
        for op in ops {
            records.push(apply(&mut staged, op)?);
        }
        *entries = staged;
        Ok(records)
    }
}

fn apply<K, V>(map: &mut HashMap<K, V>, op: WriteOp<K, V>) -> Result<WriteRecord<K, V>>
where
    K: Clone + Eq + std::hash::Hash + std::fmt::Debug,
    V: Clone,
{
    let record = match op {
        WriteOp::Add { key, value } => {
            if map.contains_key(&key) {
                return Err(StoreError::key_already_exists(&key));
            }
            let new = value();
            map.insert(key.clone(), new.clone());
            WriteRecord::new(key, WriteOutcome::Added { new })
        }
        WriteOp::TryAdd { key, value } => {
            if map.contains_key(&key) {
                WriteRecord::new(key, WriteOutcome::AddSkipped)
            } else {
                let new = value();
                map.insert(key.clone(), new.clone());
                WriteRecord::new(key, WriteOutcome::Added { new })
            }
        }
        WriteOp::Update { key, update } => {
            let Some(old) = map.get(&key).cloned() else {
                return Err(StoreError::key_not_found(&key));
            };
            let new = update(&old);
            map.insert(key.clone(), new.clone());
            WriteRecord::new(key, WriteOutcome::Updated { old, new })
        }
        WriteOp::TryUpdate { key, update } => match map.get(&key).cloned() {
            Some(old) => {
                let new = update(&old);
                map.insert(key.clone(), new.clone());
                WriteRecord::new(key, WriteOutcome::Updated { old, new })
            }
            None => WriteRecord::new(key, WriteOutcome::UpdateSkipped),
        },
        WriteOp::AddOrUpdate { key, value, update } => match map.get(&key).cloned() {
            Some(old) => {
                let new = update(&old);
                map.insert(key.clone(), new.clone());
                WriteRecord::new(key, WriteOutcome::Updated { old, new })
            }
            None => {
                let new = value();
                map.insert(key.clone(), new.clone());
                WriteRecord::new(key, WriteOutcome::Added { new })
            }
        },
        WriteOp::Remove { key } => match map.remove(&key) {
            Some(old) => WriteRecord::new(key, WriteOutcome::Removed { old }),
            None => return Err(StoreError::key_not_found(&key)),
        },
        WriteOp::TryRemove { key } => match map.remove(&key) {
            Some(old) => WriteRecord::new(key, WriteOutcome::Removed { old }),
            None => WriteRecord::new(key, WriteOutcome::RemoveSkipped),
        },
    };
    Ok(record)
}

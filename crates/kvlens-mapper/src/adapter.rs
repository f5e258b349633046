//! Mapped view over a differently-typed store

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use kvlens_core::error::Result;
use kvlens_core::store::{KvReadStore, KvStore};
use kvlens_core::write::{UpdateFn, ValueFn, WriteOp, WriteRecord};

use crate::bimapper::Bimapper;

/// Adapter exposing a store under mapped key and value types.
///
/// Reads convert the requested key inward, look it up in the source, and
/// convert the found value outward. Writes are rewritten into source-typed
/// operations of the same kind: keys convert eagerly, while value payloads
/// are wrapped in composed closures, so a view-side value converts to its
/// store-side representation only at the moment the source applies the
/// operation. When a write-buffering layer sits on top, that moment is
/// flush time, and the conversion sees whatever mapper state exists then.
///
/// The adapter implements only the capabilities its source has: a read-only
/// source yields a read-only mapped view.
pub struct MappedStore<S, KM, VM> {
    source: S,
    keys: Arc<KM>,
    values: Arc<VM>,
}

impl<S, KM, VM> MappedStore<S, KM, VM> {
    /// Wraps `source` with a key mapper and a value mapper.
    #[must_use]
    pub fn new(source: S, keys: KM, values: VM) -> Self {
        Self {
            source,
            keys: Arc::new(keys),
            values: Arc::new(values),
        }
    }

    /// Borrows the wrapped source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }
}

impl<S, KM, VM> KvReadStore for MappedStore<S, KM, VM>
where
    S: KvReadStore,
    KM: Bimapper<Inner = S::Key> + Send + Sync + 'static,
    VM: Bimapper<Inner = S::Value> + Send + Sync + 'static,
    KM::Outer: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    VM::Outer: Clone + Send + Sync + 'static,
{
    type Key = KM::Outer;
    type Value = VM::Outer;

    fn try_get_value(&self, key: &Self::Key) -> Result<Option<Self::Value>> {
        let inner_key = self.keys.inward(key);
        Ok(self
            .source
            .try_get_value(&inner_key)?
            .map(|value| self.values.outward(&value)))
    }

    fn entries(&self) -> Result<Vec<(Self::Key, Self::Value)>> {
        Ok(self
            .source
            .entries()?
            .into_iter()
            .map(|(key, value)| (self.keys.outward(&key), self.values.outward(&value)))
            .collect())
    }

    fn len(&self) -> Result<usize> {
        self.source.len()
    }
}

impl<S, KM, VM> KvStore for MappedStore<S, KM, VM>
where
    S: KvStore,
    KM: Bimapper<Inner = S::Key> + Send + Sync + 'static,
    VM: Bimapper<Inner = S::Value> + Send + Sync + 'static,
    KM::Outer: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    VM::Outer: Clone + Send + Sync + 'static,
{
    fn write(
        &self,
        ops: Vec<WriteOp<Self::Key, Self::Value>>,
    ) -> Result<Vec<WriteRecord<Self::Key, Self::Value>>> {
        let rewritten = ops
            .into_iter()
            .map(|op| rewrite_op(&self.keys, &self.values, op))
            .collect();
        let records = self.source.write(rewritten)?;
        Ok(records
            .into_iter()
            .map(|record| {
                WriteRecord::new(
                    self.keys.outward(&record.key),
                    record.outcome.map(|value| self.values.outward(&value)),
                )
            })
            .collect())
    }

    fn flush(&self) -> Result<()> {
        self.source.flush()
    }
}

fn rewrite_op<KM, VM>(
    keys: &Arc<KM>,
    values: &Arc<VM>,
    op: WriteOp<KM::Outer, VM::Outer>,
) -> WriteOp<KM::Inner, VM::Inner>
where
    KM: Bimapper,
    VM: Bimapper + Send + Sync + 'static,
    VM::Inner: 'static,
    VM::Outer: 'static,
{
    match op {
        WriteOp::Add { key, value } => WriteOp::Add {
            key: keys.inward(&key),
            value: inward_value(values, value),
        },
        WriteOp::TryAdd { key, value } => WriteOp::TryAdd {
            key: keys.inward(&key),
            value: inward_value(values, value),
        },
        WriteOp::Update { key, update } => WriteOp::Update {
            key: keys.inward(&key),
            update: inward_update(values, update),
        },
        WriteOp::TryUpdate { key, update } => WriteOp::TryUpdate {
            key: keys.inward(&key),
            update: inward_update(values, update),
        },
        WriteOp::AddOrUpdate { key, value, update } => WriteOp::AddOrUpdate {
            key: keys.inward(&key),
            value: inward_value(values, value),
            update: inward_update(values, update),
        },
        WriteOp::Remove { key } => WriteOp::Remove {
            key: keys.inward(&key),
        },
        WriteOp::TryRemove { key } => WriteOp::TryRemove {
            key: keys.inward(&key),
        },
    }
}

/// Wraps a view-side value payload so it converts inward only when invoked.
fn inward_value<VM>(values: &Arc<VM>, value: ValueFn<VM::Outer>) -> ValueFn<VM::Inner>
where
    VM: Bimapper + Send + Sync + 'static,
    VM::Inner: 'static,
    VM::Outer: 'static,
{
    let values = Arc::clone(values);
    Arc::new(move || values.inward(&value()))
}

/// Lifts a view-side update to the store side: the store value converts
/// outward, the update applies, and the result converts back inward.
fn inward_update<VM>(values: &Arc<VM>, update: UpdateFn<VM::Outer>) -> UpdateFn<VM::Inner>
where
    VM: Bimapper + Send + Sync + 'static,
    VM::Inner: 'static,
    VM::Outer: 'static,
{
    let values = Arc::clone(values);
    Arc::new(move |inner| values.inward(&update(&values.outward(inner))))
}

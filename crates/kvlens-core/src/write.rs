//! Batched write operations and their per-operation results

use std::fmt;
use std::sync::Arc;

/// Lazily evaluated value payload carried by add-style operations.
///
/// Decorators that rewrite operations for a differently-typed store wrap
/// these in composed closures, so the payload is only materialized when the
/// operation is finally applied.
pub type ValueFn<V> = Arc<dyn Fn() -> V + Send + Sync>;

/// Functional update applied to the value visible just before the operation.
///
/// An update may be evaluated more than once: decorators re-apply it when
/// computing a composed read view, and the store applies it again when the
/// operation lands. Updates should therefore be pure.
pub type UpdateFn<V> = Arc<dyn Fn(&V) -> V + Send + Sync>;

/// Discriminant of a [`WriteOp`], usable for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteKind {
    /// Insert a new key; fails if the key is present.
    Add,
    /// Insert a new key; skipped if the key is present.
    TryAdd,
    /// Rewrite an existing key; fails if the key is absent.
    Update,
    /// Rewrite an existing key; skipped if the key is absent.
    TryUpdate,
    /// Insert or rewrite depending on presence.
    AddOrUpdate,
    /// Remove an existing key; fails if the key is absent.
    Remove,
    /// Remove a key; skipped if the key is absent.
    TryRemove,
}

impl WriteKind {
    /// Returns `true` for the kinds that report a skip instead of failing.
    #[must_use]
    pub const fn is_try(self) -> bool {
        matches!(self, Self::TryAdd | Self::TryUpdate | Self::TryRemove)
    }
}

/// One pending mutation against a store.
///
/// Value payloads are closures rather than eager values so that adapters can
/// rewrite an operation for their source's value type without converting
/// anything until the operation is applied.
#[derive(Clone)]
pub enum WriteOp<K, V> {
    /// Insert `key`; fails if a value is already visible for it.
    Add {
        /// Key to insert.
        key: K,
        /// Producer of the value to insert.
        value: ValueFn<V>,
    },
    /// Insert `key`; reports a skip if a value is already visible for it.
    TryAdd {
        /// Key to insert.
        key: K,
        /// Producer of the value to insert.
        value: ValueFn<V>,
    },
    /// Rewrite `key`; fails if no value is visible for it.
    Update {
        /// Key to rewrite.
        key: K,
        /// Update applied to the previously visible value.
        update: UpdateFn<V>,
    },
    /// Rewrite `key`; reports a skip if no value is visible for it.
    TryUpdate {
        /// Key to rewrite.
        key: K,
        /// Update applied to the previously visible value.
        update: UpdateFn<V>,
    },
    /// Insert when absent, rewrite when present.
    AddOrUpdate {
        /// Key to insert or rewrite.
        key: K,
        /// Producer of the value used when the key is absent.
        value: ValueFn<V>,
        /// Update applied when the key is present.
        update: UpdateFn<V>,
    },
    /// Remove `key`; fails if no value is visible for it.
    Remove {
        /// Key to remove.
        key: K,
    },
    /// Remove `key`; reports a skip if no value is visible for it.
    TryRemove {
        /// Key to remove.
        key: K,
    },
}

impl<K, V> WriteOp<K, V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Add with an eager value.
    #[must_use]
    pub fn add(key: K, value: V) -> Self {
        Self::Add {
            key,
            value: Arc::new(move || value.clone()),
        }
    }

    /// Try-add with an eager value.
    #[must_use]
    pub fn try_add(key: K, value: V) -> Self {
        Self::TryAdd {
            key,
            value: Arc::new(move || value.clone()),
        }
    }

    /// Update that replaces the previous value with an eager one.
    #[must_use]
    pub fn update_to(key: K, value: V) -> Self {
        Self::Update {
            key,
            update: Arc::new(move |_| value.clone()),
        }
    }

    /// Try-update that replaces the previous value with an eager one.
    #[must_use]
    pub fn try_update_to(key: K, value: V) -> Self {
        Self::TryUpdate {
            key,
            update: Arc::new(move |_| value.clone()),
        }
    }

    /// Add-or-update that inserts or replaces with the same eager value.
    #[must_use]
    pub fn add_or_update(key: K, value: V) -> Self {
        let insert = value.clone();
        Self::AddOrUpdate {
            key,
            value: Arc::new(move || insert.clone()),
            update: Arc::new(move |_| value.clone()),
        }
    }
}

impl<K, V> WriteOp<K, V> {
    /// Add with a lazily evaluated value.
    #[must_use]
    pub fn add_with<F>(key: K, value: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self::Add {
            key,
            value: Arc::new(value),
        }
    }

    /// Try-add with a lazily evaluated value.
    #[must_use]
    pub fn try_add_with<F>(key: K, value: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self::TryAdd {
            key,
            value: Arc::new(value),
        }
    }

    /// Update with a function of the previous value.
    #[must_use]
    pub fn update<F>(key: K, update: F) -> Self
    where
        F: Fn(&V) -> V + Send + Sync + 'static,
    {
        Self::Update {
            key,
            update: Arc::new(update),
        }
    }

    /// Try-update with a function of the previous value.
    #[must_use]
    pub fn try_update<F>(key: K, update: F) -> Self
    where
        F: Fn(&V) -> V + Send + Sync + 'static,
    {
        Self::TryUpdate {
            key,
            update: Arc::new(update),
        }
    }

    /// Add-or-update with independent insert and update payloads.
    #[must_use]
    pub fn add_or_update_with<F, G>(key: K, value: F, update: G) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        G: Fn(&V) -> V + Send + Sync + 'static,
    {
        Self::AddOrUpdate {
            key,
            value: Arc::new(value),
            update: Arc::new(update),
        }
    }

    /// Remove an existing key.
    #[must_use]
    pub const fn remove(key: K) -> Self {
        Self::Remove { key }
    }

    /// Remove a key if present.
    #[must_use]
    pub const fn try_remove(key: K) -> Self {
        Self::TryRemove { key }
    }

    /// The key this operation targets.
    #[must_use]
    pub const fn key(&self) -> &K {
        match self {
            Self::Add { key, .. }
            | Self::TryAdd { key, .. }
            | Self::Update { key, .. }
            | Self::TryUpdate { key, .. }
            | Self::AddOrUpdate { key, .. }
            | Self::Remove { key }
            | Self::TryRemove { key } => key,
        }
    }

    /// The operation's discriminant.
    #[must_use]
    pub const fn kind(&self) -> WriteKind {
        match self {
            Self::Add { .. } => WriteKind::Add,
            Self::TryAdd { .. } => WriteKind::TryAdd,
            Self::Update { .. } => WriteKind::Update,
            Self::TryUpdate { .. } => WriteKind::TryUpdate,
            Self::AddOrUpdate { .. } => WriteKind::AddOrUpdate,
            Self::Remove { .. } => WriteKind::Remove,
            Self::TryRemove { .. } => WriteKind::TryRemove,
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for WriteOp<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteOp")
            .field("kind", &self.kind())
            .field("key", self.key())
            .finish_non_exhaustive()
    }
}

/// Result of applying a single [`WriteOp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<V> {
    /// A new value was inserted.
    Added {
        /// The inserted value.
        new: V,
    },
    /// A try-add found the key already present.
    AddSkipped,
    /// An existing value was rewritten.
    Updated {
        /// The value that was replaced.
        old: V,
        /// The replacement value.
        new: V,
    },
    /// A try-update found the key absent.
    UpdateSkipped,
    /// An existing value was removed.
    Removed {
        /// The removed value.
        old: V,
    },
    /// A try-remove found the key absent.
    RemoveSkipped,
}

impl<V> WriteOutcome<V> {
    /// Returns `true` when the operation changed the store.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Added { .. } | Self::Updated { .. } | Self::Removed { .. }
        )
    }

    /// The value visible for the key after the operation, if any.
    #[must_use]
    pub const fn new_value(&self) -> Option<&V> {
        match self {
            Self::Added { new } | Self::Updated { new, .. } => Some(new),
            _ => None,
        }
    }

    /// The value the operation replaced or removed, if any.
    #[must_use]
    pub const fn previous_value(&self) -> Option<&V> {
        match self {
            Self::Updated { old, .. } | Self::Removed { old } => Some(old),
            _ => None,
        }
    }

    /// Maps both value slots through `f`, preserving the outcome shape.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> WriteOutcome<U>
    where
        F: Fn(V) -> U,
    {
        match self {
            Self::Added { new } => WriteOutcome::Added { new: f(new) },
            Self::AddSkipped => WriteOutcome::AddSkipped,
            Self::Updated { old, new } => WriteOutcome::Updated {
                old: f(old),
                new: f(new),
            },
            Self::UpdateSkipped => WriteOutcome::UpdateSkipped,
            Self::Removed { old } => WriteOutcome::Removed { old: f(old) },
            Self::RemoveSkipped => WriteOutcome::RemoveSkipped,
        }
    }
}

/// A key paired with the outcome of the operation that targeted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord<K, V> {
    /// The key the operation targeted.
    pub key: K,
    /// What the operation did.
    pub outcome: WriteOutcome<V>,
}

impl<K, V> WriteRecord<K, V> {
    /// Pairs a key with an outcome.
    #[must_use]
    pub const fn new(key: K, outcome: WriteOutcome<V>) -> Self {
        Self { key, outcome }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn eager_add_evaluates_to_the_captured_value() {
        let op: WriteOp<&str, String> = WriteOp::add("k", "v".to_string());
        match op {
            WriteOp::Add { key, value } => {
                assert_eq!(key, "k");
                assert_eq!(value(), "v");
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn kind_and_key_accessors_cover_every_variant() {
        let ops: Vec<WriteOp<u32, String>> = vec![
            WriteOp::add(1, "a".into()),
            WriteOp::try_add(2, "b".into()),
            WriteOp::update_to(3, "c".into()),
            WriteOp::try_update_to(4, "d".into()),
            WriteOp::add_or_update(5, "e".into()),
            WriteOp::remove(6),
            WriteOp::try_remove(7),
        ];
        let kinds: Vec<WriteKind> = ops.iter().map(WriteOp::kind).collect();
        assert_eq!(
            kinds,
            vec![
                WriteKind::Add,
                WriteKind::TryAdd,
                WriteKind::Update,
                WriteKind::TryUpdate,
                WriteKind::AddOrUpdate,
                WriteKind::Remove,
                WriteKind::TryRemove,
            ]
        );
        let keys: Vec<u32> = ops.iter().map(|op| *op.key()).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5, 6, 7]);
        assert!(WriteKind::TryAdd.is_try());
        assert!(!WriteKind::AddOrUpdate.is_try());
    }

    #[test]
    fn update_receives_the_previous_value() {
        let op: WriteOp<&str, i64> = WriteOp::update("k", |prev| prev + 10);
        match op {
            WriteOp::Update { update, .. } => assert_eq!(update(&5), 15),
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn outcome_accessors_expose_value_slots() {
        let updated: WriteOutcome<i32> = WriteOutcome::Updated { old: 1, new: 2 };
        assert!(updated.is_mutation());
        assert_eq!(updated.new_value(), Some(&2));
        assert_eq!(updated.previous_value(), Some(&1));

        let skipped: WriteOutcome<i32> = WriteOutcome::RemoveSkipped;
        assert!(!skipped.is_mutation());
        assert_eq!(skipped.new_value(), None);

        let mapped = updated.map(|v| v * 10);
        assert_eq!(mapped, WriteOutcome::Updated { old: 10, new: 20 });
    }
}

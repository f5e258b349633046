//! Write-back buffer decorator

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};

use crate::error::{Result, StoreError};
use crate::store::{KvReadStore, KvStore};
use crate::toggle::Toggle;
use crate::write::{WriteOp, WriteOutcome, WriteRecord};

/// Decorator that records writes in an in-memory buffer instead of applying
/// them, until [`flush`](KvStore::flush) pushes the whole buffer into the
/// source as one batch.
///
/// Reads compose the buffer over the source: a buffered add or update
/// shadows the source's value for that key and a buffered remove hides it,
/// so callers see their own uncommitted writes while the source stays
/// untouched.
///
/// Two shared [`Toggle`]s adjust routing without touching buffer contents:
/// `bypass_cache` sends reads and writes straight to the source, and
/// `never_flush` turns [`flush`](KvStore::flush) into a buffer-retaining
/// no-op. Outer coordination layers hold clones of these toggles to run a
/// commit protocol across several buffered stores at once.
///
/// Buffer mutation and flushing serialize on one internal lock, so a flush
/// is atomic relative to concurrent writers. The buffer is cleared only
/// after the source accepts the batch; a failed flush leaves every recorded
/// write in place for a later retry.
#[derive(Debug)]
pub struct WriteCachedStore<S: KvStore> {
    source: S,
    buffer: Mutex<Vec<WriteOp<S::Key, S::Value>>>,
    bypass: Toggle,
    never_flush: Toggle,
}

impl<S: KvStore> WriteCachedStore<S> {
    /// Wraps `source` with an empty write buffer and fresh toggles.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_toggles(source, Toggle::default(), Toggle::default())
    }

    /// Wraps `source` using caller-provided toggles, so several stores can
    /// share one bypass or never-flush switch.
    #[must_use]
    pub const fn with_toggles(source: S, bypass: Toggle, never_flush: Toggle) -> Self {
        Self {
            source,
            buffer: Mutex::new(Vec::new()),
            bypass,
            never_flush,
        }
    }

    /// Borrows the wrapped source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Snapshot of the buffered writes, in insertion order.
    #[must_use]
    pub fn writes(&self) -> Vec<WriteOp<S::Key, S::Value>> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any writes are waiting to be flushed.
    #[must_use]
    pub fn is_buffering(&self) -> bool {
        !self
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Handle to the switch that routes reads and writes straight to the
    /// source while set. Buffer contents are unaffected by the switch.
    #[must_use]
    pub fn bypass_cache(&self) -> Toggle {
        self.bypass.clone()
    }

    /// Handle to the switch that makes [`flush`](KvStore::flush) a no-op
    /// while set. Buffered writes are retained, not dropped.
    #[must_use]
    pub fn never_flush(&self) -> Toggle {
        self.never_flush.clone()
    }

    fn visible_through_buffer(
        &self,
        buffer: &[WriteOp<S::Key, S::Value>],
        key: &S::Key,
    ) -> Result<Option<S::Value>> {
        let mut current = self.source.try_get_value(key)?;
        let mut shadowed = false;
        for op in buffer.iter().filter(|op| op.key() == key) {
            current = fold_op(current, op);
            shadowed = true;
        }
        if shadowed {
            trace!(key = ?key, "read satisfied through write buffer");
        }
        Ok(current)
    }
}

impl<S: KvStore> KvReadStore for WriteCachedStore<S> {
    type Key = S::Key;
    type Value = S::Value;

    fn try_get_value(&self, key: &Self::Key) -> Result<Option<Self::Value>> {
        if self.bypass.get() {
            return self.source.try_get_value(key);
        }
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        self.visible_through_buffer(&buffer, key)
    }

    fn entries(&self) -> Result<Vec<(Self::Key, Self::Value)>> {
        if self.bypass.get() {
            return self.source.entries();
        }
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);

        // Source entries keep their order; keys first introduced by the
        // buffer follow in first-buffered order.
        let mut order = Vec::new();
        let mut view: HashMap<Self::Key, Option<Self::Value>> = HashMap::new();
        for (key, value) in self.source.entries()? {
            order.push(key.clone());
            view.insert(key, Some(value));
        }
        for op in &*buffer {
            let key = op.key();
            if let Some(slot) = view.get_mut(key) {
                *slot = fold_op(slot.take(), op);
            } else {
                order.push(key.clone());
                view.insert(key.clone(), fold_op(None, op));
            }
        }

        let mut entries = Vec::new();
        for key in order {
            if let Some(Some(value)) = view.remove(&key) {
                entries.push((key, value));
            }
        }
        Ok(entries)
    }
}

impl<S: KvStore> KvStore for WriteCachedStore<S> {
    fn write(
        &self,
        ops: Vec<WriteOp<Self::Key, Self::Value>>,
    ) -> Result<Vec<WriteRecord<Self::Key, Self::Value>>> {
        if self.bypass.get() {
            return self.source.write(ops);
        }
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);

        // Validate the whole batch against the composed view before
        // buffering anything, threading each operation's effect to the next.
        let mut overlay: HashMap<Self::Key, Option<Self::Value>> = HashMap::new();
        let mut records = Vec::with_capacity(ops.len());
        let mut accepted = Vec::new();
        for op in ops {
            let key = op.key().clone();
            let current = match overlay.get(&key) {
                Some(value) => value.clone(),
                None => self.visible_through_buffer(&buffer, &key)?,
            };

            let (record, buffered) = stage_op(current.clone(), op)?;
            let after = match &record.outcome {
                WriteOutcome::Added { new } | WriteOutcome::Updated { new, .. } => {
                    Some(new.clone())
                }
                WriteOutcome::Removed { .. } => None,
                WriteOutcome::AddSkipped
                | WriteOutcome::UpdateSkipped
                | WriteOutcome::RemoveSkipped => current,
            };
            overlay.insert(key, after);
            records.push(record);
            if let Some(op) = buffered {
                accepted.push(op);
            }
        }

        buffer.extend(accepted);
        Ok(records)
    }

    fn flush(&self) -> Result<()> {
        if self.never_flush.get() {
            debug!("flush suppressed by never-flush toggle");
            return Ok(());
        }
        {
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            if !buffer.is_empty() {
                let batch = buffer.clone();
                let count = batch.len();
                // The buffer is cleared only once the source accepts the
                // whole batch, so a failed flush can be retried.
                self.source.write(batch)?;
                buffer.clear();
                debug!(ops = count, "flushed buffered writes");
            }
        }
        self.source.flush()
    }
}

/// Applies one buffered operation to a visible value, with try semantics
/// throughout. Recorded operations were validated against this same view, so
/// the lenient replay reproduces exactly what was recorded.
fn fold_op<K, V>(current: Option<V>, op: &WriteOp<K, V>) -> Option<V> {
    match op {
        WriteOp::Add { value, .. } | WriteOp::TryAdd { value, .. } => {
            if current.is_some() {
                current
            } else {
                Some(value())
            }
        }
        WriteOp::Update { update, .. } | WriteOp::TryUpdate { update, .. } => {
            current.map(|prev| update(&prev))
        }
        WriteOp::AddOrUpdate { value, update, .. } => {
            Some(current.map_or_else(|| value(), |prev| update(&prev)))
        }
        WriteOp::Remove { .. } | WriteOp::TryRemove { .. } => None,
    }
}

/// Decides what recording `op` against the visible value `current` does:
/// the outcome reported to the caller, and the operation to buffer, if any.
///
/// Add payloads are forced here, once, so later view folds and the eventual
/// flush reuse the same value. Update payloads stay live so the flush
/// applies them to whatever the source holds by then.
fn stage_op<K, V>(
    current: Option<V>,
    op: WriteOp<K, V>,
) -> Result<(WriteRecord<K, V>, Option<WriteOp<K, V>>)>
where
    K: Clone + std::fmt::Debug,
    V: Clone + Send + Sync + 'static,
{
    match op {
        WriteOp::Add { key, value } => {
            if current.is_some() {
                return Err(StoreError::key_already_exists(&key));
            }
            let new = value();
            let buffered = WriteOp::add(key.clone(), new.clone());
            Ok((
                WriteRecord::new(key, WriteOutcome::Added { new }),
                Some(buffered),
            ))
        }
        WriteOp::TryAdd { key, value } => {
            if current.is_some() {
                return Ok((WriteRecord::new(key, WriteOutcome::AddSkipped), None));
            }
            let new = value();
            let buffered = WriteOp::try_add(key.clone(), new.clone());
            Ok((
                WriteRecord::new(key, WriteOutcome::Added { new }),
                Some(buffered),
            ))
        }
        WriteOp::Update { key, update } => match current {
            Some(old) => {
                let new = update(&old);
                let buffered = WriteOp::Update {
                    key: key.clone(),
                    update,
                };
                Ok((
                    WriteRecord::new(key, WriteOutcome::Updated { old, new }),
                    Some(buffered),
                ))
            }
            None => Err(StoreError::key_not_found(&key)),
        },
        WriteOp::TryUpdate { key, update } => match current {
            Some(old) => {
                let new = update(&old);
                let buffered = WriteOp::TryUpdate {
                    key: key.clone(),
                    update,
                };
                Ok((
                    WriteRecord::new(key, WriteOutcome::Updated { old, new }),
                    Some(buffered),
                ))
            }
            None => Ok((WriteRecord::new(key, WriteOutcome::UpdateSkipped), None)),
        },
        WriteOp::AddOrUpdate { key, value, update } => match current {
            Some(old) => {
                let new = update(&old);
                let buffered = WriteOp::AddOrUpdate {
                    key: key.clone(),
                    value,
                    update,
                };
                Ok((
                    WriteRecord::new(key, WriteOutcome::Updated { old, new }),
                    Some(buffered),
                ))
            }
            None => {
                let new = value();
                let forced = new.clone();
                let buffered = WriteOp::AddOrUpdate {
                    key: key.clone(),
                    value: Arc::new(move || forced.clone()),
                    update,
                };
                Ok((
                    WriteRecord::new(key, WriteOutcome::Added { new }),
                    Some(buffered),
                ))
            }
        },
        WriteOp::Remove { key } => match current {
            Some(old) => {
                let buffered = WriteOp::Remove { key: key.clone() };
                Ok((
                    WriteRecord::new(key, WriteOutcome::Removed { old }),
                    Some(buffered),
                ))
            }
            None => Err(StoreError::key_not_found(&key)),
        },
        WriteOp::TryRemove { key } => match current {
            Some(old) => {
                let buffered = WriteOp::TryRemove { key: key.clone() };
                Ok((
                    WriteRecord::new(key, WriteOutcome::Removed { old }),
                    Some(buffered),
                ))
            }
            None => Ok((WriteRecord::new(key, WriteOutcome::RemoveSkipped), None)),
        },
    }
}

//! Shared boolean switches for coordinating composed store layers

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to a shared boolean flag.
///
/// Buffering decorators expose their bypass and never-flush switches as
/// toggles, so an outer coordinator (for example a transaction scope built on
/// top of several cached stores) can hold clones of every switch and flip
/// them together around a commit.
#[derive(Debug, Clone, Default)]
pub struct Toggle {
    flag: Arc<AtomicBool>,
}

impl Toggle {
    /// Creates a toggle with the given initial state.
    #[must_use]
    pub fn new(value: bool) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(value)),
        }
    }

    /// Current state.
    #[must_use]
    pub fn get(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sets the state, visible to every clone of this toggle.
    pub fn set(&self, value: bool) {
        self.flag.store(value, Ordering::SeqCst);
    }

    /// Whether `other` is a clone of this toggle.
    #[must_use]
    pub fn shares_flag(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }
}

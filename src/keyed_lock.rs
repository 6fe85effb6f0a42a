//! Per-key serialization: one mutex per game path, created on first use.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A map of independently lockable slots.
///
/// The outer map lock is only held long enough to find or create a slot, so work
/// on distinct keys never contends.
pub struct KeyedMutex<K, T> {
    slots: Mutex<HashMap<K, Arc<Mutex<T>>>>,
}

impl<K, T> KeyedMutex<K, T>
where
    K: Eq + Hash + Clone,
    T: Default,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the slot for `key`, creating an empty one when absent.
    pub fn slot(&self, key: &K) -> Arc<Mutex<T>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.clone()).or_default().clone()
    }

    /// Returns the slot for `key` without creating it.
    pub fn existing(&self, key: &K) -> Option<Arc<Mutex<T>>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).cloned()
    }

    /// Drops the slot for `key` when no caller holds it any more and `idle`
    /// accepts its value. Returns whether the slot was removed.
    pub fn remove_if<F>(&self, key: &K, idle: F) -> bool
    where
        F: FnOnce(&T) -> bool,
    {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let removable = match slots.get(key) {
            Some(slot) => Arc::strong_count(slot) == 1 && idle(&lock_slot(slot)),
            None => false,
        };
        if removable {
            slots.remove(key);
        }
        removable
    }

    /// Snapshot of every slot currently known.
    pub fn all(&self) -> Vec<(K, Arc<Mutex<T>>)> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<K, T> Default for KeyedMutex<K, T>
where
    K: Eq + Hash + Clone,
    T: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Locks a slot, recovering the data when a previous holder panicked.
pub fn lock_slot<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| {
        log::error!("Recovered poisoned slot lock");
        poisoned.into_inner()
    })
}

//! Listener registries.
//!
//! A [`Registry`] holds `(handle, key, listener)` entries in registration
//! order. Persistent registries keep entries until they are deregistered;
//! one-shot registries hand matched entries out with
//! [`take_matching`](Registry::take_matching) or [`take_all`](Registry::take_all).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::identifiers::ListenerId;
use crate::protocol::Message;

// ============================================================================
// Types
// ============================================================================

/// Callback invoked with a routed message.
pub type Listener = Arc<dyn Fn(&Message) + Send + Sync>;

/// One registration.
struct Entry<K> {
    id: ListenerId,
    key: K,
    listener: Listener,
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered listener entries keyed by `K`.
///
/// Duplicate keys are allowed; every match is returned in registration
/// order.
pub struct Registry<K> {
    entries: Vec<Entry<K>>,
}

impl<K> Default for Registry<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for Registry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.id, &e.key)))
            .finish()
    }
}

impl<K> Registry<K> {
    /// Appends an entry.
    pub fn register(&mut self, id: ListenerId, key: K, listener: Listener) {
        self.entries.push(Entry { id, key, listener });
    }

    /// Removes the entry with handle `id`.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Removes every entry whose key satisfies `matches` and whose listener is
    /// the same allocation as `listener`.
    ///
    /// Returns the number of removed entries.
    pub fn remove_matching(
        &mut self,
        mut matches: impl FnMut(&K) -> bool,
        listener: &Listener,
    ) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !(matches(&entry.key) && Arc::ptr_eq(&entry.listener, listener)));
        before - self.entries.len()
    }

    /// Returns `true` if an entry with `key` and the same `listener` exists.
    pub fn contains(&self, mut matches: impl FnMut(&K) -> bool, listener: &Listener) -> bool {
        self.entries
            .iter()
            .any(|entry| matches(&entry.key) && Arc::ptr_eq(&entry.listener, listener))
    }

    /// Returns the listeners of every matching entry, in order.
    pub fn matching(&self, mut matches: impl FnMut(&K) -> bool) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|entry| matches(&entry.key))
            .map(|entry| Arc::clone(&entry.listener))
            .collect()
    }

    /// Removes every matching entry and returns their listeners, in order.
    pub fn take_matching(&mut self, mut matches: impl FnMut(&K) -> bool) -> Vec<Listener> {
        let mut taken = Vec::new();
        self.entries.retain(|entry| {
            if matches(&entry.key) {
                taken.push(Arc::clone(&entry.listener));
                false
            } else {
                true
            }
        });
        taken
    }

    /// Removes every entry and returns their listeners, in order.
    pub fn take_all(&mut self) -> Vec<Listener> {
        self.entries.drain(..).map(|entry| entry.listener).collect()
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the registry is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

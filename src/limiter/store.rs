//! Storage for client windows.
//!
//! The tracker only needs read, compare-and-swap and a predicate sweep, so a
//! shared key-value store with CAS can stand in for the in-memory map when
//! several gate instances must agree on counts.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::limiter::window::ClientWindow;

/// Backing table for [`ClientWindow`] records keyed by client identifier.
pub trait WindowStore: Send + Sync {
    /// Current record for `identifier`, if any.
    fn get(&self, identifier: &str) -> Option<ClientWindow>;

    /// Replace the record for `identifier` with `new` only if the stored
    /// record still equals `current` (`None` meaning "absent").
    /// Returns false when another writer got there first.
    fn compare_and_swap(
        &self,
        identifier: &str,
        current: Option<&ClientWindow>,
        new: ClientWindow,
    ) -> bool;

    /// Keep only the records for which `keep` returns true.
    /// Returns the number of records removed.
    fn retain(&self, keep: &mut dyn FnMut(&ClientWindow) -> bool) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every record, in no particular order.
    fn snapshot(&self) -> Vec<ClientWindow>;
}

/// Process-local store on a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: DashMap<String, ClientWindow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowStore for MemoryStore {
    fn get(&self, identifier: &str) -> Option<ClientWindow> {
        self.inner.get(identifier).map(|r| r.value().clone())
    }

    fn compare_and_swap(
        &self,
        identifier: &str,
        current: Option<&ClientWindow>,
        new: ClientWindow,
    ) -> bool {
        // The entry holds the shard lock, so the comparison and the write
        // are one step for every other reader and writer of this key.
        match self.inner.entry(identifier.to_string()) {
            Entry::Occupied(mut occupied) => {
                if current == Some(occupied.get()) {
                    occupied.insert(new);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                if current.is_none() {
                    vacant.insert(new);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn retain(&self, keep: &mut dyn FnMut(&ClientWindow) -> bool) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, record| keep(record));
        before.saturating_sub(self.inner.len())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn snapshot(&self) -> Vec<ClientWindow> {
        self.inner.iter().map(|r| r.value().clone()).collect()
    }
}

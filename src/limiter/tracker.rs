//! Request tracker: the only place client windows change.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::limiter::clock::Millis;
use crate::limiter::store::{MemoryStore, WindowStore};
use crate::limiter::window::{transition, ClientWindow, Decision, LimitPolicy};
use crate::observability::metrics;

/// Per-client request counters with escalating blocks.
pub struct RequestTracker {
    store: Arc<dyn WindowStore>,
    policy: ArcSwap<LimitPolicy>,
}

impl RequestTracker {
    pub fn new(store: Arc<dyn WindowStore>, policy: LimitPolicy) -> Self {
        Self {
            store,
            policy: ArcSwap::from_pointee(policy),
        }
    }

    /// Tracker over a fresh in-memory store.
    pub fn in_memory(policy: LimitPolicy) -> Self {
        Self::new(Arc::new(MemoryStore::new()), policy)
    }

    pub fn get(&self, identifier: &str) -> Option<ClientWindow> {
        self.store.get(identifier)
    }

    /// Record one request from `identifier` at `now` and decide on it.
    pub fn upsert_on_request(&self, identifier: &str, now: Millis) -> Decision {
        let policy = self.policy.load();
        loop {
            let current = self.store.get(identifier);
            let (next, decision) = transition(current.as_ref(), identifier, &policy, now);

            let newly_blocked = matches!(decision, Decision::Blocked { .. })
                && current.as_ref().map_or(true, |c| !c.is_blocked_at(now));

            if self.store.compare_and_swap(identifier, current.as_ref(), next) {
                if current.is_none() {
                    metrics::record_tracked_clients(self.store.len());
                }
                if newly_blocked {
                    tracing::warn!(
                        client = %identifier,
                        block_secs = policy.block_duration.as_secs(),
                        "Blocking client after repeated rate limit violations"
                    );
                }
                return decision;
            }

            tracing::trace!(client = %identifier, "Concurrent update, retrying");
        }
    }

    /// Drop every record that is eligible for eviction at `now`.
    pub fn evict_stale(&self, now: Millis) -> usize {
        let policy = self.policy.load();
        let removed = self
            .store
            .retain(&mut |record| !record.is_evictable(&policy, now));
        metrics::record_evictions(removed);
        metrics::record_tracked_clients(self.store.len());
        removed
    }

    pub fn policy(&self) -> Arc<LimitPolicy> {
        self.policy.load_full()
    }

    /// Swap in new limits. Existing records are kept and judged by the new
    /// limits from their next request on.
    pub fn set_policy(&self, policy: LimitPolicy) {
        self.policy.store(Arc::new(policy));
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn snapshot(&self) -> Vec<ClientWindow> {
        self.store.snapshot()
    }
}

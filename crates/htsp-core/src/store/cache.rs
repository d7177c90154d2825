// ── Generic reactive entity cache ──
//
// Concurrent storage keyed by server-assigned identifier, maintained
// purely from push events, with push-based change notification via
// `watch` channels.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use htsp_api::HtspMessage;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::convert::HtspEntity;

/// Event counters for one cache, readable without locking.
#[derive(Debug, Default)]
struct Counters {
    adds: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    updates_as_adds: AtomicU64,
    unknown_deletes: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub adds: u64,
    pub updates: u64,
    pub deletes: u64,
    /// Updates for identifiers the cache had never seen.
    pub updates_as_adds: u64,
    /// Deletes for identifiers the cache did not hold.
    pub unknown_deletes: u64,
    /// Events without a usable identifier.
    pub rejected: u64,
}

/// A concurrent, reactive collection for one entity kind.
///
/// Every mutation rebuilds the snapshot that subscribers receive. An
/// update for an unknown identifier is applied as an add; a delete for
/// an unknown identifier is a counted no-op.
pub struct EntityCache<E: HtspEntity> {
    entries: DashMap<E::Key, Arc<E>>,
    counters: Counters,
    snapshot: watch::Sender<Arc<Vec<Arc<E>>>>,
}

impl<E: HtspEntity> EntityCache<E> {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            entries: DashMap::new(),
            counters: Counters::default(),
            snapshot,
        }
    }

    // ── Event entry points ───────────────────────────────────────────

    /// Apply an add event: the message is the entity's full state.
    pub fn entity_add(&self, message: &HtspMessage) -> Option<E::Key> {
        let key = self.key_or_reject(message, "add")?;
        let mut entity = E::with_key(key.clone());
        entity.apply(message);
        if self.entries.insert(key.clone(), Arc::new(entity)).is_some() {
            debug!(kind = E::KIND, id = %key, "add replaced existing entry");
        }
        self.counters.adds.fetch_add(1, Ordering::Relaxed);
        trace!(kind = E::KIND, id = %key, "added");
        self.rebuild_snapshot();
        Some(key)
    }

    /// Apply an update event: merge the fields it carries.
    pub fn entity_update(&self, message: &HtspMessage) -> Option<E::Key> {
        let key = self.key_or_reject(message, "update")?;
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                let mut entity = E::clone(slot.get());
                entity.apply(message);
                slot.insert(Arc::new(entity));
                self.counters.updates.fetch_add(1, Ordering::Relaxed);
            }
            Entry::Vacant(slot) => {
                let mut entity = E::with_key(key.clone());
                entity.apply(message);
                slot.insert(Arc::new(entity));
                self.counters.updates_as_adds.fetch_add(1, Ordering::Relaxed);
                debug!(kind = E::KIND, id = %key, "update for unknown id applied as add");
            }
        }
        self.rebuild_snapshot();
        Some(key)
    }

    /// Apply a delete event. Returns the removed entity, if it was held.
    pub fn entity_delete(&self, message: &HtspMessage) -> Option<Arc<E>> {
        let key = self.key_or_reject(message, "delete")?;
        let removed = self.remove(&key);
        if removed.is_none() {
            self.counters.unknown_deletes.fetch_add(1, Ordering::Relaxed);
            debug!(kind = E::KIND, id = %key, "delete for unknown id ignored");
        }
        removed
    }

    // ── Direct access ────────────────────────────────────────────────

    pub fn remove(&self, key: &E::Key) -> Option<Arc<E>> {
        let removed = self.entries.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.counters.deletes.fetch_add(1, Ordering::Relaxed);
            self.rebuild_snapshot();
        }
        removed
    }

    pub fn get(&self, key: &E::Key) -> Option<Arc<E>> {
        self.entries.get(key).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, key: &E::Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Current contents ordered by key (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<E>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<E>>>> {
        self.snapshot.subscribe()
    }

    /// Remove all entities. Counters are kept.
    pub fn clear(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.rebuild_snapshot();
        if dropped > 0 {
            debug!(kind = E::KIND, dropped, "cache cleared");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            entries: self.entries.len(),
            adds: c.adds.load(Ordering::Relaxed),
            updates: c.updates.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
            updates_as_adds: c.updates_as_adds.load(Ordering::Relaxed),
            unknown_deletes: c.unknown_deletes.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn key_or_reject(&self, message: &HtspMessage, op: &str) -> Option<E::Key> {
        let key = E::key_of(message);
        if key.is_none() {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(kind = E::KIND, op, "event without identifier ignored");
        }
        key
    }

    fn rebuild_snapshot(&self) {
        let mut values: Vec<Arc<E>> = self.entries.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by_key(|e| e.key());
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

impl<E: HtspEntity> Default for EntityCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Channel;

    fn add(id: u32, name: &str) -> HtspMessage {
        HtspMessage::method("channelAdd")
            .with("channelId", id)
            .with("channelNumber", id)
            .with("channelName", name)
    }

    #[test]
    fn add_then_get() {
        let cache: EntityCache<Channel> = EntityCache::new();
        assert_eq!(cache.entity_add(&add(1, "One")), Some(1));
        assert_eq!(cache.get(&1).unwrap().name, "One");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn update_merges_into_existing() {
        let cache: EntityCache<Channel> = EntityCache::new();
        cache.entity_add(&add(1, "One"));
        cache.entity_update(&HtspMessage::method("channelUpdate").with("channelId", 1_u32).with("channelName", "Uno"));
        let channel = cache.get(&1).unwrap();
        assert_eq!(channel.name, "Uno");
        assert_eq!(channel.number, 1);
        assert_eq!(cache.stats().updates, 1);
    }

    #[test]
    fn update_for_unknown_id_is_counted_add() {
        let cache: EntityCache<Channel> = EntityCache::new();
        cache.entity_update(&HtspMessage::method("channelUpdate").with("channelId", 9_u32).with("channelName", "Late"));
        assert_eq!(cache.get(&9).unwrap().name, "Late");
        let stats = cache.stats();
        assert_eq!(stats.updates_as_adds, 1);
        assert_eq!(stats.updates, 0);
    }

    #[test]
    fn delete_unknown_is_noop() {
        let cache: EntityCache<Channel> = EntityCache::new();
        cache.entity_add(&add(1, "One"));
        assert!(cache.entity_delete(&HtspMessage::method("channelDelete").with("channelId", 2_u32)).is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().unknown_deletes, 1);
    }

    #[test]
    fn delete_then_update_recreates() {
        let cache: EntityCache<Channel> = EntityCache::new();
        cache.entity_add(&add(1, "One"));
        cache.entity_delete(&HtspMessage::method("channelDelete").with("channelId", 1_u32));
        assert!(cache.is_empty());
        cache.entity_update(&HtspMessage::method("channelUpdate").with("channelId", 1_u32).with("channelName", "Back"));
        assert_eq!(cache.get(&1).unwrap().name, "Back");
    }

    #[test]
    fn events_without_id_are_rejected() {
        let cache: EntityCache<Channel> = EntityCache::new();
        assert!(cache.entity_add(&HtspMessage::method("channelAdd").with("channelName", "x")).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().rejected, 1);
    }

    #[test]
    fn snapshot_is_ordered_by_key() {
        let cache: EntityCache<Channel> = EntityCache::new();
        cache.entity_add(&add(3, "C"));
        cache.entity_add(&add(1, "A"));
        cache.entity_add(&add(2, "B"));
        let ids: Vec<u32> = cache.snapshot().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn clear_empties_and_notifies() {
        let cache: EntityCache<Channel> = EntityCache::new();
        let mut rx = cache.subscribe();
        cache.entity_add(&add(1, "A"));
        rx.borrow_and_update();
        cache.clear();
        assert!(rx.has_changed().unwrap());
        assert!(cache.snapshot().is_empty());
        assert_eq!(cache.stats().adds, 1);
    }
}

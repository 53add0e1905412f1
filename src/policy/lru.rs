//! # Least Recently Used (LRU) Cache
//!
//! Single-list recency cache over the same pool-backed [`EvictionList`] the
//! ARC engine uses. It serves as the plain baseline when adaptive behavior
//! is not wanted, and as a reference in comparisons.
//!
//! ## LRU Operations Flow
//!
//! ```text
//!   INSERT new item (cache full)
//!   ═══════════════════════════════════════════════════════════════════════════
//!
//!   Before:
//!     head ──► [A] ◄──► [B] ◄──► [C] ◄── tail    (capacity = 3)
//!              MRU                LRU
//!
//!   put(D):
//!     1. Evict [C] from tail (pop_lru)
//!     2. Add [D] at head
//!
//!   After:
//!     head ──► [D] ◄──► [A] ◄──► [B] ◄── tail
//!
//!   ═══════════════════════════════════════════════════════════════════════════
//!
//!   ACCESS existing item
//!   ═══════════════════════════════════════════════════════════════════════════
//!
//!   get(B):
//!     1. Find [B] in KeyIndexMap: O(1)
//!     2. Move [B] to head (move_to_mru): O(1)
//!
//!   After:
//!     head ──► [B] ◄──► [A] ◄──► [C] ◄── tail
//! ```
//!
//! `peek` and `peek_lru` read without reordering.
//!
//! ## Thread Safety
//!
//! [`LruCache`] is single-owner. Wrap it in `parking_lot::Mutex` to share.

use std::fmt;

use crate::ds::{EvictionList, KeyIndexMap, SlotIndex, SlotPool};
use crate::error::{CacheError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::LruMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::LruMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{CoreMetricsRecorder, LruMetricsRecorder, MetricsSnapshotProvider};
use crate::policy::{CacheEntry, Insertion, QueueKind};
use crate::traits::{CoreCache, ReadOnlyCache};

/// Least-recently-used cache keyed by `u64` block number.
pub struct LruCache<V> {
    pool: SlotPool<CacheEntry<V>>,
    map: KeyIndexMap,
    list: EvictionList,
    capacity: usize,
    #[cfg(feature = "metrics")]
    metrics: LruMetrics,
}

impl<V> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self::with_shard_limit(capacity, crate::ds::shard::MAX_SHARD_CAPACITY)
    }

    /// Creates a cache whose key index is split into shards of at most
    /// `max_shard_capacity` buckets.
    pub fn with_shard_limit(capacity: usize, max_shard_capacity: usize) -> Self {
        let mut pool = SlotPool::new(capacity, 2);
        let list =
            EvictionList::new(&mut pool).unwrap_or_else(|_| unreachable!("sentinel slots reserved"));
        Self {
            pool,
            map: KeyIndexMap::with_shard_limit(capacity, max_shard_capacity),
            list,
            capacity,
            #[cfg(feature = "metrics")]
            metrics: LruMetrics::default(),
        }
    }

    /// Reads a payload without touching recency.
    pub fn peek(&self, key: u64) -> Option<&V> {
        let idx = self.map.get(key)?;
        self.pool.get(idx)?.payload.as_ref()
    }

    /// Least recently used entry, without reordering.
    pub fn peek_lru(&self) -> Option<(u64, &V)> {
        let idx = self.list.lru(&self.pool)?;
        let entry = self.pool.get(idx)?;
        entry.payload.as_ref().map(|value| (entry.key, value))
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(u64, V)> {
        #[cfg(feature = "metrics")]
        self.metrics.record_pop_lru_call();
        let (_, entry) = self.list.pop_lru(&mut self.pool)?;
        self.map.remove(entry.key);
        #[cfg(feature = "metrics")]
        self.metrics.record_pop_lru_found();
        entry.payload.map(|value| (entry.key, value))
    }

    /// Marks `key` as most recently used. Returns `false` if absent.
    pub fn touch(&mut self, key: u64) -> bool {
        match self.map.get(key) {
            Some(idx) => self.list.move_to_mru(&mut self.pool, idx).is_ok(),
            None => false,
        }
    }

    /// Keys from MRU to LRU.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.list.iter(&self.pool).map(|(_, entry)| entry.key)
    }

    fn slot(&self, key: u64) -> Option<SlotIndex> {
        self.map.get(key)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.list.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "len ({}) exceeds capacity ({})",
                self.list.len(),
                self.capacity
            )));
        }
        self.list.check_invariants(&self.pool)?;
        for (idx, entry) in self.list.iter(&self.pool) {
            if entry.payload.is_none() || entry.queue != QueueKind::Lru {
                return Err(InvariantError::new(format!(
                    "key {} has no payload or a foreign queue tag",
                    entry.key
                )));
            }
            if self.map.get(entry.key) != Some(idx) {
                return Err(InvariantError::new(format!(
                    "map does not point key {} at its slot",
                    entry.key
                )));
            }
        }
        if self.map.len() != self.list.len() {
            return Err(InvariantError::new(format!(
                "map len ({}) != list len ({})",
                self.map.len(),
                self.list.len()
            )));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("{err}");
        }
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> LruMetricsSnapshot {
        LruMetricsSnapshot {
            get_calls: self.metrics.get_calls,
            get_hits: self.metrics.get_hits,
            get_misses: self.metrics.get_misses,
            insert_calls: self.metrics.insert_calls,
            insert_updates: self.metrics.insert_updates,
            insert_new: self.metrics.insert_new,
            evict_calls: self.metrics.evict_calls,
            evicted_entries: self.metrics.evicted_entries,
            pop_lru_calls: self.metrics.pop_lru_calls,
            pop_lru_found: self.metrics.pop_lru_found,
            cache_len: self.list.len(),
            capacity: self.capacity,
        }
    }
}

#[cfg(feature = "metrics")]
impl<V> MetricsSnapshotProvider<LruMetricsSnapshot> for LruCache<V> {
    fn snapshot(&self) -> LruMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<V> fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.list.len())
            .finish()
    }
}

impl<V> ReadOnlyCache for LruCache<V> {
    fn contains(&self, key: u64) -> bool {
        self.map.contains_key(key)
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V> CoreCache<V> for LruCache<V> {
    fn get(&mut self, key: u64) -> Option<&V> {
        let Some(idx) = self.slot(key) else {
            #[cfg(feature = "metrics")]
            self.metrics.record_get_miss();
            return None;
        };
        self.list.move_to_mru(&mut self.pool, idx).ok()?;
        #[cfg(feature = "metrics")]
        self.metrics.record_get_hit();
        self.pool.get(idx)?.payload.as_ref()
    }

    fn put(&mut self, key: u64, value: V) -> Result<Insertion<V>, CacheError> {
        #[cfg(feature = "metrics")]
        self.metrics.record_insert_call();
        if self.capacity == 0 {
            return Ok(Insertion::Bypassed(value));
        }

        if let Some(idx) = self.slot(key) {
            self.list.move_to_mru(&mut self.pool, idx)?;
            let entry = self
                .pool
                .get_mut(idx)
                .ok_or(CacheError::InvalidIndex(idx.as_u32()))?;
            let old = entry.payload.replace(value);
            #[cfg(feature = "metrics")]
            self.metrics.record_insert_update();
            return Ok(match old {
                Some(old) => Insertion::Replaced(old),
                None => Insertion::Inserted,
            });
        }

        let mut evicted = None;
        if self.list.len() >= self.capacity {
            #[cfg(feature = "metrics")]
            self.metrics.record_evict_call();
            if let Some((_, entry)) = self.list.pop_lru(&mut self.pool) {
                self.map.remove(entry.key);
                #[cfg(feature = "metrics")]
                self.metrics.record_evicted_entry();
                evicted = entry.payload.map(|value| (entry.key, value));
            }
        }

        let entry = CacheEntry {
            key,
            queue: QueueKind::Lru,
            payload: Some(value),
        };
        let idx = self.list.push_mru(&mut self.pool, entry)?;
        self.map.put(key, idx);
        #[cfg(feature = "metrics")]
        self.metrics.record_insert_new();

        Ok(match evicted {
            Some((key, value)) => Insertion::Evicted { key, value },
            None => Insertion::Inserted,
        })
    }

    fn invalidate(&mut self, key: u64) -> Option<V> {
        let idx = self.map.remove(key)?;
        self.list.remove(&mut self.pool, idx).ok()?.payload
    }

    fn clear(&mut self) {
        self.list.clear(&mut self.pool);
        self.map.clear();
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_insert_and_get() {
        let mut cache = LruCache::new(3);
        assert_eq!(cache.put(1, "one").unwrap(), Insertion::Inserted);
        assert_eq!(cache.put(2, "two").unwrap(), Insertion::Inserted);
        assert_eq!(cache.get(1), Some(&"one"));
        assert_eq!(cache.get(3), None);
        assert_eq!(cache.len(), 2);
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_lru_eviction_order() {
        let mut cache = LruCache::new(3);
        for key in 1..=3 {
            let _ = cache.put(key, key * 10).unwrap();
        }
        // Access 1 so 2 becomes LRU.
        let _ = cache.get(1);
        assert_eq!(
            cache.put(4, 40).unwrap(),
            Insertion::Evicted { key: 2, value: 20 }
        );
        assert_eq!(cache.keys().collect::<Vec<_>>(), vec![4, 1, 3]);
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_update_moves_to_mru() {
        let mut cache = LruCache::new(2);
        let _ = cache.put(1, 'a').unwrap();
        let _ = cache.put(2, 'b').unwrap();
        assert_eq!(cache.put(1, 'z').unwrap(), Insertion::Replaced('a'));
        assert_eq!(cache.peek_lru(), Some((2, &'b')));
        assert_eq!(cache.peek(1), Some(&'z'));
    }

    #[test]
    fn test_peek_does_not_reorder() {
        let mut cache = LruCache::new(2);
        let _ = cache.put(1, 1).unwrap();
        let _ = cache.put(2, 2).unwrap();
        assert_eq!(cache.peek(1), Some(&1));
        assert_eq!(cache.pop_lru(), Some((1, 1)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_touch_and_invalidate() {
        let mut cache = LruCache::new(3);
        for key in 0..3 {
            let _ = cache.put(key, key).unwrap();
        }
        assert!(cache.touch(0));
        assert!(!cache.touch(9));
        assert_eq!(cache.peek_lru(), Some((1, &1)));
        assert_eq!(cache.invalidate(1), Some(1));
        assert_eq!(cache.invalidate(1), None);
        assert_eq!(cache.peek_lru(), Some((2, &2)));
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_clear_and_zero_capacity() {
        let mut cache = LruCache::new(2);
        let _ = cache.put(1, 1).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(1));
        let _ = cache.put(2, 2).unwrap();
        assert!(cache.contains(2));

        let mut empty = LruCache::new(0);
        assert_eq!(empty.put(1, 1).unwrap(), Insertion::Bypassed(1));
        assert!(empty.is_empty());
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_metrics_counts() {
        let mut cache = LruCache::new(1);
        let _ = cache.put(1, 1).unwrap();
        let _ = cache.put(2, 2).unwrap();
        let _ = cache.get(2);
        let _ = cache.get(1);
        let snap = cache.metrics_snapshot();
        assert_eq!(snap.insert_calls, 2);
        assert_eq!(snap.evicted_entries, 1);
        assert_eq!(snap.get_hits, 1);
        assert_eq!(snap.get_misses, 1);
        assert_eq!(snap.cache_len, 1);
    }
}

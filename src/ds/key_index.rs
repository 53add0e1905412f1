//! Sharded open-addressed map from block key to slot index.
//!
//! Keys are `u64` block numbers and values are [`SlotIndex`]es into the
//! engine's [`SlotPool`](crate::ds::SlotPool). The map is split into
//! `shard_count` independent tables (`key % shard_count`) so that no single
//! table grows past a configured size. Each table uses linear probing with
//! backward-shift deletion, which keeps probe sequences short without
//! tombstones.
//!
//! ## Architecture
//!
//! ```text
//!   KeyIndexMap { selector: key % 2 }
//!
//!   shard 0 (mask = 7)                   shard 1 (mask = 7)
//!   ┌───┬──────────────┐                 ┌───┬──────────────┐
//!   │ 0 │ (4, #12)     │                 │ 0 │ -            │
//!   │ 1 │ -            │                 │ 1 │ (3, #9)      │
//!   │ 2 │ (0, #8)      │                 │ 2 │ (7, #10)     │ ◄─ probed past 1
//!   │ . │ ...          │                 │ . │ ...          │
//!   └───┴──────────────┘                 └───┴──────────────┘
//! ```
//!
//! Tables double whenever an insert would push them above a 0.5 load
//! factor.
//!
//! ## Example Usage
//!
//! ```
//! use blockcache::ds::KeyIndexMap;
//! use blockcache::ds::SlotPool;
//!
//! let mut pool = SlotPool::new(4, 0);
//! let slot = pool.allocate(()).unwrap();
//!
//! let mut map = KeyIndexMap::with_capacity(16);
//! assert_eq!(map.put(42, slot), None);
//! assert_eq!(map.get(42), Some(slot));
//! assert_eq!(map.remove(42), Some(slot));
//! assert_eq!(map.get(42), None);
//! ```

use std::hash::BuildHasher;

use rustc_hash::FxBuildHasher;

use crate::ds::shard::{LOAD_FACTOR, MAX_SHARD_CAPACITY, ShardSelector, table_size};
use crate::ds::slot_pool::SlotIndex;

#[derive(Debug)]
struct Shard {
    buckets: Vec<Option<(u64, SlotIndex)>>,
    mask: usize,
    len: usize,
}

impl Shard {
    fn with_table_size(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            buckets: vec![None; size],
            mask: size - 1,
            len: 0,
        }
    }

    #[inline]
    fn home(&self, key: u64) -> usize {
        let h = FxBuildHasher.hash_one(key);
        ((h ^ (h >> 32)) as usize) & self.mask
    }

    fn find(&self, key: u64) -> Option<usize> {
        let mut pos = self.home(key);
        loop {
            match self.buckets[pos] {
                None => return None,
                Some((k, _)) if k == key => return Some(pos),
                Some(_) => pos = (pos + 1) & self.mask,
            }
        }
    }

    fn get(&self, key: u64) -> Option<SlotIndex> {
        self.find(key).and_then(|pos| self.buckets[pos].map(|(_, v)| v))
    }

    fn put(&mut self, key: u64, value: SlotIndex) -> Option<SlotIndex> {
        if let Some(pos) = self.find(key) {
            let slot = self.buckets[pos].as_mut()?;
            return Some(std::mem::replace(&mut slot.1, value));
        }
        if (self.len + 1) as f64 > self.buckets.len() as f64 * LOAD_FACTOR {
            self.grow();
        }
        let mut pos = self.home(key);
        while self.buckets[pos].is_some() {
            pos = (pos + 1) & self.mask;
        }
        self.buckets[pos] = Some((key, value));
        self.len += 1;
        None
    }

    fn remove(&mut self, key: u64) -> Option<SlotIndex> {
        let mut hole = self.find(key)?;
        let (_, removed) = self.buckets[hole].take()?;
        self.len -= 1;

        let mut pos = hole;
        loop {
            pos = (pos + 1) & self.mask;
            let Some((k, _)) = self.buckets[pos] else {
                break;
            };
            let home = self.home(k);
            // Shift back unless the entry's home lies in (hole, pos].
            let from_home = pos.wrapping_sub(home) & self.mask;
            let from_hole = pos.wrapping_sub(hole) & self.mask;
            if from_home >= from_hole {
                self.buckets[hole] = self.buckets[pos].take();
                hole = pos;
            }
        }
        Some(removed)
    }

    fn grow(&mut self) {
        let size = self.buckets.len() * 2;
        let old = std::mem::replace(&mut self.buckets, vec![None; size]);
        self.mask = size - 1;
        for (key, value) in old.into_iter().flatten() {
            let mut pos = self.home(key);
            while self.buckets[pos].is_some() {
                pos = (pos + 1) & self.mask;
            }
            self.buckets[pos] = Some((key, value));
        }
    }

    fn clear(&mut self) {
        self.buckets.iter_mut().for_each(|b| *b = None);
        self.len = 0;
    }
}

/// Sharded `u64 -> SlotIndex` map. Absence is reported as `None`, so no
/// slot index value is reserved as an "empty" marker.
#[derive(Debug)]
pub struct KeyIndexMap {
    selector: ShardSelector,
    shards: Vec<Shard>,
    len: usize,
}

impl KeyIndexMap {
    /// Creates a map expected to hold `required` keys, with no per-shard
    /// limit beyond [`MAX_SHARD_CAPACITY`].
    pub fn with_capacity(required: usize) -> Self {
        Self::with_shard_limit(required, MAX_SHARD_CAPACITY)
    }

    /// Creates a map expected to hold `required` keys, split into as many
    /// shards as needed to keep each initial table at or below
    /// `max_shard_capacity` buckets. Shards still grow if overfilled.
    pub fn with_shard_limit(required: usize, max_shard_capacity: usize) -> Self {
        let selector = ShardSelector::for_capacity(required, max_shard_capacity);
        let count = selector.shard_count();
        let per_shard = table_size(required.div_ceil(count));
        let shards = (0..count).map(|_| Shard::with_table_size(per_shard)).collect();
        Self {
            selector,
            shards,
            len: 0,
        }
    }

    #[inline]
    fn shard(&self, key: u64) -> &Shard {
        &self.shards[self.selector.shard_for_key(key)]
    }

    #[inline]
    fn shard_mut(&mut self, key: u64) -> &mut Shard {
        let idx = self.selector.shard_for_key(key);
        &mut self.shards[idx]
    }

    /// Maps `key` to `index`, returning the previous index if any.
    pub fn put(&mut self, key: u64, index: SlotIndex) -> Option<SlotIndex> {
        let previous = self.shard_mut(key).put(key, index);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    pub fn get(&self, key: u64) -> Option<SlotIndex> {
        self.shard(key).get(key)
    }

    pub fn remove(&mut self, key: u64) -> Option<SlotIndex> {
        let removed = self.shard_mut(key).remove(key);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    pub fn contains_key(&self, key: u64) -> bool {
        self.shard(key).find(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Removes every mapping, keeping table allocations.
    pub fn clear(&mut self) {
        self.shards.iter_mut().for_each(Shard::clear);
        self.len = 0;
    }

    /// Iterates `(key, index)` pairs shard by shard.
    pub fn iter(&self) -> impl Iterator<Item = (u64, SlotIndex)> + '_ {
        self.shards
            .iter()
            .flat_map(|shard| shard.buckets.iter().flatten().copied())
    }

    /// Iterates keys shard by shard.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.iter().map(|(key, _)| key)
    }
}

impl Default for KeyIndexMap {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIBONACCI: [(u64, u32); 7] = [(0, 0), (1, 1), (2, 1), (3, 2), (4, 3), (5, 5), (6, 8)];

    #[test]
    fn put_get_remove_under_shard_limits() {
        for limit in [128, 129, 126] {
            for (key, value) in FIBONACCI {
                let mut map = KeyIndexMap::with_shard_limit(50, limit);
                assert_eq!(map.put(key, SlotIndex(value)), None);
                assert_eq!(map.get(key), Some(SlotIndex(value)));
                assert_eq!(map.remove(key), Some(SlotIndex(value)));
                assert_eq!(map.get(key), None);
                assert!(map.is_empty());
            }
        }
    }

    #[test]
    fn shard_count_matches_limit() {
        assert_eq!(KeyIndexMap::with_shard_limit(50, 128).shard_count(), 1);
        assert_eq!(KeyIndexMap::with_shard_limit(50, 126).shard_count(), 2);
        assert_eq!(KeyIndexMap::with_capacity(1 << 10).shard_count(), 1);
    }

    #[test]
    fn put_replaces_and_reports_previous() {
        let mut map = KeyIndexMap::with_capacity(4);
        assert_eq!(map.put(9, SlotIndex(1)), None);
        assert_eq!(map.put(9, SlotIndex(2)), Some(SlotIndex(1)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(9), Some(SlotIndex(2)));
    }

    #[test]
    fn grows_past_initial_size() {
        let mut map = KeyIndexMap::with_capacity(2);
        for key in 0..1000u64 {
            map.put(key, SlotIndex(key as u32));
        }
        assert_eq!(map.len(), 1000);
        for key in 0..1000u64 {
            assert_eq!(map.get(key), Some(SlotIndex(key as u32)));
        }
    }

    #[test]
    fn keys_iterate_shard_by_shard() {
        let mut map = KeyIndexMap::with_shard_limit(50, 126);
        for key in 0..10u64 {
            map.put(key, SlotIndex(0));
        }
        let keys: Vec<u64> = map.keys().collect();
        assert_eq!(keys.len(), 10);
        let split = keys.iter().position(|k| k % 2 == 1).unwrap();
        assert!(keys[..split].iter().all(|k| k % 2 == 0));
        assert!(keys[split..].iter().all(|k| k % 2 == 1));
    }

    #[test]
    fn clear_empties_all_shards() {
        let mut map = KeyIndexMap::with_shard_limit(50, 32);
        for key in 0..20u64 {
            map.put(key, SlotIndex(1));
        }
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.keys().count(), 0);
        assert!(!map.contains_key(3));
    }
}

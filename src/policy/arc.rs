//! Adaptive Replacement Cache (ARC) replacement policy.
//!
//! Implements the ARC algorithm, which automatically adapts between recency and
//! frequency preferences by maintaining four lists and adjusting a dynamic target
//! parameter based on access patterns.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                           ArcCache<V> Layout                                │
//! │                                                                             │
//! │   ┌─────────────────────────────────────────────────────────────────────┐   │
//! │   │  map: KeyIndexMap (u64 -> SlotIndex)   pool: SlotPool<CacheEntry>   │   │
//! │   │                                                                     │   │
//! │   │  ┌──────────┬───────────┐           ┌────────┬──────────────────┐   │   │
//! │   │  │   Key    │   Slot    │           │ Slot   │ key,queue,payload│   │   │
//! │   │  ├──────────┼───────────┤           ├────────┼──────────────────┤   │   │
//! │   │  │   4096   │    #8     │──────────►│  #8    │ 4096,T1,Some(v)  │   │   │
//! │   │  │   8192   │    #9     │──────────►│  #9    │ 8192,T2,Some(v)  │   │   │
//! │   │  │    512   │    #10    │──────────►│  #10   │  512,B1,None     │   │   │
//! │   │  └──────────┴───────────┘           └────────┴──────────────────┘   │   │
//! │   └─────────────────────────────────────────────────────────────────────┘   │
//! │                                                                             │
//! │   ┌─────────────────────────────────────────────────────────────────────┐   │
//! │   │                        List Organization                            │   │
//! │   │                                                                     │   │
//! │   │   T1 (Recency - Recent Once)          T2 (Frequency - Repeated)     │   │
//! │   │   ┌─────────────────────────┐          ┌─────────────────────────┐  │   │
//! │   │   │ MRU               LRU   │          │ MRU               LRU   │  │   │
//! │   │   │  ▼                  ▼   │          │  ▼                  ▼   │  │   │
//! │   │   │ [#8] ◄──► [...] ◄──►    │          │ [#9] ◄──► [...] ◄──►    │  │   │
//! │   │   └─────────────────────────┘          └─────────────────────────┘  │   │
//! │   │                                                                     │   │
//! │   │   B1 (Ghost - evicted from T1)       B2 (Ghost - evicted from T2)   │   │
//! │   │   ┌─────────────────────────┐          ┌─────────────────────────┐  │   │
//! │   │   │ Keys only (no payload)  │          │ Keys only (no payload)  │  │   │
//! │   │   └─────────────────────────┘          └─────────────────────────┘  │   │
//! │   │                                                                     │   │
//! │   │   Adaptation Parameter: p (target size for T1)                      │   │
//! │   │   • Hit in B1 → increase p (favor recency)                          │   │
//! │   │   • Hit in B2 → decrease p (favor frequency)                        │   │
//! │   └─────────────────────────────────────────────────────────────────────┘   │
//! │                                                                             │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All four lists thread through one [`SlotPool`] of `2c` data slots. Moving
//! an entry between lists keeps its slot index, so the key map is only
//! touched when a key enters or leaves the directory.
//!
//! Insert Flow (key in no list)
//! ────────────────────────────
//!
//! ```text
//!   put(key, payload):
//!     case A: |T1| + |B1| == c
//!       |T1| <  c → drop B1 LRU, REPLACE
//!       |T1| == c → delete T1 LRU outright
//!     case B: |T1| + |B1| < c and directory >= c
//!       directory == 2c → drop B2 LRU
//!       REPLACE
//!     attach at T1 MRU
//! ```
//!
//! Ghost Hit Flow (key in B1/B2)
//! ──────────────────────────────
//!
//! ```text
//!   put(ghost_key, payload):
//!     B1: p = min(p + max(1, |B2| / |B1|), c)
//!     B2: p = max(p - max(1, |B1| / |B2|), 0)
//!     REPLACE, then move the entry to T2 MRU with the new payload
//! ```
//!
//! Eviction Flow (REPLACE, only while the cache is full)
//! ─────────────────────────────────────────────────────
//!
//! ```text
//!   if |T1| >= 1 and (|T1| > p or (key in B2 and |T1| == p)):
//!     T1 LRU → B1 MRU   (payload released)
//!   else:
//!     T2 LRU → B2 MRU   (payload released)
//! ```
//!
//! ## Operations
//!
//! | Operation    | Time   | Notes                                      |
//! |--------------|--------|--------------------------------------------|
//! | `get`        | O(1)   | Promotes T1→T2 or refreshes T2             |
//! | `put`        | O(1)   | May evict one payload, may drop one ghost  |
//! | `admit`      | O(1)   | `put` unless the stream is sequential      |
//! | `invalidate` | O(1)   | Removes from whichever list holds the key  |
//! | `clear`      | O(n)   | Releases every slot                        |
//!
//! ## Example Usage
//!
//! ```
//! use blockcache::policy::{ArcCache, Insertion, QueueKind};
//! use blockcache::traits::{CoreCache, ReadOnlyCache};
//!
//! let mut cache = ArcCache::new(2);
//! assert_eq!(cache.put(1, "a").unwrap(), Insertion::Inserted);
//! assert_eq!(cache.put(2, "b").unwrap(), Insertion::Inserted);
//!
//! // Re-access promotes to T2.
//! assert_eq!(cache.get(1), Some(&"a"));
//! assert_eq!(cache.queue_of(1), Some(QueueKind::T2));
//!
//! // A third key evicts the T1 LRU; its key is remembered in B1.
//! assert_eq!(
//!     cache.put(3, "c").unwrap(),
//!     Insertion::Evicted { key: 2, value: "b" }
//! );
//! assert_eq!(cache.queue_of(2), Some(QueueKind::B1));
//! assert!(!cache.contains(2));
//! ```
//!
//! ## Thread Safety
//!
//! - [`ArcCache`]: Not thread-safe; all mutation takes `&mut self`
//! - For concurrent access, wrap in external synchronization such as
//!   `parking_lot::Mutex<ArcCache<V>>`
//!
//! ## References
//!
//! - Megiddo & Modha, "ARC: A Self-Tuning, Low Overhead Replacement Cache",
//!   FAST 2003

use std::fmt;

use crate::config::{CacheConfig, PatternConfig};
use crate::ds::{EvictionList, KeyIndexMap, SlotIndex, SlotPool};
use crate::error::{CacheError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::ArcMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::ArcMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{ArcMetricsRecorder, CoreMetricsRecorder, MetricsSnapshotProvider};
use crate::pattern::{IoStateMachine, SequentialDetector};
use crate::policy::{CacheEntry, Insertion, QueueKind};
use crate::traits::{CoreCache, ReadOnlyCache};

/// Sentinel slots per list.
const EXTRA_NODE_COUNT: usize = 2;
const LIST_COUNT: usize = 4;

/// Adaptive Replacement Cache keyed by `u64` block number.
///
/// Resident entries live in T1 (seen once) or T2 (seen again); B1 and B2
/// remember the keys most recently evicted from each. A re-reference that
/// lands in a ghost list nudges the target T1 size `p` toward whichever side
/// would have kept the entry.
///
/// Admission through [`admit`](Self::admit) consults a
/// [`SequentialDetector`]; while it reports a sequential stream and bypass is
/// enabled, payloads are handed back instead of displacing the working set.
pub struct ArcCache<V> {
    pool: SlotPool<CacheEntry<V>>,
    map: KeyIndexMap,
    t1: EvictionList,
    t2: EvictionList,
    b1: EvictionList,
    b2: EvictionList,
    p: usize,
    capacity: usize,
    bypass_sequential: bool,
    detector: Box<dyn SequentialDetector + Send>,
    #[cfg(feature = "metrics")]
    metrics: ArcMetrics,
}

impl<V> ArcCache<V> {
    /// Creates a cache holding at most `capacity` resident entries and
    /// `capacity` ghosts.
    ///
    /// Uses a default [`IoStateMachine`] for [`admit`](Self::admit), with
    /// sequential bypass enabled.
    pub fn new(capacity: usize) -> Self {
        Self::build(
            capacity,
            KeyIndexMap::with_capacity(2 * capacity),
            true,
            Box::new(IoStateMachine::default()),
        )
    }

    /// Creates a cache sized and sharded by `cache`, with a streaming
    /// classifier configured from `pattern`.
    pub fn with_config(cache: &CacheConfig, pattern: &PatternConfig) -> Self {
        Self::with_detector(cache, Box::new(IoStateMachine::from_config(pattern)))
    }

    /// Creates a cache sized and sharded by `cache` that consults `detector`
    /// in [`admit`](Self::admit).
    ///
    /// Callers that classify accesses themselves pass
    /// [`NeverSequential`](crate::pattern::NeverSequential)
    /// with bypass disabled so the engine carries no classifier state.
    pub fn with_detector(cache: &CacheConfig, detector: Box<dyn SequentialDetector + Send>) -> Self {
        tracing::debug!(
            capacity = cache.capacity,
            max_shard_capacity = cache.max_shard_capacity,
            bypass_sequential = cache.bypass_sequential,
            "arc cache created"
        );
        Self::build(
            cache.capacity,
            KeyIndexMap::with_shard_limit(2 * cache.capacity, cache.max_shard_capacity),
            cache.bypass_sequential,
            detector,
        )
    }

    fn build(
        capacity: usize,
        map: KeyIndexMap,
        bypass_sequential: bool,
        detector: Box<dyn SequentialDetector + Send>,
    ) -> Self {
        let mut pool = SlotPool::new(2 * capacity, LIST_COUNT * EXTRA_NODE_COUNT);
        // Sentinels come out of the reserved slots, which a fresh pool
        // always has.
        let mut list = || {
            EvictionList::new(&mut pool).unwrap_or_else(|_| unreachable!("sentinel slots reserved"))
        };
        let (t1, t2, b1, b2) = (list(), list(), list(), list());
        Self {
            pool,
            map,
            t1,
            t2,
            b1,
            b2,
            p: 0,
            capacity,
            bypass_sequential,
            detector,
            #[cfg(feature = "metrics")]
            metrics: ArcMetrics::default(),
        }
    }

    /// Replaces the detector consulted by [`admit`](Self::admit).
    pub fn set_detector(&mut self, detector: Box<dyn SequentialDetector + Send>) {
        self.detector = detector;
    }

    pub fn set_bypass_sequential(&mut self, enabled: bool) {
        self.bypass_sequential = enabled;
    }

    pub fn bypass_sequential(&self) -> bool {
        self.bypass_sequential
    }

    /// Target size of T1. Higher values favor recency, lower values favor
    /// frequency.
    pub fn p_value(&self) -> usize {
        self.p
    }

    pub fn t1_len(&self) -> usize {
        self.t1.len()
    }

    pub fn t2_len(&self) -> usize {
        self.t2.len()
    }

    pub fn b1_len(&self) -> usize {
        self.b1.len()
    }

    pub fn b2_len(&self) -> usize {
        self.b2.len()
    }

    /// Resident plus ghost keys.
    pub fn directory_len(&self) -> usize {
        self.t1.len() + self.t2.len() + self.b1.len() + self.b2.len()
    }

    /// List holding `key`, including ghost lists.
    pub fn queue_of(&self, key: u64) -> Option<QueueKind> {
        let idx = self.map.get(key)?;
        self.pool.get(idx).map(|entry| entry.queue)
    }

    /// Resident keys, T1 (MRU to LRU) then T2 (MRU to LRU).
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.t1
            .iter(&self.pool)
            .chain(self.t2.iter(&self.pool))
            .map(|(_, entry)| entry.key)
    }

    /// Reads a resident payload without touching recency.
    pub fn peek(&self, key: u64) -> Option<&V> {
        let idx = self.map.get(key)?;
        self.pool.get(idx)?.payload.as_ref()
    }

    /// Stores `payload` unless the configured detector reports the access
    /// at `(offset, length)` as part of a sequential stream and bypass is
    /// enabled; then the payload is returned as [`Insertion::Bypassed`] and
    /// any cached copy of `key` is left as it was.
    ///
    /// The detector observes every access, including bypassed ones.
    pub fn admit(
        &mut self,
        key: u64,
        payload: V,
        offset: u64,
        length: u32,
    ) -> Result<Insertion<V>, CacheError> {
        let sequential = self.detector.is_sequential(offset, length);
        if sequential && self.bypass_sequential {
            #[cfg(feature = "metrics")]
            self.metrics.record_bypass();
            tracing::trace!(key, offset, length, "sequential access bypassed admission");
            return Ok(Insertion::Bypassed(payload));
        }
        self.put(key, payload)
    }

    fn entry_mut(&mut self, idx: SlotIndex) -> Result<&mut CacheEntry<V>, CacheError> {
        self.pool
            .get_mut(idx)
            .ok_or(CacheError::InvalidIndex(idx.as_u32()))
    }

    fn queue_at(&self, idx: SlotIndex) -> Result<QueueKind, CacheError> {
        self.pool
            .get(idx)
            .map(|entry| entry.queue)
            .ok_or(CacheError::InvalidIndex(idx.as_u32()))
    }

    /// Moves a resident entry to T2 MRU.
    fn promote(&mut self, idx: SlotIndex, queue: QueueKind) -> Result<(), CacheError> {
        match queue {
            QueueKind::T1 => {
                self.t2.adopt_mru(&mut self.pool, &mut self.t1, idx)?;
                self.entry_mut(idx)?.queue = QueueKind::T2;
                #[cfg(feature = "metrics")]
                self.metrics.record_t1_to_t2_promotion();
            },
            QueueKind::T2 => self.t2.move_to_mru(&mut self.pool, idx)?,
            _ => return Err(CacheError::InvalidIndex(idx.as_u32())),
        }
        Ok(())
    }

    fn adapt(&mut self, hit: QueueKind) {
        let (b1, b2) = (self.b1.len(), self.b2.len());
        match hit {
            QueueKind::B1 => {
                let delta = (b2 / b1.max(1)).max(1);
                self.p = (self.p + delta).min(self.capacity);
                #[cfg(feature = "metrics")]
                self.metrics.record_p_increase();
            },
            QueueKind::B2 => {
                let delta = (b1 / b2.max(1)).max(1);
                self.p = self.p.saturating_sub(delta);
                #[cfg(feature = "metrics")]
                self.metrics.record_p_decrease();
            },
            _ => {},
        }
    }

    /// Demotes one resident entry to its ghost list when the cache is full,
    /// returning the released payload.
    fn replace(&mut self, hit_in_b2: bool) -> Result<Option<(u64, V)>, CacheError> {
        if self.t1.len() + self.t2.len() < self.capacity {
            return Ok(None);
        }
        self.demote(hit_in_b2)
    }

    /// Demotes one resident entry to its ghost list even when the cache is
    /// not full, using the same T1/T2 choice as a regular eviction.
    ///
    /// Lets an owner of external payload storage reclaim space. Returns
    /// `None` when nothing is resident.
    pub fn evict_one(&mut self) -> Result<Option<(u64, V)>, CacheError> {
        self.demote(false)
    }

    fn demote(&mut self, hit_in_b2: bool) -> Result<Option<(u64, V)>, CacheError> {
        let t1_len = self.t1.len();
        let from_t1 = (t1_len >= 1 && (t1_len > self.p || (hit_in_b2 && t1_len == self.p)))
            || self.t2.is_empty();

        let idx = if from_t1 {
            let Some(idx) = self.t1.lru(&self.pool) else {
                return Ok(None);
            };
            self.b1.adopt_mru(&mut self.pool, &mut self.t1, idx)?;
            #[cfg(feature = "metrics")]
            self.metrics.record_t1_eviction();
            idx
        } else {
            let Some(idx) = self.t2.lru(&self.pool) else {
                return Ok(None);
            };
            self.b2.adopt_mru(&mut self.pool, &mut self.t2, idx)?;
            #[cfg(feature = "metrics")]
            self.metrics.record_t2_eviction();
            idx
        };

        let entry = self.entry_mut(idx)?;
        entry.queue = if from_t1 { QueueKind::B1 } else { QueueKind::B2 };
        let evicted = entry.payload.take().map(|value| (entry.key, value));
        #[cfg(feature = "metrics")]
        {
            self.metrics.record_evict_call();
            if evicted.is_some() {
                self.metrics.record_evicted_entry();
            }
        }
        Ok(evicted)
    }

    fn drop_ghost_lru(&mut self, queue: QueueKind) {
        let list = match queue {
            QueueKind::B1 => &mut self.b1,
            QueueKind::B2 => &mut self.b2,
            _ => return,
        };
        if let Some((_, entry)) = list.pop_lru(&mut self.pool) {
            self.map.remove(entry.key);
        }
    }

    fn ghost_hit(
        &mut self,
        idx: SlotIndex,
        queue: QueueKind,
        payload: V,
    ) -> Result<Insertion<V>, CacheError> {
        #[cfg(feature = "metrics")]
        match queue {
            QueueKind::B1 => self.metrics.record_b1_ghost_hit(),
            _ => self.metrics.record_b2_ghost_hit(),
        }
        self.adapt(queue);
        let evicted = self.replace(queue == QueueKind::B2)?;

        match queue {
            QueueKind::B1 => self.t2.adopt_mru(&mut self.pool, &mut self.b1, idx)?,
            _ => self.t2.adopt_mru(&mut self.pool, &mut self.b2, idx)?,
        }
        let entry = self.entry_mut(idx)?;
        entry.queue = QueueKind::T2;
        entry.payload = Some(payload);

        #[cfg(feature = "metrics")]
        self.metrics.record_insert_new();
        Ok(match evicted {
            Some((key, value)) => Insertion::Evicted { key, value },
            None => Insertion::Inserted,
        })
    }

    fn miss(&mut self, key: u64, payload: V) -> Result<Insertion<V>, CacheError> {
        let c = self.capacity;
        let mut evicted = None;

        if self.t1.len() + self.b1.len() >= c {
            if self.t1.len() < c {
                self.drop_ghost_lru(QueueKind::B1);
                evicted = self.replace(false)?;
            } else if let Some((_, entry)) = self.t1.pop_lru(&mut self.pool) {
                self.map.remove(entry.key);
                #[cfg(feature = "metrics")]
                {
                    self.metrics.record_evict_call();
                    self.metrics.record_evicted_entry();
                    self.metrics.record_t1_eviction();
                }
                evicted = entry.payload.map(|value| (entry.key, value));
            }
        } else if self.directory_len() >= c {
            if self.directory_len() >= 2 * c {
                self.drop_ghost_lru(QueueKind::B2);
            }
            evicted = self.replace(false)?;
        }

        let entry = CacheEntry {
            key,
            queue: QueueKind::T1,
            payload: Some(payload),
        };
        let idx = match self.t1.push_mru(&mut self.pool, entry) {
            Ok(idx) => idx,
            Err(err) => {
                debug_assert!(false, "arc slot pool exhausted: {err}");
                return Err(err);
            },
        };
        self.map.put(key, idx);

        #[cfg(feature = "metrics")]
        self.metrics.record_insert_new();
        Ok(match evicted {
            Some((key, value)) => Insertion::Evicted { key, value },
            None => Insertion::Inserted,
        })
    }

    /// Checks list bounds, `p`, list integrity and map/list agreement.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let c = self.capacity;
        let (t1, t2, b1, b2) = (self.t1.len(), self.t2.len(), self.b1.len(), self.b2.len());
        if t1 + t2 > c {
            return Err(InvariantError::new(format!(
                "resident entries ({}) exceed capacity ({c})",
                t1 + t2
            )));
        }
        if t1 + b1 > c {
            return Err(InvariantError::new(format!(
                "|T1| + |B1| ({}) exceeds capacity ({c})",
                t1 + b1
            )));
        }
        if t1 + t2 + b1 + b2 > 2 * c {
            return Err(InvariantError::new(format!(
                "directory ({}) exceeds 2 * capacity ({})",
                t1 + t2 + b1 + b2,
                2 * c
            )));
        }
        if self.p > c {
            return Err(InvariantError::new(format!(
                "p ({}) exceeds capacity ({c})",
                self.p
            )));
        }

        let lists = [
            (&self.t1, QueueKind::T1),
            (&self.t2, QueueKind::T2),
            (&self.b1, QueueKind::B1),
            (&self.b2, QueueKind::B2),
        ];
        for (list, kind) in lists {
            list.check_invariants(&self.pool)?;
            for (idx, entry) in list.iter(&self.pool) {
                if entry.queue != kind {
                    return Err(InvariantError::new(format!(
                        "key {} in {kind:?} is tagged {:?}",
                        entry.key, entry.queue
                    )));
                }
                if entry.payload.is_some() == kind.is_ghost() {
                    return Err(InvariantError::new(format!(
                        "key {} in {kind:?} has wrong payload presence",
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
        }

        let directory = t1 + t2 + b1 + b2;
        if self.map.len() != directory || self.pool.len() != directory {
            return Err(InvariantError::new(format!(
                "map ({}) and pool ({}) disagree with directory ({directory})",
                self.map.len(),
                self.pool.len()
            )));
        }
        Ok(())
    }

    /// Panics if any invariant is violated.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("{err}");
        }
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> ArcMetricsSnapshot {
        ArcMetricsSnapshot {
            get_calls: self.metrics.get_calls,
            get_hits: self.metrics.get_hits,
            get_misses: self.metrics.get_misses,
            insert_calls: self.metrics.insert_calls,
            insert_updates: self.metrics.insert_updates,
            insert_new: self.metrics.insert_new,
            evict_calls: self.metrics.evict_calls,
            evicted_entries: self.metrics.evicted_entries,
            t1_to_t2_promotions: self.metrics.t1_to_t2_promotions,
            b1_ghost_hits: self.metrics.b1_ghost_hits,
            b2_ghost_hits: self.metrics.b2_ghost_hits,
            p_increases: self.metrics.p_increases,
            p_decreases: self.metrics.p_decreases,
            t1_evictions: self.metrics.t1_evictions,
            t2_evictions: self.metrics.t2_evictions,
            bypasses: self.metrics.bypasses,
            cache_len: self.len(),
            ghost_len: self.b1.len() + self.b2.len(),
            p: self.p,
            capacity: self.capacity,
        }
    }
}

#[cfg(feature = "metrics")]
impl<V> MetricsSnapshotProvider<ArcMetricsSnapshot> for ArcCache<V> {
    fn snapshot(&self) -> ArcMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<V> fmt::Debug for ArcCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcCache")
            .field("capacity", &self.capacity)
            .field("t1_len", &self.t1.len())
            .field("t2_len", &self.t2.len())
            .field("b1_len", &self.b1.len())
            .field("b2_len", &self.b2.len())
            .field("p", &self.p)
            .field("bypass_sequential", &self.bypass_sequential)
            .finish()
    }
}

impl<V> ReadOnlyCache for ArcCache<V> {
    fn contains(&self, key: u64) -> bool {
        matches!(self.queue_of(key), Some(QueueKind::T1 | QueueKind::T2))
    }

    fn len(&self) -> usize {
        self.t1.len() + self.t2.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V> CoreCache<V> for ArcCache<V> {
    fn get(&mut self, key: u64) -> Option<&V> {
        let resident = self
            .map
            .get(key)
            .and_then(|idx| self.queue_at(idx).ok().map(|queue| (idx, queue)))
            .filter(|(_, queue)| !queue.is_ghost());
        let Some((idx, queue)) = resident else {
            #[cfg(feature = "metrics")]
            self.metrics.record_get_miss();
            return None;
        };
        if let Err(err) = self.promote(idx, queue) {
            debug_assert!(false, "arc promote failed: {err}");
            return None;
        }
        #[cfg(feature = "metrics")]
        self.metrics.record_get_hit();
        self.pool.get(idx)?.payload.as_ref()
    }

    fn put(&mut self, key: u64, payload: V) -> Result<Insertion<V>, CacheError> {
        #[cfg(feature = "metrics")]
        self.metrics.record_insert_call();
        if self.capacity == 0 {
            return Ok(Insertion::Bypassed(payload));
        }

        let Some(idx) = self.map.get(key) else {
            return self.miss(key, payload);
        };
        match self.queue_at(idx)? {
            queue @ (QueueKind::T1 | QueueKind::T2) => {
                self.promote(idx, queue)?;
                let entry = self.entry_mut(idx)?;
                let old = entry.payload.replace(payload);
                #[cfg(feature = "metrics")]
                self.metrics.record_insert_update();
                Ok(match old {
                    Some(old) => Insertion::Replaced(old),
                    None => Insertion::Inserted,
                })
            },
            queue @ (QueueKind::B1 | QueueKind::B2) => self.ghost_hit(idx, queue, payload),
            QueueKind::Lru => Err(CacheError::InvalidIndex(idx.as_u32())),
        }
    }

    fn invalidate(&mut self, key: u64) -> Option<V> {
        let idx = self.map.remove(key)?;
        let queue = self.pool.get(idx)?.queue;
        let list = match queue {
            QueueKind::T1 => &mut self.t1,
            QueueKind::T2 => &mut self.t2,
            QueueKind::B1 => &mut self.b1,
            QueueKind::B2 => &mut self.b2,
            QueueKind::Lru => return None,
        };
        match list.remove(&mut self.pool, idx) {
            Ok(entry) => entry.payload,
            Err(err) => {
                debug_assert!(false, "arc invalidate failed: {err}");
                None
            },
        }
    }

    fn clear(&mut self) {
        self.t1.clear(&mut self.pool);
        self.t2.clear(&mut self.pool);
        self.b1.clear(&mut self.pool);
        self.b2.clear(&mut self.pool);
        self.map.clear();
        self.p = 0;
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }
}

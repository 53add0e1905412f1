//! Array-indexed doubly linked list threaded through a shared [`SlotPool`].
//!
//! Each list owns two sentinel slots (head and tail) in the pool, so every
//! real node always has a valid `prev` and `next` and linking never
//! branches on emptiness. Many lists may share one pool: the ARC engine
//! threads T1, T2, B1 and B2 through a single pool and moves nodes between
//! them without touching the stored value.
//!
//! ## Architecture
//!
//! ```text
//!   pool (SlotPool<T>)                         list A          list B
//!   ┌─────┬───────────┬──────┬──────┬───────┐  head=0 tail=1   head=2 tail=3
//!   │ idx │ state     │ prev │ next │ owner │
//!   ├─────┼───────────┼──────┼──────┼───────┤
//!   │  0  │ Sentinel  │  NIL │   4  │   0   │  [0] ◄─► [4] ◄─► [5] ◄─► [1]
//!   │  1  │ Sentinel  │   5  │  NIL │   0   │       MRU          LRU
//!   │  2  │ Sentinel  │  NIL │   3  │   2   │
//!   │  3  │ Sentinel  │   2  │  NIL │   2   │  [2] ◄─────────────────► [3]
//!   │  4  │ Occupied  │   0  │   5  │   0   │       (empty)
//!   │  5  │ Occupied  │   4  │   1  │   0   │
//!   └─────┴───────────┴──────┴──────┴───────┘
//! ```
//!
//! A node's `owner` is the head sentinel index of the list it belongs to,
//! which makes membership checks O(1).
//!
//! ## Operations
//! - `push_mru` / `push_lru`: allocate a slot and link it at an end
//! - `pop_mru` / `pop_lru`: unlink an end and release its slot
//! - `remove(index)`: unlink and release an interior node
//! - `move_to_mru(index)`: reposition within the list
//! - `adopt_mru(from, index)`: move a node from another list, keeping its index
//!
//! All of the above are O(1) and allocation-free; `iter` is O(n).
//!
//! `debug_validate_invariants()` is available in debug/test builds.

use crate::ds::slot_pool::{NIL, SlotIndex, SlotPool};
use crate::error::{CacheError, InvariantError};

/// Doubly linked list of pool slots, ordered MRU (head) to LRU (tail).
///
/// # Example
///
/// ```
/// use blockcache::ds::{EvictionList, SlotPool};
///
/// let mut pool = SlotPool::new(4, 2);
/// let mut list = EvictionList::new(&mut pool).unwrap();
///
/// let a = list.push_mru(&mut pool, "a").unwrap();
/// list.push_mru(&mut pool, "b").unwrap();
/// list.push_lru(&mut pool, "z").unwrap();
///
/// assert_eq!(list.remove(&mut pool, a).unwrap(), "a");
/// let order: Vec<_> = list.iter(&pool).map(|(_, v)| *v).collect();
/// assert_eq!(order, ["b", "z"]);
/// assert_eq!(list.pop_lru(&mut pool).map(|(_, v)| v), Some("z"));
/// ```
#[derive(Debug)]
pub struct EvictionList {
    head: u32,
    tail: u32,
    len: usize,
}

impl EvictionList {
    /// Creates an empty list, taking two sentinel slots from `pool`.
    pub fn new<T>(pool: &mut SlotPool<T>) -> Result<Self, CacheError> {
        let head = pool.allocate_sentinel(NIL)?;
        let tail = pool.allocate_sentinel(head)?;
        pool.set_next(head, tail);
        pool.set_prev(tail, head);
        Ok(Self { head, tail, len: 0 })
    }

    /// Identity of this list within its pool (the head sentinel index).
    #[inline]
    pub fn id(&self) -> u32 {
        self.head
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `index` is a live node of this list.
    #[inline]
    pub fn contains<T>(&self, pool: &SlotPool<T>, index: SlotIndex) -> bool {
        pool.contains(index) && pool.owner(index.0) == Some(self.head)
    }

    /// Index of the most recently used node.
    pub fn mru<T>(&self, pool: &SlotPool<T>) -> Option<SlotIndex> {
        let idx = pool.next(self.head);
        (idx != self.tail).then_some(SlotIndex(idx))
    }

    /// Index of the least recently used node.
    pub fn lru<T>(&self, pool: &SlotPool<T>) -> Option<SlotIndex> {
        let idx = pool.prev(self.tail);
        (idx != self.head).then_some(SlotIndex(idx))
    }

    /// Stores `value` in a fresh slot linked at the MRU end.
    pub fn push_mru<T>(&mut self, pool: &mut SlotPool<T>, value: T) -> Result<SlotIndex, CacheError> {
        let index = pool.allocate(value)?;
        self.attach_after(pool, self.head, index.0);
        Ok(index)
    }

    /// Stores `value` in a fresh slot linked at the LRU end.
    pub fn push_lru<T>(&mut self, pool: &mut SlotPool<T>, value: T) -> Result<SlotIndex, CacheError> {
        let index = pool.allocate(value)?;
        let before = pool.prev(self.tail);
        self.attach_after(pool, before, index.0);
        Ok(index)
    }

    /// Unlinks the MRU node and releases its slot.
    pub fn pop_mru<T>(&mut self, pool: &mut SlotPool<T>) -> Option<(SlotIndex, T)> {
        let index = self.mru(pool)?;
        self.detach(pool, index.0);
        pool.release(index).ok().map(|value| (index, value))
    }

    /// Unlinks the LRU node and releases its slot.
    pub fn pop_lru<T>(&mut self, pool: &mut SlotPool<T>) -> Option<(SlotIndex, T)> {
        let index = self.lru(pool)?;
        self.detach(pool, index.0);
        pool.release(index).ok().map(|value| (index, value))
    }

    /// Unlinks `index` from this list and releases its slot.
    pub fn remove<T>(&mut self, pool: &mut SlotPool<T>, index: SlotIndex) -> Result<T, CacheError> {
        if !self.contains(pool, index) {
            return Err(CacheError::InvalidIndex(index.0));
        }
        self.detach(pool, index.0);
        pool.release(index)
    }

    /// Moves `index` to the MRU end of this list.
    pub fn move_to_mru<T>(&mut self, pool: &mut SlotPool<T>, index: SlotIndex) -> Result<(), CacheError> {
        if !self.contains(pool, index) {
            return Err(CacheError::InvalidIndex(index.0));
        }
        if pool.next(self.head) != index.0 {
            self.detach(pool, index.0);
            self.attach_after(pool, self.head, index.0);
        }
        Ok(())
    }

    /// Moves `index` from `from` to the MRU end of this list. The slot and its
    /// value are untouched.
    pub fn adopt_mru<T>(
        &mut self,
        pool: &mut SlotPool<T>,
        from: &mut EvictionList,
        index: SlotIndex,
    ) -> Result<(), CacheError> {
        if !from.contains(pool, index) {
            return Err(CacheError::InvalidIndex(index.0));
        }
        from.detach(pool, index.0);
        self.attach_after(pool, self.head, index.0);
        Ok(())
    }

    /// Releases every node of the list, keeping the sentinels.
    pub fn clear<T>(&mut self, pool: &mut SlotPool<T>) {
        while self.pop_lru(pool).is_some() {}
    }

    /// Iterates `(index, &value)` from MRU to LRU.
    pub fn iter<'a, T>(&self, pool: &'a SlotPool<T>) -> EvictionListIter<'a, T> {
        EvictionListIter {
            pool,
            current: pool.next(self.head),
            tail: self.tail,
            remaining: self.len,
        }
    }

    fn attach_after<T>(&mut self, pool: &mut SlotPool<T>, after: u32, idx: u32) {
        let next = pool.next(after);
        pool.set_prev(idx, after);
        pool.set_next(idx, next);
        pool.set_next(after, idx);
        pool.set_prev(next, idx);
        pool.set_owner(idx, self.head);
        self.len += 1;
    }

    fn detach<T>(&mut self, pool: &mut SlotPool<T>, idx: u32) {
        let prev = pool.prev(idx);
        let next = pool.next(idx);
        pool.set_next(prev, next);
        pool.set_prev(next, prev);
        pool.set_prev(idx, NIL);
        pool.set_next(idx, NIL);
        pool.set_owner(idx, NIL);
        self.len -= 1;
    }

    /// Walks the list and checks link symmetry, ownership and length.
    pub fn check_invariants<T>(&self, pool: &SlotPool<T>) -> Result<(), InvariantError> {
        if !pool.is_sentinel(self.head) || !pool.is_sentinel(self.tail) {
            return Err(InvariantError::new("list sentinels are not sentinel slots"));
        }
        if pool.prev(self.head) != NIL || pool.next(self.tail) != NIL {
            return Err(InvariantError::new("sentinel has an outer link"));
        }

        let mut count = 0usize;
        let mut prev = self.head;
        let mut current = pool.next(self.head);
        while current != self.tail {
            if current == NIL || count > self.len {
                return Err(InvariantError::new(format!(
                    "list {} is broken after {count} nodes",
                    self.head
                )));
            }
            if !pool.contains(SlotIndex(current)) {
                return Err(InvariantError::new(format!("node {current} is not occupied")));
            }
            if pool.owner(current) != Some(self.head) {
                return Err(InvariantError::new(format!(
                    "node {current} is owned by {:?}, expected {}",
                    pool.owner(current),
                    self.head
                )));
            }
            if pool.prev(current) != prev {
                return Err(InvariantError::new(format!("node {current} has a stale prev link")));
            }
            prev = current;
            current = pool.next(current);
            count += 1;
        }
        if pool.prev(self.tail) != prev {
            return Err(InvariantError::new("tail sentinel has a stale prev link"));
        }
        if count != self.len {
            return Err(InvariantError::new(format!(
                "list length {} does not match {count} linked nodes",
                self.len
            )));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants<T>(&self, pool: &SlotPool<T>) {
        if let Err(err) = self.check_invariants(pool) {
            panic!("{err}");
        }
    }
}

/// Iterator over `(SlotIndex, &T)` from MRU to LRU.
pub struct EvictionListIter<'a, T> {
    pool: &'a SlotPool<T>,
    current: u32,
    tail: u32,
    remaining: usize,
}

impl<'a, T> Iterator for EvictionListIter<'a, T> {
    type Item = (SlotIndex, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.tail || self.remaining == 0 {
            return None;
        }
        let index = SlotIndex(self.current);
        let value = self.pool.get(index)?;
        self.current = self.pool.next(self.current);
        self.remaining -= 1;
        Some((index, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}


#[cfg(test)]
mod property_tests {
    use std::collections::VecDeque;

    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        PushMru(u16),
        PushLru(u16),
        PopMru,
        PopLru,
        RemoveAt(usize),
        TouchAt(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<u16>().prop_map(Op::PushMru),
            any::<u16>().prop_map(Op::PushLru),
            Just(Op::PopMru),
            Just(Op::PopLru),
            any::<usize>().prop_map(Op::RemoveAt),
            any::<usize>().prop_map(Op::TouchAt),
        ]
    }

    proptest! {
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_matches_reference_deque(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut pool = SlotPool::new(64, 2);
            let mut list = EvictionList::new(&mut pool).unwrap();
            let mut model: VecDeque<(SlotIndex, u16)> = VecDeque::new();

            for op in ops {
                match op {
                    Op::PushMru(v) => {
                        if let Ok(idx) = list.push_mru(&mut pool, v) {
                            model.push_front((idx, v));
                        } else {
                            prop_assert_eq!(model.len(), 64);
                        }
                    },
                    Op::PushLru(v) => {
                        if let Ok(idx) = list.push_lru(&mut pool, v) {
                            model.push_back((idx, v));
                        } else {
                            prop_assert_eq!(model.len(), 64);
                        }
                    },
                    Op::PopMru => {
                        prop_assert_eq!(list.pop_mru(&mut pool), model.pop_front());
                    },
                    Op::PopLru => {
                        prop_assert_eq!(list.pop_lru(&mut pool), model.pop_back());
                    },
                    Op::RemoveAt(i) => {
                        if !model.is_empty() {
                            let (idx, v) = model.remove(i % model.len()).unwrap();
                            prop_assert_eq!(list.remove(&mut pool, idx), Ok(v));
                        }
                    },
                    Op::TouchAt(i) => {
                        if !model.is_empty() {
                            let entry = model.remove(i % model.len()).unwrap();
                            list.move_to_mru(&mut pool, entry.0).unwrap();
                            model.push_front(entry);
                        }
                    },
                }
                prop_assert_eq!(list.len(), model.len());
            }

            list.debug_validate_invariants(&pool);
            let seen: Vec<_> = list.iter(&pool).map(|(i, v)| (i, *v)).collect();
            let expected: Vec<_> = model.iter().copied().collect();
            prop_assert_eq!(seen, expected);

            while let Some(entry) = list.pop_lru(&mut pool) {
                prop_assert_eq!(Some(entry), model.pop_back());
            }
            prop_assert!(model.is_empty());
        }
    }
}

//! Fixed-capacity pool of slot indices with embedded list links.
//!
//! A `SlotPool` preallocates `capacity + reserved` slots at construction and
//! never grows. Every slot carries `prev`/`next` indices and the id of the
//! list that owns it, so several [`EvictionList`](crate::ds::EvictionList)s
//! can thread nodes through one pool without pointers or per-node
//! allocation.
//!
//! ## Architecture
//!
//! ```text
//!   slots: Vec<Slot<T>>                         free: Vec<u32> (LIFO, data)
//!   ┌─────┬──────────────┬──────┬──────┬───────┐  ┌───┬───┬───┐
//!   │ idx │ state        │ prev │ next │ owner │  │ 7 │ 6 │ 5 │ ◄─ pop
//!   ├─────┼──────────────┼──────┼──────┼───────┤  └───┴───┴───┘
//!   │  0  │ Sentinel     │  NIL │   1  │   0   │
//!   │  1  │ Sentinel     │   0  │   2  │   0   │   list 0: [0] ◄──► [2] ◄──► [1]
//!   │  2  │ Occupied(v)  │   0  │   1  │   0   │
//!   │ ... │ Vacant       │  NIL │  NIL │  NIL  │
//!   └─────┴──────────────┴──────┴──────┴───────┘
//! ```
//!
//! The first `reserved` indices form a separate sentinel range with its own
//! free stack. Data never takes an index from that range, so lists can be
//! created after the data slots are full, and the low indices of a pool are
//! never live entries. At most `capacity` data slots are occupied at once.
//!
//! ## Performance
//! - `allocate` / `release`: O(1), no allocation after construction
//! - `get` / `get_mut` / `contains`: O(1)

use crate::error::CacheError;

/// Marker for "no index" in link fields.
pub(crate) const NIL: u32 = u32::MAX;

/// Largest number of slots a pool can address; `NIL` is never an index.
const MAX_SLOTS: usize = NIL as usize;

/// Index of a slot in a [`SlotPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub(crate) u32);

impl SlotIndex {
    /// Returns the raw position of the slot.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the index as stored in the pool.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
enum SlotState<T> {
    Vacant,
    Sentinel,
    Occupied(T),
}

#[derive(Debug)]
struct Slot<T> {
    state: SlotState<T>,
    prev: u32,
    next: u32,
    owner: u32,
}

impl<T> Slot<T> {
    fn vacant() -> Self {
        Self {
            state: SlotState::Vacant,
            prev: NIL,
            next: NIL,
            owner: NIL,
        }
    }
}

/// Fixed-capacity pool of slot indices.
///
/// # Example
///
/// ```
/// use blockcache::ds::SlotPool;
///
/// let mut pool = SlotPool::new(2, 0);
/// let a = pool.allocate("a").unwrap();
/// let b = pool.allocate("b").unwrap();
/// assert!(pool.allocate("c").is_err());
///
/// assert_eq!(pool.release(a).unwrap(), "a");
/// let c = pool.allocate("c").unwrap();
/// assert_eq!(c, a); // released indices are reused first
/// assert_eq!(pool.get(b), Some(&"b"));
/// ```
#[derive(Debug)]
pub struct SlotPool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    sentinel_free: Vec<u32>,
    capacity: usize,
    reserved: usize,
    len: usize,
    sentinels: usize,
}

impl<T> SlotPool<T> {
    /// Creates a pool with `capacity` data slots plus `reserved` slots for
    /// list sentinels. Sentinels occupy indices `0..reserved`; data slots
    /// follow.
    ///
    /// Sizes beyond the `u32` index space are clamped so that every slot
    /// stays addressable.
    pub fn new(capacity: usize, reserved: usize) -> Self {
        let (capacity, reserved) = clamp_sizes(capacity, reserved);
        let total = capacity + reserved;
        let mut slots = Vec::with_capacity(total);
        slots.resize_with(total, Slot::vacant);
        // Reverse order so the first pop yields the lowest index of each range.
        let sentinel_free = (0..reserved as u32).rev().collect();
        let free = (reserved as u32..total as u32).rev().collect();
        Self {
            slots,
            free,
            sentinel_free,
            capacity,
            reserved,
            len: 0,
            sentinels: 0,
        }
    }

    /// Number of data slots the pool was sized for.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots reserved for sentinels.
    #[inline]
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Total number of slots, data and reserved.
    #[inline]
    pub fn total_slots(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied data slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of data slots that can still be issued.
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of sentinel slots handed out.
    #[inline]
    pub fn sentinel_count(&self) -> usize {
        self.sentinels
    }

    /// Takes a free data index and stores `value` in it.
    ///
    /// Fails with [`CacheError::SlotPoolExhausted`] once `capacity` slots
    /// are occupied.
    pub fn allocate(&mut self, value: T) -> Result<SlotIndex, CacheError> {
        let idx = self.free.pop().ok_or(CacheError::SlotPoolExhausted {
            capacity: self.capacity,
        })?;
        let slot = &mut self.slots[idx as usize];
        slot.state = SlotState::Occupied(value);
        self.len += 1;
        Ok(SlotIndex(idx))
    }

    /// Takes a free index for a list sentinel owned by `owner`.
    ///
    /// `owner` of [`NIL`] means "owned by the sentinel itself".
    pub(crate) fn allocate_sentinel(&mut self, owner: u32) -> Result<u32, CacheError> {
        let idx = self.sentinel_free.pop().ok_or(CacheError::SlotPoolExhausted {
            capacity: self.reserved,
        })?;
        let slot = &mut self.slots[idx as usize];
        slot.state = SlotState::Sentinel;
        slot.owner = if owner == NIL { idx } else { owner };
        self.sentinels += 1;
        Ok(idx)
    }

    /// Returns an occupied slot to the pool and yields its value.
    ///
    /// The caller is responsible for having unlinked the slot from any list.
    pub fn release(&mut self, index: SlotIndex) -> Result<T, CacheError> {
        let slot = self
            .slots
            .get_mut(index.index())
            .ok_or(CacheError::InvalidIndex(index.0))?;
        match std::mem::replace(&mut slot.state, SlotState::Vacant) {
            SlotState::Occupied(value) => {
                slot.prev = NIL;
                slot.next = NIL;
                slot.owner = NIL;
                self.free.push(index.0);
                self.len -= 1;
                Ok(value)
            },
            other => {
                slot.state = other;
                Err(CacheError::InvalidIndex(index.0))
            },
        }
    }

    /// Returns `true` if `index` holds a value.
    #[inline]
    pub fn contains(&self, index: SlotIndex) -> bool {
        matches!(
            self.slots.get(index.index()).map(|slot| &slot.state),
            Some(SlotState::Occupied(_))
        )
    }

    pub fn get(&self, index: SlotIndex) -> Option<&T> {
        match &self.slots.get(index.index())?.state {
            SlotState::Occupied(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, index: SlotIndex) -> Option<&mut T> {
        match &mut self.slots.get_mut(index.index())?.state {
            SlotState::Occupied(value) => Some(value),
            _ => None,
        }
    }

    /// Owner list id of an occupied or sentinel slot.
    #[inline]
    pub(crate) fn owner(&self, idx: u32) -> Option<u32> {
        let slot = self.slots.get(idx as usize)?;
        match slot.state {
            SlotState::Vacant => None,
            _ if slot.owner == NIL => None,
            _ => Some(slot.owner),
        }
    }

    #[inline]
    pub(crate) fn set_owner(&mut self, idx: u32, owner: u32) {
        self.slots[idx as usize].owner = owner;
    }

    #[inline]
    pub(crate) fn prev(&self, idx: u32) -> u32 {
        self.slots[idx as usize].prev
    }

    #[inline]
    pub(crate) fn next(&self, idx: u32) -> u32 {
        self.slots[idx as usize].next
    }

    #[inline]
    pub(crate) fn set_prev(&mut self, idx: u32, prev: u32) {
        self.slots[idx as usize].prev = prev;
    }

    #[inline]
    pub(crate) fn set_next(&mut self, idx: u32, next: u32) {
        self.slots[idx as usize].next = next;
    }

    #[inline]
    pub(crate) fn is_sentinel(&self, idx: u32) -> bool {
        matches!(
            self.slots.get(idx as usize).map(|slot| &slot.state),
            Some(SlotState::Sentinel)
        )
    }
}

fn clamp_sizes(capacity: usize, reserved: usize) -> (usize, usize) {
    let reserved_fit = reserved.min(MAX_SLOTS);
    let capacity_fit = capacity.min(MAX_SLOTS - reserved_fit);
    if (capacity_fit, reserved_fit) != (capacity, reserved) {
        tracing::warn!(
            capacity,
            reserved,
            capacity_fit,
            reserved_fit,
            "slot pool clamped to the u32 index space"
        );
    }
    (capacity_fit, reserved_fit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_until_exhausted() {
        let mut pool = SlotPool::new(3, 0);
        for i in 0..3 {
            let idx = pool.allocate(i).unwrap();
            assert_eq!(idx.index(), i);
        }
        assert_eq!(
            pool.allocate(99),
            Err(CacheError::SlotPoolExhausted { capacity: 3 })
        );
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn release_makes_index_reusable() {
        let mut pool = SlotPool::new(2, 0);
        let a = pool.allocate('a').unwrap();
        let _b = pool.allocate('b').unwrap();
        assert_eq!(pool.release(a), Ok('a'));
        assert!(!pool.contains(a));
        assert_eq!(pool.get(a), None);

        let c = pool.allocate('c').unwrap();
        assert_eq!(c, a);
        assert_eq!(pool.get(c), Some(&'c'));
    }

    #[test]
    fn double_release_is_rejected() {
        let mut pool = SlotPool::new(1, 0);
        let a = pool.allocate(1u8).unwrap();
        pool.release(a).unwrap();
        assert_eq!(pool.release(a), Err(CacheError::InvalidIndex(a.0)));
        assert_eq!(
            pool.release(SlotIndex(42)),
            Err(CacheError::InvalidIndex(42))
        );
    }

    #[test]
    fn sentinels_take_low_indices_and_are_not_data() {
        let mut pool: SlotPool<u64> = SlotPool::new(4, 2);
        let head = pool.allocate_sentinel(NIL).unwrap();
        let tail = pool.allocate_sentinel(head).unwrap();
        assert_eq!((head, tail), (0, 1));
        assert_eq!(pool.owner(tail), Some(head));
        assert_eq!(pool.owner(head), Some(head));
        assert!(pool.is_sentinel(head));
        assert!(!pool.contains(SlotIndex(head)));
        assert_eq!(pool.release(SlotIndex(head)), Err(CacheError::InvalidIndex(0)));
        assert_eq!(pool.sentinel_count(), 2);
        assert_eq!(pool.len(), 0);

        let first = pool.allocate(7).unwrap();
        assert_eq!(first.index(), 2);
    }

    #[test]
    fn data_never_takes_reserved_indices() {
        let mut pool: SlotPool<u32> = SlotPool::new(4, 2);
        let issued: Vec<usize> = (0..4).map(|v| pool.allocate(v).unwrap().index()).collect();
        assert_eq!(issued, vec![2, 3, 4, 5]);
        assert_eq!(
            pool.allocate(4),
            Err(CacheError::SlotPoolExhausted { capacity: 4 })
        );
        assert_eq!(pool.len(), 4);

        let head = pool.allocate_sentinel(NIL).unwrap();
        let tail = pool.allocate_sentinel(head).unwrap();
        assert_eq!((head, tail), (0, 1));
        assert_eq!(
            pool.allocate_sentinel(NIL),
            Err(CacheError::SlotPoolExhausted { capacity: 2 })
        );
    }

    #[test]
    fn oversized_pool_is_clamped_to_index_space() {
        assert_eq!(clamp_sizes(16, 2), (16, 2));
        assert_eq!(clamp_sizes(usize::MAX, 8), (MAX_SLOTS - 8, 8));
        assert_eq!(clamp_sizes(4, usize::MAX), (0, MAX_SLOTS));
        let (capacity, reserved) = clamp_sizes(MAX_SLOTS, 1);
        assert!(capacity + reserved <= MAX_SLOTS);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut pool = SlotPool::new(1, 0);
        let idx = pool.allocate(String::from("x")).unwrap();
        pool.get_mut(idx).unwrap().push('y');
        assert_eq!(pool.get(idx).map(String::as_str), Some("xy"));
    }
}

//! Single-owner TLSF (two-level segregated fit) space allocator.
//!
//! Manages the address range `[base, end)` as an ordered partition of
//! divisions. Free divisions are filed in segregated lists indexed by
//! [`SizeClasses`]; a first-level bitmap and one second-level bitmap per
//! first level give O(1) lookup of the smallest class that can satisfy a
//! request.
//!
//! ## Architecture
//!
//! ```text
//!   fl_bitmap:  0b0000_0110                 (levels 1 and 2 non-empty)
//!   sl_bitmaps: [0, 0b1000, 0b0001, 0, ...]
//!   heads[fl][sl] ─► free division ─► free division ─► None
//!
//!   divisions (side table, keyed by address)
//!   ┌─────────┬────────┬──────┬───────────┐
//!   │ address │ size   │ free │ prev_phys │
//!   ├─────────┼────────┼──────┼───────────┤
//!   │ 0x0000  │ 0x0100 │ no   │ -         │
//!   │ 0x0100  │ 0x0280 │ yes  │ 0x0000    │
//!   │ 0x0380  │ 0x0080 │ no   │ 0x0100    │
//!   └─────────┴────────┴──────┴───────────┘
//!
//!   [0x0000 used][0x0100 ........ free ........][0x0380 used]  end
//! ```
//!
//! Bookkeeping lives outside the managed range, so the full range is
//! usable and the manager can describe file extents as well as memory.
//!
//! ## Operations
//!
//! | Operation      | Time        | Notes                                      |
//! |----------------|-------------|--------------------------------------------|
//! | `allocate`     | O(1)        | Smallest class whose members all fit       |
//! | `try_allocate` | O(1) + list | Falls back to the largest free division    |
//! | `release`      | O(1)        | Merges with free physical neighbours       |
//! | `extend`       | O(1)        | Append at `end` or prepend at `base`       |
//!
//! Not thread-safe; [`SpaceManager`](crate::space::SpaceManager) wraps it in
//! a mutex.

use rustc_hash::FxHashMap;

use crate::config::SpaceConfig;
use crate::error::{InvariantError, SpaceError};
use crate::space::size_class::{FIRST_LEVEL_COUNT, MAX_SECOND_LEVEL_LOG2, MIN_ALIGNMENT, SizeClasses};

#[derive(Debug, Clone, Copy)]
struct Division {
    size: u64,
    free: bool,
    prev_phys: Option<u64>,
    prev_free: Option<u64>,
    next_free: Option<u64>,
}

impl Division {
    fn free(size: u64, prev_phys: Option<u64>) -> Self {
        Self {
            size,
            free: true,
            prev_phys,
            prev_free: None,
            next_free: None,
        }
    }
}

/// Point-in-time view of a space's accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceSnapshot {
    pub base: u64,
    pub end: u64,
    pub free_bytes: u64,
    pub allocated_bytes: u64,
    pub divisions: usize,
    pub free_divisions: usize,
    pub largest_free: u64,
}

/// TLSF allocator over `[base, end)`.
#[derive(Debug)]
pub struct TlsfSpace {
    classes: SizeClasses,
    divisions: FxHashMap<u64, Division>,
    heads: Vec<Option<u64>>,
    fl_bitmap: u64,
    sl_bitmaps: [u64; FIRST_LEVEL_COUNT],
    base: u64,
    end: u64,
    last: u64,
    free_bytes: u64,
    free_divisions: usize,
}

impl TlsfSpace {
    /// Manages `[base, base + size)` with the default alignment and class
    /// resolution.
    pub fn new(base: u64, size: u64) -> Result<Self, SpaceError> {
        Self::with_config(&SpaceConfig {
            base,
            size,
            ..SpaceConfig::default()
        })
    }

    pub fn with_config(config: &SpaceConfig) -> Result<Self, SpaceError> {
        if config.size == 0 {
            return Err(SpaceError::InvalidConfig("size must be > 0"));
        }
        if !config.alignment.is_power_of_two() || config.alignment < MIN_ALIGNMENT {
            return Err(SpaceError::InvalidConfig(
                "alignment must be a power of two >= 4",
            ));
        }
        if !(1..=MAX_SECOND_LEVEL_LOG2).contains(&config.second_level_log2) {
            return Err(SpaceError::InvalidConfig(
                "second_level_log2 must be in 1..=6",
            ));
        }
        let end = config
            .base
            .checked_add(config.size)
            .ok_or(SpaceError::InvalidConfig("base + size overflows"))?;

        let classes = SizeClasses::new(config.alignment, config.second_level_log2);
        let mut space = Self {
            classes,
            divisions: FxHashMap::default(),
            heads: vec![None; FIRST_LEVEL_COUNT * classes.second_level_count()],
            fl_bitmap: 0,
            sl_bitmaps: [0; FIRST_LEVEL_COUNT],
            base: config.base,
            end,
            last: config.base,
            free_bytes: config.size,
            free_divisions: 0,
        };
        space
            .divisions
            .insert(config.base, Division::free(config.size, None));
        space.insert_free(config.base);
        Ok(space)
    }

    #[inline]
    pub fn base(&self) -> u64 {
        self.base
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Total managed bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.end - self.base
    }

    #[inline]
    pub fn alignment(&self) -> u64 {
        self.classes.alignment()
    }

    #[inline]
    pub fn free_bytes(&self) -> u64 {
        self.free_bytes
    }

    #[inline]
    pub fn allocated_bytes(&self) -> u64 {
        self.size() - self.free_bytes
    }

    #[inline]
    pub fn division_count(&self) -> usize {
        self.divisions.len()
    }

    #[inline]
    pub fn free_division_count(&self) -> usize {
        self.free_divisions
    }

    /// Size of the largest free division, 0 if none.
    pub fn largest_free(&self) -> u64 {
        self.highest_class()
            .map(|(fl, sl)| self.largest_in_class(fl, sl).1)
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> SpaceSnapshot {
        SpaceSnapshot {
            base: self.base,
            end: self.end,
            free_bytes: self.free_bytes,
            allocated_bytes: self.allocated_bytes(),
            divisions: self.divisions.len(),
            free_divisions: self.free_divisions,
            largest_free: self.largest_free(),
        }
    }

    /// Usable size of the allocated division starting at `address`. May
    /// exceed the requested size when a remainder was too small to split.
    pub fn accessible_size(&self, address: u64) -> Result<u64, SpaceError> {
        match self.divisions.get(&address) {
            Some(div) if !div.free => Ok(div.size),
            _ => Err(SpaceError::InvalidAddress(address)),
        }
    }

    fn aligned_request(&self, size: u64) -> Result<u64, SpaceError> {
        if size == 0 {
            return Err(SpaceError::InvalidSize(size));
        }
        self.classes
            .align_up(size)
            .ok_or(SpaceError::InvalidSize(size))
    }

    /// Carves a division of at least `size` bytes.
    pub fn allocate(&mut self, size: u64) -> Result<u64, SpaceError> {
        let aligned = self.aligned_request(size)?;
        let address = self
            .pick_fitting(aligned)
            .ok_or(SpaceError::OutOfSpace { requested: aligned })?;
        self.prepare_for_use(address, aligned);
        tracing::trace!(address, size = aligned, "space allocated");
        Ok(address)
    }

    /// Like [`allocate`](Self::allocate), but when no class fits the request
    /// the largest free division is handed out instead, trimmed to the
    /// request if it is bigger. Use [`accessible_size`](Self::accessible_size)
    /// to learn how much was granted.
    pub fn try_allocate(&mut self, size: u64) -> Result<u64, SpaceError> {
        let aligned = self.aligned_request(size)?;
        let address = match self.pick_fitting(aligned) {
            Some(address) => address,
            None => self
                .pick_biggest()
                .ok_or(SpaceError::OutOfSpace { requested: aligned })?,
        };
        self.prepare_for_use(address, aligned);
        tracing::trace!(address, size = aligned, "space allocated (best effort)");
        Ok(address)
    }

    /// Returns an allocated division, merging it with free neighbours.
    pub fn release(&mut self, address: u64) -> Result<(), SpaceError> {
        if address < self.base || address >= self.end {
            return Err(SpaceError::InvalidAddress(address));
        }
        let div = match self.divisions.get_mut(&address) {
            Some(div) if !div.free => div,
            _ => return Err(SpaceError::InvalidAddress(address)),
        };
        div.free = true;
        let size = div.size;
        self.free_bytes += size;
        self.merge_and_file(address);
        tracing::trace!(address, size, "space released");
        Ok(())
    }

    /// Adds `[offset, offset + size)` to the managed range. The new range
    /// must touch the current range at either end, and both `offset` and
    /// `size` must be multiples of the alignment.
    pub fn extend(&mut self, offset: u64, size: u64) -> Result<(), SpaceError> {
        let alignment = self.classes.alignment();
        if size == 0 || size % alignment != 0 {
            return Err(SpaceError::InvalidSize(size));
        }
        if offset % alignment != 0 {
            return Err(SpaceError::InvalidAddress(offset));
        }
        let new_end = offset
            .checked_add(size)
            .ok_or(SpaceError::InvalidSize(size))?;

        if offset == self.end {
            self.divisions
                .insert(offset, Division::free(size, Some(self.last)));
            self.end = new_end;
            self.last = offset;
            self.free_bytes += size;
            self.merge_and_file(offset);
            tracing::info!(offset, size, end = self.end, "space extended behind");
            Ok(())
        } else if new_end == self.base {
            self.divisions.insert(offset, Division::free(size, None));
            if let Some(first) = self.divisions.get_mut(&self.base) {
                first.prev_phys = Some(offset);
            }
            self.base = offset;
            self.free_bytes += size;
            self.merge_and_file(offset);
            tracing::info!(offset, size, base = self.base, "space extended before");
            Ok(())
        } else {
            Err(SpaceError::NonContiguousExtension {
                offset,
                size,
                base: self.base,
                end: self.end,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Free index
    // -----------------------------------------------------------------------

    #[inline]
    fn head_slot(&self, fl: usize, sl: usize) -> usize {
        fl * self.classes.second_level_count() + sl
    }

    fn insert_free(&mut self, address: u64) {
        let Some(size) = self.divisions.get(&address).map(|d| d.size) else {
            return;
        };
        let (fl, sl) = self.classes.mapping(size);
        let slot = self.head_slot(fl, sl);
        let old_head = self.heads[slot];
        if let Some(head) = old_head.and_then(|h| self.divisions.get_mut(&h)) {
            head.prev_free = Some(address);
        }
        if let Some(div) = self.divisions.get_mut(&address) {
            div.prev_free = None;
            div.next_free = old_head;
        }
        self.heads[slot] = Some(address);
        self.fl_bitmap |= 1 << fl;
        self.sl_bitmaps[fl] |= 1 << sl;
        self.free_divisions += 1;
    }

    fn remove_free(&mut self, address: u64) {
        let Some(div) = self.divisions.get_mut(&address) else {
            return;
        };
        let (prev, next, size) = (div.prev_free.take(), div.next_free.take(), div.size);
        if let Some(p) = prev.and_then(|p| self.divisions.get_mut(&p)) {
            p.next_free = next;
        }
        if let Some(n) = next.and_then(|n| self.divisions.get_mut(&n)) {
            n.prev_free = prev;
        }
        if prev.is_none() {
            let (fl, sl) = self.classes.mapping(size);
            let slot = self.head_slot(fl, sl);
            self.heads[slot] = next;
            if next.is_none() {
                self.sl_bitmaps[fl] &= !(1 << sl);
                if self.sl_bitmaps[fl] == 0 {
                    self.fl_bitmap &= !(1 << fl);
                }
            }
        }
        self.free_divisions -= 1;
    }

    /// First non-empty class at or above `(fl, sl)`.
    fn find_class(&self, fl: usize, sl: usize) -> Option<(usize, usize)> {
        let sl_map = self.sl_bitmaps[fl] & (u64::MAX << sl);
        if sl_map != 0 {
            return Some((fl, sl_map.trailing_zeros() as usize));
        }
        let fl_map = self.fl_bitmap & u64::MAX.checked_shl(fl as u32 + 1).unwrap_or(0);
        if fl_map == 0 {
            return None;
        }
        let fl = fl_map.trailing_zeros() as usize;
        Some((fl, self.sl_bitmaps[fl].trailing_zeros() as usize))
    }

    fn highest_class(&self) -> Option<(usize, usize)> {
        if self.fl_bitmap == 0 {
            return None;
        }
        let fl = (u64::BITS - 1 - self.fl_bitmap.leading_zeros()) as usize;
        let sl = (u64::BITS - 1 - self.sl_bitmaps[fl].leading_zeros()) as usize;
        Some((fl, sl))
    }

    fn largest_in_class(&self, fl: usize, sl: usize) -> (Option<u64>, u64) {
        let mut best = (None, 0);
        let mut cursor = self.heads[self.head_slot(fl, sl)];
        while let Some(address) = cursor {
            let Some(div) = self.divisions.get(&address) else {
                break;
            };
            if best.0.is_none() || div.size > best.1 {
                best = (Some(address), div.size);
            }
            cursor = div.next_free;
        }
        best
    }

    fn pick_fitting(&mut self, aligned: u64) -> Option<u64> {
        if aligned > self.free_bytes {
            return None;
        }
        let (fl, sl) = self.classes.search_class(aligned)?;
        let (fl, sl) = self.find_class(fl, sl)?;
        let address = self.heads[self.head_slot(fl, sl)]?;
        self.remove_free(address);
        Some(address)
    }

    fn pick_biggest(&mut self) -> Option<u64> {
        let (fl, sl) = self.highest_class()?;
        let address = self.largest_in_class(fl, sl).0?;
        self.remove_free(address);
        Some(address)
    }

    // -----------------------------------------------------------------------
    // Physical layout
    // -----------------------------------------------------------------------

    /// Marks an unfiled free division as used, splitting off a remainder of
    /// at least one alignment unit.
    fn prepare_for_use(&mut self, address: u64, size: u64) {
        let Some(div) = self.divisions.get(&address).copied() else {
            return;
        };
        let granted = if div.size >= size + self.classes.alignment() {
            let rest = address + size;
            self.divisions
                .insert(rest, Division::free(div.size - size, Some(address)));
            let next = rest + (div.size - size);
            if next < self.end {
                if let Some(n) = self.divisions.get_mut(&next) {
                    n.prev_phys = Some(rest);
                }
            }
            if self.last == address {
                self.last = rest;
            }
            self.insert_free(rest);
            size
        } else {
            div.size
        };
        if let Some(div) = self.divisions.get_mut(&address) {
            div.size = granted;
            div.free = false;
        }
        self.free_bytes -= granted;
    }

    /// Merges the free, unfiled division at `address` with free physical
    /// neighbours and files the result.
    fn merge_and_file(&mut self, address: u64) {
        let mut address = address;
        let prev = self.divisions.get(&address).and_then(|d| d.prev_phys);
        if let Some(prev) = prev {
            if self.divisions.get(&prev).is_some_and(|d| d.free) {
                self.remove_free(prev);
                self.absorb(prev, address);
                address = prev;
            }
        }
        let next = self.divisions.get(&address).map(|d| address + d.size);
        if let Some(next) = next.filter(|n| *n < self.end) {
            if self.divisions.get(&next).is_some_and(|d| d.free) {
                self.remove_free(next);
                self.absorb(address, next);
            }
        }
        self.insert_free(address);
    }

    /// Folds the division at `right` into its physical predecessor `left`.
    fn absorb(&mut self, left: u64, right: u64) {
        let Some(right_div) = self.divisions.remove(&right) else {
            return;
        };
        let merged = match self.divisions.get_mut(&left) {
            Some(left_div) => {
                left_div.size += right_div.size;
                left + left_div.size
            },
            None => return,
        };
        if merged < self.end {
            if let Some(n) = self.divisions.get_mut(&merged) {
                n.prev_phys = Some(left);
            }
        }
        if self.last == right {
            self.last = left;
        }
    }

    // -----------------------------------------------------------------------
    // Invariants
    // -----------------------------------------------------------------------

    /// Checks that divisions partition `[base, end)`, that no two adjacent
    /// divisions are free, and that the free index matches the free
    /// divisions.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut address = self.base;
        let mut prev: Option<u64> = None;
        let mut prev_free = false;
        let mut count = 0usize;
        let mut free_sum = 0u64;
        let mut free_count = 0usize;

        while address < self.end {
            let div = self
                .divisions
                .get(&address)
                .ok_or_else(|| InvariantError::new(format!("gap at {address:#x}")))?;
            if div.size == 0 {
                return Err(InvariantError::new(format!("empty division at {address:#x}")));
            }
            if div.prev_phys != prev {
                return Err(InvariantError::new(format!(
                    "division {address:#x} has prev_phys {:?}, expected {prev:?}",
                    div.prev_phys
                )));
            }
            if div.free && prev_free {
                return Err(InvariantError::new(format!(
                    "adjacent free divisions at {address:#x}"
                )));
            }
            if div.free {
                free_sum += div.size;
                free_count += 1;
            }
            prev_free = div.free;
            prev = Some(address);
            address += div.size;
            count += 1;
        }

        if address != self.end {
            return Err(InvariantError::new(format!(
                "divisions end at {address:#x}, range ends at {:#x}",
                self.end
            )));
        }
        if count != self.divisions.len() {
            return Err(InvariantError::new(format!(
                "{} divisions recorded, {count} reachable",
                self.divisions.len()
            )));
        }
        if prev != Some(self.last) {
            return Err(InvariantError::new("last division pointer is stale"));
        }
        if free_sum != self.free_bytes || free_count != self.free_divisions {
            return Err(InvariantError::new(format!(
                "free accounting {}/{} does not match {free_sum}/{free_count}",
                self.free_bytes, self.free_divisions
            )));
        }

        let sl_count = self.classes.second_level_count();
        let mut listed = 0usize;
        for fl in 0..FIRST_LEVEL_COUNT {
            if ((self.fl_bitmap >> fl) & 1 == 1) != (self.sl_bitmaps[fl] != 0) {
                return Err(InvariantError::new(format!("first-level bit {fl} disagrees")));
            }
            for sl in 0..sl_count {
                let head = self.heads[self.head_slot(fl, sl)];
                if ((self.sl_bitmaps[fl] >> sl) & 1 == 1) != head.is_some() {
                    return Err(InvariantError::new(format!(
                        "second-level bit ({fl}, {sl}) disagrees"
                    )));
                }
                let mut back = None;
                let mut cursor = head;
                while let Some(address) = cursor {
                    let div = self.divisions.get(&address).ok_or_else(|| {
                        InvariantError::new(format!("listed division {address:#x} missing"))
                    })?;
                    if !div.free || self.classes.mapping(div.size) != (fl, sl) {
                        return Err(InvariantError::new(format!(
                            "division {address:#x} filed under wrong class ({fl}, {sl})"
                        )));
                    }
                    if div.prev_free != back {
                        return Err(InvariantError::new(format!(
                            "division {address:#x} has stale prev_free"
                        )));
                    }
                    listed += 1;
                    if listed > free_count {
                        return Err(InvariantError::new("free list cycle"));
                    }
                    back = Some(address);
                    cursor = div.next_free;
                }
            }
        }
        if listed != free_count {
            return Err(InvariantError::new(format!(
                "{listed} divisions filed, {free_count} free"
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(size: u64) -> TlsfSpace {
        TlsfSpace::new(0, size).unwrap()
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(TlsfSpace::new(0, 0).is_err());
        let bad_alignment = SpaceConfig {
            size: 64,
            alignment: 6,
            ..SpaceConfig::default()
        };
        assert!(TlsfSpace::with_config(&bad_alignment).is_err());
        let bad_levels = SpaceConfig {
            size: 64,
            second_level_log2: 7,
            ..SpaceConfig::default()
        };
        assert!(TlsfSpace::with_config(&bad_levels).is_err());
        assert!(TlsfSpace::new(u64::MAX, 2).is_err());
    }

    #[test]
    fn allocate_splits_and_aligns() {
        let mut s = space(1024);
        let a = s.allocate(1).unwrap();
        assert_eq!(a, 0);
        assert_eq!(s.accessible_size(a), Ok(4));
        let b = s.allocate(10).unwrap();
        assert_eq!(b, 4);
        assert_eq!(s.accessible_size(b), Ok(12));
        assert_eq!(s.free_bytes(), 1024 - 16);
        assert_eq!(s.division_count(), 3);
        s.debug_validate_invariants();
    }

    #[test]
    fn zero_size_is_invalid() {
        let mut s = space(64);
        assert_eq!(s.allocate(0), Err(SpaceError::InvalidSize(0)));
        assert_eq!(s.try_allocate(0), Err(SpaceError::InvalidSize(0)));
    }

    #[test]
    fn whole_space_can_be_allocated() {
        let mut s = space(4096);
        let a = s.allocate(4096).unwrap();
        assert_eq!(s.free_bytes(), 0);
        assert!(s.allocate(4).unwrap_err().is_out_of_space());
        s.release(a).unwrap();
        assert_eq!(s.free_bytes(), 4096);
        assert_eq!(s.division_count(), 1);
        s.debug_validate_invariants();
    }

    #[test]
    fn small_remainder_is_not_split() {
        let mut s = space(10);
        let a = s.allocate(8).unwrap();
        // 2 bytes left is below one alignment unit.
        assert_eq!(s.accessible_size(a), Ok(10));
        assert_eq!(s.division_count(), 1);
        s.debug_validate_invariants();
    }

    #[test]
    fn release_merges_both_neighbours() {
        let mut s = space(64);
        let a = s.allocate(16).unwrap();
        let b = s.allocate(16).unwrap();
        let c = s.allocate(16).unwrap();
        let _d = s.allocate(16).unwrap();
        s.release(a).unwrap();
        s.release(c).unwrap();
        assert_eq!(s.free_division_count(), 2);
        s.release(b).unwrap();
        assert_eq!(s.free_division_count(), 1);
        assert_eq!(s.largest_free(), 48);
        s.debug_validate_invariants();
    }

    #[test]
    fn release_rejects_bad_addresses() {
        let mut s = TlsfSpace::new(100, 64).unwrap();
        let a = s.allocate(8).unwrap();
        assert_eq!(s.release(99), Err(SpaceError::InvalidAddress(99)));
        assert_eq!(s.release(164), Err(SpaceError::InvalidAddress(164)));
        assert_eq!(s.release(a + 4), Err(SpaceError::InvalidAddress(a + 4)));
        s.release(a).unwrap();
        assert_eq!(s.release(a), Err(SpaceError::InvalidAddress(a)));
        assert_eq!(s.accessible_size(a), Err(SpaceError::InvalidAddress(a)));
        s.debug_validate_invariants();
    }

    #[test]
    fn allocate_never_returns_a_too_small_division() {
        let mut s = space(1 << 20);
        let sizes = [3u64, 700, 993, 4097, 12_345, 65_000, 1, 300];
        let mut live = Vec::new();
        for round in 0..50u64 {
            let size = sizes[(round % sizes.len() as u64) as usize] + round;
            let a = s.allocate(size).unwrap();
            assert!(s.accessible_size(a).unwrap() >= size);
            live.push(a);
            if round % 3 == 0 {
                s.release(live.remove(0)).unwrap();
            }
        }
        s.debug_validate_invariants();
    }

    #[test]
    fn try_allocate_falls_back_to_largest() {
        let mut s = space(64);
        let blocks: Vec<_> = (0..8).map(|_| s.allocate(8).unwrap()).collect();
        s.release(blocks[1]).unwrap();
        s.release(blocks[4]).unwrap();
        s.release(blocks[5]).unwrap();
        assert!(s.allocate(24).unwrap_err().is_out_of_space());
        let got = s.try_allocate(24).unwrap();
        assert_eq!(got, blocks[4]);
        assert_eq!(s.accessible_size(got), Ok(16));
        s.debug_validate_invariants();
    }

    #[test]
    fn try_allocate_trims_oversized_fallback() {
        let mut s = space(8192);
        let a = s.allocate(4220).unwrap();
        let _b = s.allocate(3900).unwrap();
        s.release(a).unwrap();
        // 4220 bytes are free, but the class [4160, 4224) also admits
        // divisions smaller than 4164, so the exact search skips it.
        assert!(s.allocate(4164).unwrap_err().is_out_of_space());
        let got = s.try_allocate(4164).unwrap();
        assert_eq!(got, a);
        assert_eq!(s.accessible_size(got), Ok(4164));
        s.debug_validate_invariants();
    }

    #[test]
    fn extend_behind_merges_with_free_tail() {
        let mut s = space(64);
        let a = s.allocate(32).unwrap();
        s.extend(64, 64).unwrap();
        assert_eq!(s.size(), 128);
        assert_eq!(s.free_division_count(), 1);
        assert_eq!(s.largest_free(), 96);
        assert_eq!(s.accessible_size(a), Ok(32));
        s.debug_validate_invariants();
    }

    #[test]
    fn extend_before_merges_with_free_head() {
        let mut s = TlsfSpace::new(64, 64).unwrap();
        let a = s.allocate(64).unwrap();
        s.release(a).unwrap();
        s.extend(0, 64).unwrap();
        assert_eq!(s.base(), 0);
        assert_eq!(s.division_count(), 1);
        assert_eq!(s.allocate(128), Ok(0));
        s.debug_validate_invariants();
    }

    #[test]
    fn extend_rejects_gaps_and_overlaps() {
        let mut s = TlsfSpace::new(64, 64).unwrap();
        assert!(matches!(
            s.extend(200, 8),
            Err(SpaceError::NonContiguousExtension { .. })
        ));
        assert!(matches!(
            s.extend(0, 8),
            Err(SpaceError::NonContiguousExtension { .. })
        ));
        assert_eq!(s.extend(128, 0), Err(SpaceError::InvalidSize(0)));
        s.debug_validate_invariants();
    }

    #[test]
    fn extend_rejects_unaligned_ranges() {
        let mut s = TlsfSpace::new(64, 64).unwrap();
        assert_eq!(s.extend(61, 3), Err(SpaceError::InvalidSize(3)));
        assert_eq!(s.extend(128, 6), Err(SpaceError::InvalidSize(6)));
        assert_eq!(s.extend(126, 4), Err(SpaceError::InvalidAddress(126)));
        assert_eq!((s.base(), s.end()), (64, 128));

        s.extend(60, 4).unwrap();
        let a = s.allocate(64).unwrap();
        assert_eq!(a, 60);
        assert_eq!(a % s.alignment(), 0);
        s.debug_validate_invariants();
    }

    #[test]
    fn snapshot_reports_accounting() {
        let mut s = space(256);
        s.allocate(64).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.allocated_bytes, 64);
        assert_eq!(snap.free_bytes, 192);
        assert_eq!(snap.divisions, 2);
        assert_eq!(snap.free_divisions, 1);
        assert_eq!(snap.largest_free, 192);
    }
}

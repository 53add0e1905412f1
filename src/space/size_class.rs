//! Two-level size-class mapping for the TLSF free index.
//!
//! Sizes below `SL_COUNT * alignment` share first level 0 and are split
//! linearly by `alignment`. Larger sizes use `floor(log2(size))` for the
//! first level (shifted so the first large class lands on level 1) and the
//! next `sl_log2` bits below the leading one for the second level.
//!
//! ```text
//!   alignment = 4, sl_log2 = 6 (64 second-level classes)
//!
//!   size     fl  sl   class covers
//!   ─────    ──  ──   ──────────────
//!   4        0   1    [4, 8)
//!   252      0   63   [252, 256)
//!   256      1   0    [256, 260)
//!   1000     2   61   [1000, 1008)
//! ```

/// Number of first-level classes (bits in the first-level bitmap).
pub const FIRST_LEVEL_COUNT: usize = u64::BITS as usize;

/// Maximum supported `log2` of the second-level class count.
pub const MAX_SECOND_LEVEL_LOG2: u32 = 6;

/// Minimum allocation granularity.
pub const MIN_ALIGNMENT: u64 = 4;

#[inline]
fn log2(value: u64) -> u32 {
    debug_assert!(value > 0);
    u64::BITS - 1 - value.leading_zeros()
}

/// Maps sizes to `(first level, second level)` classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClasses {
    alignment: u64,
    sl_log2: u32,
    fl_shift: u32,
}

impl SizeClasses {
    /// `alignment` must be a power of two of at least [`MIN_ALIGNMENT`] and
    /// `sl_log2` must be in `1..=6`; callers validate before constructing.
    pub fn new(alignment: u64, sl_log2: u32) -> Self {
        debug_assert!(alignment.is_power_of_two() && alignment >= MIN_ALIGNMENT);
        debug_assert!((1..=MAX_SECOND_LEVEL_LOG2).contains(&sl_log2));
        let small_limit = (1u64 << sl_log2) * alignment;
        Self {
            alignment,
            sl_log2,
            fl_shift: log2(small_limit) - 1,
        }
    }

    #[inline]
    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    /// Number of second-level classes per first level.
    #[inline]
    pub fn second_level_count(&self) -> usize {
        1 << self.sl_log2
    }

    /// Sizes below this share first level 0.
    #[inline]
    pub fn small_limit(&self) -> u64 {
        (1u64 << self.sl_log2) * self.alignment
    }

    /// Rounds `size` up to a multiple of the alignment. `None` on overflow.
    #[inline]
    pub fn align_up(&self, size: u64) -> Option<u64> {
        size.checked_add(self.alignment - 1)
            .map(|s| s & !(self.alignment - 1))
    }

    /// Class a free division of exactly `size` bytes is filed under.
    pub fn mapping(&self, size: u64) -> (usize, usize) {
        if size < self.small_limit() {
            (0, (size / self.alignment) as usize)
        } else {
            let fl = log2(size);
            let sl = (size >> (fl - self.sl_log2)) ^ (1 << self.sl_log2);
            ((fl - self.fl_shift) as usize, sl as usize)
        }
    }

    /// Smallest class whose every member can hold `size` bytes: the
    /// request is rounded up to the next class boundary before mapping.
    pub fn search_class(&self, size: u64) -> Option<(usize, usize)> {
        let rounded = if size >= self.small_limit() {
            let step = (1u64 << (log2(size) - self.sl_log2)) - 1;
            size.checked_add(step)?
        } else {
            size
        };
        Some(self.mapping(rounded))
    }
}

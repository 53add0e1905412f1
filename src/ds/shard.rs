//! Shard selection for block-number keys.
//!
//! Block keys are dense integers, so shards are picked by `key % shards`
//! rather than by hashing. The shard count is derived from the table size a
//! single open-addressed map would need for the requested capacity, so that
//! no shard's table exceeds a configured maximum.
//!
//! ## Architecture
//!
//! ```text
//!   required capacity = 50, max shard table = 126
//!
//!   table_size(50)  = next_pow2(ceil(50 / 0.5)) = 128
//!   shard_count     = ceil(128 / 126)            = 2
//!
//!   key 0 ─► shard 0     key 1 ─► shard 1     key 6 ─► shard 0
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use blockcache::ds::ShardSelector;
//!
//! let selector = ShardSelector::for_capacity(50, 126);
//! assert_eq!(selector.shard_count(), 2);
//! assert_eq!(selector.shard_for_key(7), 1);
//! ```

/// Load factor every shard table is kept at or below.
pub const LOAD_FACTOR: f64 = 0.5;

/// Upper bound on any single shard's table size.
pub const MAX_SHARD_CAPACITY: usize = 1 << 30;

/// Table size for `expected` entries at [`LOAD_FACTOR`]: the next power of
/// two of `ceil(expected / LOAD_FACTOR)`, never less than 2.
pub fn table_size(expected: usize) -> usize {
    let wanted = (expected as f64 / LOAD_FACTOR).ceil() as usize;
    wanted.max(2).next_power_of_two()
}

/// Deterministic `key % shards` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards. The count is clamped to at
    /// least 1.
    pub fn new(shards: usize) -> Self {
        Self {
            shards: shards.max(1),
        }
    }

    /// Creates a selector sized so that `required` keys fit in shards whose
    /// tables do not exceed `max_shard_capacity`.
    pub fn for_capacity(required: usize, max_shard_capacity: usize) -> Self {
        let max = max_shard_capacity.clamp(1, MAX_SHARD_CAPACITY);
        Self::new(table_size(required).div_ceil(max))
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Maps a key to a shard index in `[0, shards)`.
    #[inline]
    pub fn shard_for_key(&self, key: u64) -> usize {
        (key % self.shards as u64) as usize
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector.
    fn default() -> Self {
        Self::new(1)
    }
}

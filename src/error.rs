//! Error types for the blockcache library.
//!
//! ## Key Components
//!
//! - [`SpaceError`]: Returned by the space manager and buffer pool
//!   (out of space, bad address, bad size, non-contiguous extension).
//! - [`CacheError`]: Returned by the slot pool, eviction lists and cache
//!   engines when a slot index is exhausted or invalid.
//! - [`BlockCacheError`]: Union of the two for the integrated block cache.
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (`check_invariants` methods).
//!
//! Configuration errors live next to the configuration schema in
//! [`crate::config::ConfigError`].
//!
//! ## Example Usage
//!
//! ```
//! use blockcache::error::SpaceError;
//! use blockcache::space::SpaceManager;
//!
//! let space = SpaceManager::new(0, 64).unwrap();
//! let err = space.allocate(128).unwrap_err();
//! assert!(err.is_out_of_space());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// SpaceError
// ---------------------------------------------------------------------------

/// Errors produced by [`SpaceManager`](crate::space::SpaceManager) and
/// [`BufferPool`](crate::space::BufferPool).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpaceError {
    /// No free division can satisfy the request. Recoverable: release space
    /// or extend the manager, then retry.
    #[error("out of space: no free division for {requested} bytes")]
    OutOfSpace {
        /// Requested size after alignment.
        requested: u64,
    },
    /// The address is outside the managed range, is not the start of a
    /// division, or the division is not allocated.
    #[error("invalid address {0:#x}")]
    InvalidAddress(u64),
    /// Zero-sized or overflowing request.
    #[error("invalid size {0}")]
    InvalidSize(u64),
    /// `extend` was called with a range that touches neither end of the
    /// managed space.
    #[error(
        "extension [{offset:#x}, +{size}) is not contiguous with managed range [{base:#x}, {end:#x})"
    )]
    NonContiguousExtension {
        /// Requested start of the new range.
        offset: u64,
        /// Requested length of the new range.
        size: u64,
        /// Current start of the managed range.
        base: u64,
        /// Current end of the managed range.
        end: u64,
    },
    /// Constructor parameters rejected.
    #[error("invalid space configuration: {0}")]
    InvalidConfig(&'static str),
}

impl SpaceError {
    /// Returns `true` for the recoverable [`SpaceError::OutOfSpace`] outcome.
    #[inline]
    pub fn is_out_of_space(&self) -> bool {
        matches!(self, SpaceError::OutOfSpace { .. })
    }
}

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Errors produced by slot pools, eviction lists and cache engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Every index of the pool is in use.
    #[error("slot pool exhausted (capacity {capacity})")]
    SlotPoolExhausted {
        /// Total number of indices the pool can issue.
        capacity: usize,
    },
    /// The index is not a live node of the pool or list it was passed to.
    #[error("invalid slot index {0}")]
    InvalidIndex(u32),
}

// ---------------------------------------------------------------------------
// BlockCacheError
// ---------------------------------------------------------------------------

/// Errors produced by [`BlockCache`](crate::block_cache::BlockCache).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockCacheError {
    /// Space manager failure.
    #[error(transparent)]
    Space(#[from] SpaceError),
    /// Slot or list failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The block can never fit in the buffer pool.
    #[error("payload of {len} bytes exceeds buffer pool capacity {capacity}")]
    PayloadTooLarge {
        /// Payload length.
        len: usize,
        /// Pool capacity.
        capacity: u64,
    },
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal invariants are violated.
///
/// Produced by `check_invariants` methods (e.g.
/// [`ArcCache::check_invariants`](crate::policy::arc::ArcCache::check_invariants)).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Thread-safe space manager.
//!
//! [`SpaceManager`] serializes every operation of a [`TlsfSpace`] behind a
//! single `parking_lot::Mutex`. Each public call takes the lock exactly once
//! and never calls back into user code while holding it, so a division is
//! never observed half-split or half-merged and an address released by one
//! thread cannot be handed to another before `release` returns.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use blockcache::space::SpaceManager;
//!
//! let space = Arc::new(SpaceManager::new(0, 1 << 20).unwrap());
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let space = Arc::clone(&space);
//!         thread::spawn(move || {
//!             let a = space.allocate(4096).unwrap();
//!             space.release(a).unwrap();
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//! assert_eq!(space.free_bytes(), 1 << 20);
//! ```

use parking_lot::Mutex;

use crate::config::SpaceConfig;
use crate::error::{InvariantError, SpaceError};
use crate::space::tlsf::{SpaceSnapshot, TlsfSpace};

/// Free-threaded TLSF allocator over a growable address range.
#[derive(Debug)]
pub struct SpaceManager {
    inner: Mutex<TlsfSpace>,
}

impl SpaceManager {
    /// Manages `[base, base + size)` with default alignment.
    pub fn new(base: u64, size: u64) -> Result<Self, SpaceError> {
        Ok(Self::from_space(TlsfSpace::new(base, size)?))
    }

    pub fn with_config(config: &SpaceConfig) -> Result<Self, SpaceError> {
        let space = TlsfSpace::with_config(config)?;
        tracing::debug!(
            base = config.base,
            size = config.size,
            alignment = config.alignment,
            second_level_log2 = config.second_level_log2,
            "space manager created"
        );
        Ok(Self::from_space(space))
    }

    pub fn from_space(space: TlsfSpace) -> Self {
        Self {
            inner: Mutex::new(space),
        }
    }

    /// Carves a division of at least `size` bytes.
    ///
    /// `OutOfSpace` is recoverable: release space or [`extend`](Self::extend)
    /// and retry.
    pub fn allocate(&self, size: u64) -> Result<u64, SpaceError> {
        let result = self.inner.lock().allocate(size);
        if let Err(SpaceError::OutOfSpace { requested }) = result {
            tracing::debug!(requested, "allocation found no fitting division");
        }
        result
    }

    /// Allocates `size` bytes, or the largest free division when nothing
    /// fits. Check [`accessible_size`](Self::accessible_size) for the
    /// granted length.
    pub fn try_allocate(&self, size: u64) -> Result<u64, SpaceError> {
        self.inner.lock().try_allocate(size)
    }

    pub fn release(&self, address: u64) -> Result<(), SpaceError> {
        self.inner.lock().release(address)
    }

    /// Grows the managed range by `[offset, offset + size)`, which must start
    /// at the current end or finish at the current base.
    pub fn extend(&self, offset: u64, size: u64) -> Result<(), SpaceError> {
        self.inner.lock().extend(offset, size)
    }

    pub fn accessible_size(&self, address: u64) -> Result<u64, SpaceError> {
        self.inner.lock().accessible_size(address)
    }

    pub fn size(&self) -> u64 {
        self.inner.lock().size()
    }

    pub fn base(&self) -> u64 {
        self.inner.lock().base()
    }

    pub fn end(&self) -> u64 {
        self.inner.lock().end()
    }

    pub fn alignment(&self) -> u64 {
        self.inner.lock().alignment()
    }

    pub fn free_bytes(&self) -> u64 {
        self.inner.lock().free_bytes()
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.inner.lock().allocated_bytes()
    }

    pub fn division_count(&self) -> usize {
        self.inner.lock().division_count()
    }

    pub fn largest_free(&self) -> u64 {
        self.inner.lock().largest_free()
    }

    /// Consistent view of all counters, taken under one lock acquisition.
    pub fn snapshot(&self) -> SpaceSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.inner.lock().debug_validate_invariants();
    }
}

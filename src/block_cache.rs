//! Block cache: ARC replacement over payload buffers carved from a
//! [`BufferPool`], with sequential-stream bypass.
//!
//! ```text
//!   write(key, offset, bytes)
//!     │
//!     ├─► IoStateMachine::process(offset, len) ── sequential ──► Bypassed
//!     │                                                        (stale copy dropped)
//!     ├─► BufferPool::allocate(len)
//!     │      └─ OutOfSpace → ArcCache::evict_one → release buffer → retry
//!     ├─► BufferPool::write(handle, bytes)
//!     └─► ArcCache::put(key, handle)
//!            └─ Replaced / Evicted → release displaced buffer
//! ```
//!
//! Every handle held by the engine owns exactly one allocated extent of the
//! pool; a handle that leaves the engine is released in the same call.
//!
//! ## Example Usage
//!
//! ```
//! use blockcache::block_cache::{Admission, BlockCache};
//! use blockcache::config::BlockCacheConfig;
//!
//! let mut config = BlockCacheConfig::default();
//! config.cache.capacity = 16;
//! config.space.size = 64 * 1024;
//! let mut cache = BlockCache::new(config).unwrap();
//!
//! assert_eq!(cache.write(7, 1 << 20, b"block seven").unwrap(), Admission::Stored);
//! assert_eq!(cache.read(7), Some(&b"block seven"[..]));
//! assert!(cache.invalidate(7));
//! assert_eq!(cache.read(7), None);
//! ```

use crate::config::{BlockCacheConfig, CacheConfig, ConfigError};
use crate::error::{BlockCacheError, InvariantError, SpaceError};
use crate::pattern::{IoState, IoStateMachine, NeverSequential};
use crate::policy::{ArcCache, Insertion};
use crate::space::{BufferHandle, BufferPool};
use crate::traits::{CoreCache, ReadOnlyCache};

/// Outcome of [`BlockCache::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Cached without displacing another block.
    Stored,
    /// The key was cached; its previous buffer was released.
    Replaced,
    /// Cached; `key`'s buffer was evicted and released.
    Evicted { key: u64 },
    /// Not cached: the stream is sequential, caching is disabled, or the
    /// pool could not fit the block even after evicting everything.
    Bypassed,
}

#[derive(Debug)]
pub struct BlockCache {
    cache: ArcCache<BufferHandle>,
    pool: BufferPool,
    pattern: IoStateMachine,
    bypass_sequential: bool,
}

impl BlockCache {
    /// Validates `config` and builds the engine, pool and classifier.
    pub fn new(config: BlockCacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = BufferPool::with_config(&config.space).map_err(|err| match err {
            SpaceError::InvalidConfig(reason) => ConfigError::Invalid {
                field: "space",
                reason,
            },
            _ => ConfigError::Invalid {
                field: "space",
                reason: "rejected by space manager",
            },
        })?;
        tracing::info!(
            capacity = config.cache.capacity,
            pool_bytes = pool.capacity(),
            bypass_sequential = config.cache.bypass_sequential,
            "block cache created"
        );
        Ok(Self {
            // Admission is decided here through `pattern`, so the engine gets
            // no classifier of its own.
            cache: ArcCache::with_detector(
                &CacheConfig {
                    bypass_sequential: false,
                    ..config.cache.clone()
                },
                Box::new(NeverSequential),
            ),
            pool,
            pattern: IoStateMachine::from_config(&config.pattern),
            bypass_sequential: config.cache.bypass_sequential,
        })
    }

    /// Returns the cached bytes of `key`, recording the access.
    pub fn read(&mut self, key: u64) -> Option<&[u8]> {
        let handle = *self.cache.get(key)?;
        Some(self.pool.read(&handle))
    }

    /// Offers the block `key`, accessed at `offset`, to the cache.
    ///
    /// The access is classified first. A sequential access is not cached
    /// when bypass is enabled, and any older copy of `key` is dropped so a
    /// later read cannot observe it. Empty blocks are rejected with
    /// [`SpaceError::InvalidSize`].
    pub fn write(
        &mut self,
        key: u64,
        offset: u64,
        bytes: &[u8],
    ) -> Result<Admission, BlockCacheError> {
        let capacity = self.pool.capacity();
        let length = u32::try_from(bytes.len()).map_err(|_| BlockCacheError::PayloadTooLarge {
            len: bytes.len(),
            capacity,
        })?;
        if bytes.len() as u64 > capacity {
            return Err(BlockCacheError::PayloadTooLarge {
                len: bytes.len(),
                capacity,
            });
        }

        let sequential = self.pattern.process(offset, length).is_sequential();
        if sequential && self.bypass_sequential {
            if tracing::enabled!(tracing::Level::TRACE) {
                tracing::trace!(key, offset, length, "sequential write bypassed");
            }
            self.invalidate(key);
            return Ok(Admission::Bypassed);
        }
        if self.cache.capacity() == 0 {
            return Ok(Admission::Bypassed);
        }

        let Some(handle) = self.allocate(bytes.len())? else {
            tracing::warn!(
                key,
                len = bytes.len(),
                free_bytes = self.pool.free_bytes(),
                "no extent fits after evicting every block; bypassing"
            );
            self.invalidate(key);
            return Ok(Admission::Bypassed);
        };
        if let Err(err) = self.pool.write(&handle, bytes) {
            self.pool.release(handle)?;
            return Err(err.into());
        }

        let outcome = match self.cache.put(key, handle) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.pool.release(handle)?;
                return Err(err.into());
            },
        };
        Ok(match outcome {
            Insertion::Inserted => Admission::Stored,
            Insertion::Replaced(old) => {
                self.pool.release(old)?;
                Admission::Replaced
            },
            Insertion::Evicted { key, value } => {
                self.pool.release(value)?;
                Admission::Evicted { key }
            },
            Insertion::Bypassed(handle) => {
                self.pool.release(handle)?;
                Admission::Bypassed
            },
        })
    }

    /// Carves `len` bytes, evicting cached blocks while the pool is full.
    /// `None` once nothing is left to evict.
    fn allocate(&mut self, len: usize) -> Result<Option<BufferHandle>, BlockCacheError> {
        loop {
            match self.pool.allocate(len) {
                Ok(handle) => return Ok(Some(handle)),
                Err(err) if err.is_out_of_space() => match self.cache.evict_one()? {
                    Some((victim, handle)) => {
                        tracing::trace!(victim, len, "evicted block to reclaim buffer space");
                        self.pool.release(handle)?;
                    },
                    None => return Ok(None),
                },
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Drops `key` and releases its buffer. Returns `true` if it was cached.
    pub fn invalidate(&mut self, key: u64) -> bool {
        let Some(handle) = self.cache.invalidate(key) else {
            return false;
        };
        if let Err(err) = self.pool.release(handle) {
            tracing::warn!(key, %err, "failed to release block buffer");
        }
        true
    }

    /// Drops every block and all history, releasing every buffer.
    pub fn clear(&mut self) {
        let keys: Vec<u64> = self.cache.keys().collect();
        for key in keys {
            self.invalidate(key);
        }
        self.cache.clear();
        self.pattern.reset();
    }

    pub fn contains(&self, key: u64) -> bool {
        self.cache.contains(key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    /// Current state of the streaming classifier.
    pub fn io_state(&self) -> IoState {
        self.pattern.state()
    }

    /// Unallocated bytes of the buffer pool.
    pub fn free_bytes(&self) -> u64 {
        self.pool.free_bytes()
    }

    /// Replacement engine, for inspection.
    pub fn engine(&self) -> &ArcCache<BufferHandle> {
        &self.cache
    }

    /// Engine invariants plus buffer accounting: the resident handles'
    /// extents never exceed what the pool has handed out.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.cache.check_invariants()?;
        let allocated = self.pool.capacity() - self.pool.free_bytes();
        let resident: u64 = self
            .cache
            .keys()
            .filter_map(|key| self.cache.peek(key))
            .map(|handle| handle.len() as u64)
            .sum();
        if resident > allocated {
            return Err(InvariantError::new(format!(
                "resident payloads ({resident} bytes) exceed allocated space ({allocated} bytes)"
            )));
        }
        if self.cache.is_empty() && allocated != 0 {
            return Err(InvariantError::new(format!(
                "{allocated} bytes allocated with no resident block"
            )));
        }
        Ok(())
    }
}

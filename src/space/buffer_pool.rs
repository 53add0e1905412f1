//! Byte region whose extents are carved by a [`SpaceManager`].
//!
//! The pool owns one contiguous `Vec<u8>` and a space manager over
//! `[0, capacity)`. Each [`BufferHandle`] names an extent of the region; the
//! handle is only produced by [`BufferPool::allocate`], so every handle's
//! range lies inside the region.
//!
//! ## Example Usage
//!
//! ```
//! use blockcache::space::BufferPool;
//!
//! let mut pool = BufferPool::new(4096).unwrap();
//! let handle = pool.allocate(5).unwrap();
//! pool.write(&handle, b"hello").unwrap();
//! assert_eq!(pool.read(&handle), b"hello");
//!
//! pool.release(handle).unwrap();
//! assert_eq!(pool.free_bytes(), 4096);
//! ```

use crate::config::SpaceConfig;
use crate::error::SpaceError;
use crate::space::manager::SpaceManager;

/// Extent of a [`BufferPool`] handed out by [`BufferPool::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    address: u64,
    len: usize,
}

impl BufferHandle {
    /// Offset of the extent within the pool.
    #[inline]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Number of bytes requested for this extent.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn range(&self) -> std::ops::Range<usize> {
        let start = self.address as usize;
        start..start + self.len
    }
}

/// Fixed-size byte region with TLSF-managed extents.
///
/// Byte access takes `&mut self`; share a pool behind an external lock.
#[derive(Debug)]
pub struct BufferPool {
    bytes: Vec<u8>,
    space: SpaceManager,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Result<Self, SpaceError> {
        Self::with_config(&SpaceConfig {
            size: capacity as u64,
            ..SpaceConfig::default()
        })
    }

    /// Pool whose extents start on multiples of `alignment`.
    pub fn with_alignment(capacity: usize, alignment: u64) -> Result<Self, SpaceError> {
        Self::with_config(&SpaceConfig {
            size: capacity as u64,
            alignment,
            ..SpaceConfig::default()
        })
    }

    /// The region always starts at offset 0; `config.base` is ignored.
    pub fn with_config(config: &SpaceConfig) -> Result<Self, SpaceError> {
        let config = SpaceConfig {
            base: 0,
            ..config.clone()
        };
        let space = SpaceManager::with_config(&config)?;
        let len = usize::try_from(config.size)
            .map_err(|_| SpaceError::InvalidConfig("size exceeds addressable memory"))?;
        Ok(Self {
            bytes: vec![0; len],
            space,
        })
    }

    /// Carves an extent of at least `len` bytes.
    pub fn allocate(&mut self, len: usize) -> Result<BufferHandle, SpaceError> {
        let address = self.space.allocate(len as u64)?;
        Ok(BufferHandle { address, len })
    }

    /// Copies `data` into the extent. `data` longer than the handle is an
    /// `InvalidSize` error.
    pub fn write(&mut self, handle: &BufferHandle, data: &[u8]) -> Result<(), SpaceError> {
        if data.len() > handle.len {
            return Err(SpaceError::InvalidSize(data.len() as u64));
        }
        let start = handle.address as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn read(&self, handle: &BufferHandle) -> &[u8] {
        &self.bytes[handle.range()]
    }

    /// Copies the extent into `out`, returning the number of bytes copied.
    pub fn read_into(&self, handle: &BufferHandle, out: &mut [u8]) -> usize {
        let src = self.read(handle);
        let n = src.len().min(out.len());
        out[..n].copy_from_slice(&src[..n]);
        n
    }

    pub fn release(&mut self, handle: BufferHandle) -> Result<(), SpaceError> {
        self.space.release(handle.address)
    }

    pub fn capacity(&self) -> u64 {
        self.space.size()
    }

    pub fn free_bytes(&self) -> u64 {
        self.space.free_bytes()
    }

    /// Allocator behind the region.
    pub fn space(&self) -> &SpaceManager {
        &self.space
    }
}

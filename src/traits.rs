//! # Cache Trait Hierarchy
//!
//! Both replacement engines ([`ArcCache`](crate::policy::arc::ArcCache) and
//! [`LruCache`](crate::policy::lru::LruCache)) key entries by `u64` block
//! number and share one operation set:
//!
//! ```text
//!   ┌─────────────────────────────────────────┐
//!   │            ReadOnlyCache                │
//!   │                                         │
//!   │  contains(&, u64) → bool                │
//!   │  len(&) → usize                         │
//!   │  is_empty(&) → bool                     │
//!   │  capacity(&) → usize                    │
//!   └──────────────────┬──────────────────────┘
//!                      │
//!                      ▼
//!   ┌─────────────────────────────────────────┐
//!   │            CoreCache<V>                 │
//!   │                                         │
//!   │  get(&mut, u64) → Option<&V>            │
//!   │  put(&mut, u64, V) → Insertion<V>       │
//!   │  invalidate(&mut, u64) → Option<V>      │
//!   │  clear(&mut)                            │
//!   └─────────────────────────────────────────┘
//! ```
//!
//! `get` takes `&mut self` because a hit updates recency. `put` reports what
//! left the cache as an [`Insertion`], so a caller that owns external
//! resources per payload (buffer extents, file handles) can release them.
//!
//! ## Example Usage
//!
//! ```
//! use blockcache::policy::{ArcCache, Insertion, LruCache};
//! use blockcache::traits::{CoreCache, ReadOnlyCache};
//!
//! fn warm<C: CoreCache<String>>(cache: &mut C) {
//!     for key in 0..4u64 {
//!         let _ = cache.put(key, format!("block-{key}")).unwrap();
//!     }
//! }
//!
//! let mut arc = ArcCache::new(8);
//! let mut lru = LruCache::new(2);
//! warm(&mut arc);
//! warm(&mut lru);
//!
//! assert_eq!(arc.len(), 4);
//! assert_eq!(lru.len(), 2);
//! assert!(matches!(lru.put(9, "x".into()).unwrap(), Insertion::Evicted { key: 2, .. }));
//! ```

use crate::error::CacheError;
use crate::policy::Insertion;

/// Read-only inspection shared by all engines.
pub trait ReadOnlyCache {
    /// Returns `true` if `key` is resident (ghost entries do not count).
    fn contains(&self, key: u64) -> bool;

    /// Number of resident entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of resident entries.
    fn capacity(&self) -> usize;
}

/// Core mutating operations shared by all engines.
pub trait CoreCache<V>: ReadOnlyCache {
    /// Looks up `key`, recording the access.
    fn get(&mut self, key: u64) -> Option<&V>;

    /// Inserts or replaces `key`, evicting as the policy dictates.
    ///
    /// An `Err` means internal bookkeeping is inconsistent; it is never the
    /// result of normal cache pressure.
    fn put(&mut self, key: u64, value: V) -> Result<Insertion<V>, CacheError>;

    /// Removes `key` and returns its payload, if resident.
    fn invalidate(&mut self, key: u64) -> Option<V>;

    /// Drops every entry and all history.
    fn clear(&mut self);
}

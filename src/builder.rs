//! Unified cache builder for the replacement policies.
//!
//! Provides one API over [`ArcCache`] and [`LruCache`] so callers can pick a
//! policy from configuration.
//!
//! ## Example
//!
//! ```rust
//! use blockcache::builder::{CacheBuilder, CachePolicy};
//! use blockcache::traits::{CoreCache, ReadOnlyCache};
//!
//! let mut cache = CacheBuilder::new(100).build::<String>(CachePolicy::Arc);
//! let _ = cache.put(1, "hello".to_string()).unwrap();
//! assert_eq!(cache.get(1), Some(&"hello".to_string()));
//! ```

use std::fmt;

use crate::config::{CacheConfig, PatternConfig};
use crate::error::CacheError;
use crate::policy::{ArcCache, Insertion, LruCache};
use crate::traits::{CoreCache, ReadOnlyCache};

/// Available replacement policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Adaptive replacement (recency and frequency, self-tuning).
    #[default]
    Arc,
    /// Least Recently Used eviction.
    Lru,
}

/// Cache wrapper that provides a consistent API regardless of policy.
pub struct Cache<V> {
    inner: CacheInner<V>,
}

enum CacheInner<V> {
    Arc(ArcCache<V>),
    Lru(LruCache<V>),
}

impl<V> Cache<V> {
    pub fn policy(&self) -> CachePolicy {
        match &self.inner {
            CacheInner::Arc(_) => CachePolicy::Arc,
            CacheInner::Lru(_) => CachePolicy::Lru,
        }
    }

    /// The ARC engine, when that policy was chosen.
    pub fn as_arc(&self) -> Option<&ArcCache<V>> {
        match &self.inner {
            CacheInner::Arc(arc) => Some(arc),
            CacheInner::Lru(_) => None,
        }
    }

    /// Stores `value` unless the ARC engine's classifier reports a
    /// sequential stream. LRU always stores.
    pub fn admit(
        &mut self,
        key: u64,
        value: V,
        offset: u64,
        length: u32,
    ) -> Result<Insertion<V>, CacheError> {
        match &mut self.inner {
            CacheInner::Arc(arc) => arc.admit(key, value, offset, length),
            CacheInner::Lru(lru) => lru.put(key, value),
        }
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            CacheInner::Arc(arc) => fmt::Debug::fmt(arc, f),
            CacheInner::Lru(lru) => fmt::Debug::fmt(lru, f),
        }
    }
}

impl<V> ReadOnlyCache for Cache<V> {
    fn contains(&self, key: u64) -> bool {
        match &self.inner {
            CacheInner::Arc(arc) => arc.contains(key),
            CacheInner::Lru(lru) => lru.contains(key),
        }
    }

    fn len(&self) -> usize {
        match &self.inner {
            CacheInner::Arc(arc) => arc.len(),
            CacheInner::Lru(lru) => lru.len(),
        }
    }

    fn capacity(&self) -> usize {
        match &self.inner {
            CacheInner::Arc(arc) => arc.capacity(),
            CacheInner::Lru(lru) => lru.capacity(),
        }
    }
}

impl<V> CoreCache<V> for Cache<V> {
    fn get(&mut self, key: u64) -> Option<&V> {
        match &mut self.inner {
            CacheInner::Arc(arc) => arc.get(key),
            CacheInner::Lru(lru) => lru.get(key),
        }
    }

    fn put(&mut self, key: u64, value: V) -> Result<Insertion<V>, CacheError> {
        match &mut self.inner {
            CacheInner::Arc(arc) => arc.put(key, value),
            CacheInner::Lru(lru) => lru.put(key, value),
        }
    }

    fn invalidate(&mut self, key: u64) -> Option<V> {
        match &mut self.inner {
            CacheInner::Arc(arc) => arc.invalidate(key),
            CacheInner::Lru(lru) => lru.invalidate(key),
        }
    }

    fn clear(&mut self) {
        match &mut self.inner {
            CacheInner::Arc(arc) => arc.clear(),
            CacheInner::Lru(lru) => lru.clear(),
        }
    }
}

/// Builder for creating cache instances.
#[derive(Debug, Clone, Default)]
pub struct CacheBuilder {
    cache: CacheConfig,
    pattern: PatternConfig,
}

impl CacheBuilder {
    /// Create a new cache builder with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: CacheConfig {
                capacity,
                ..CacheConfig::default()
            },
            pattern: PatternConfig::default(),
        }
    }

    /// Start from loaded configuration sections.
    pub fn from_config(cache: &CacheConfig, pattern: &PatternConfig) -> Self {
        Self {
            cache: cache.clone(),
            pattern: pattern.clone(),
        }
    }

    pub fn max_shard_capacity(mut self, max_shard_capacity: usize) -> Self {
        self.cache.max_shard_capacity = max_shard_capacity;
        self
    }

    /// Whether ARC `admit` skips sequential streams.
    pub fn bypass_sequential(mut self, enabled: bool) -> Self {
        self.cache.bypass_sequential = enabled;
        self
    }

    pub fn pattern(mut self, pattern: PatternConfig) -> Self {
        self.pattern = pattern;
        self
    }

    /// Build a cache with the specified policy.
    ///
    /// # Example
    ///
    /// ```rust
    /// use blockcache::builder::{CacheBuilder, CachePolicy};
    ///
    /// // ARC with sequential bypass disabled
    /// let cache = CacheBuilder::new(100)
    ///     .bypass_sequential(false)
    ///     .build::<Vec<u8>>(CachePolicy::Arc);
    ///
    /// // Plain LRU
    /// let cache = CacheBuilder::new(100).build::<Vec<u8>>(CachePolicy::Lru);
    /// ```
    pub fn build<V>(self, policy: CachePolicy) -> Cache<V> {
        let inner = match policy {
            CachePolicy::Arc => CacheInner::Arc(ArcCache::with_config(&self.cache, &self.pattern)),
            CachePolicy::Lru => CacheInner::Lru(LruCache::with_shard_limit(
                self.cache.capacity,
                self.cache.max_shard_capacity,
            )),
        };

        Cache { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_policies_basic_ops() {
        for policy in [CachePolicy::Arc, CachePolicy::Lru] {
            let mut cache = CacheBuilder::new(10).build::<String>(policy);
            assert_eq!(cache.policy(), policy);

            // Insert
            assert_eq!(cache.put(1, "one".to_string()).unwrap(), Insertion::Inserted);
            assert_eq!(cache.put(2, "two".to_string()).unwrap(), Insertion::Inserted);

            // Get
            assert_eq!(cache.get(1), Some(&"one".to_string()));
            assert_eq!(cache.get(2), Some(&"two".to_string()));
            assert_eq!(cache.get(3), None);

            // Contains
            assert!(cache.contains(1));
            assert!(!cache.contains(99));

            // Len
            assert_eq!(cache.len(), 2);
            assert!(!cache.is_empty());

            // Update
            assert_eq!(
                cache.put(1, "ONE".to_string()).unwrap(),
                Insertion::Replaced("one".to_string())
            );
            assert_eq!(cache.get(1), Some(&"ONE".to_string()));

            // Invalidate
            assert_eq!(cache.invalidate(2), Some("two".to_string()));

            // Clear
            cache.clear();
            assert!(cache.is_empty());
        }
    }

    #[test]
    fn test_capacity_enforcement() {
        let mut cache = CacheBuilder::new(2).build::<String>(CachePolicy::Lru);

        let _ = cache.put(1, "one".to_string()).unwrap();
        let _ = cache.put(2, "two".to_string()).unwrap();
        let _ = cache.put(3, "three".to_string()).unwrap(); // Should evict key 1

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(1)); // Evicted
        assert!(cache.contains(2));
        assert!(cache.contains(3));
    }

    #[test]
    fn test_admit_respects_policy() {
        let pattern = PatternConfig {
            sequential_condition: 1,
            ..PatternConfig::default()
        };
        let mut arc = CacheBuilder::new(4).pattern(pattern.clone()).build::<u8>(CachePolicy::Arc);
        let mut lru = CacheBuilder::new(4).pattern(pattern).build::<u8>(CachePolicy::Lru);

        // Offset 0 continues the initial position, so it counts as contiguous.
        assert_eq!(arc.admit(1, 1, 0, 512).unwrap(), Insertion::Bypassed(1));
        assert_eq!(lru.admit(1, 1, 0, 512).unwrap(), Insertion::Inserted);
        assert!(arc.as_arc().is_some());
        assert!(lru.as_arc().is_none());
    }
}

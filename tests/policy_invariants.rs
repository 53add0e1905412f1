// ==============================================
// CROSS-POLICY INVARIANT TESTS (integration)
// ==============================================
//
// Tests that verify behavioral consistency across the ARC and LRU engines.
// These span multiple modules and belong here rather than in any single
// source file.

use blockcache::builder::{CacheBuilder, CachePolicy};
use blockcache::policy::{ArcCache, Insertion, LruCache, QueueKind};
use blockcache::traits::{CoreCache, ReadOnlyCache};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// ==============================================
// Capacity-0 Behavior
// ==============================================

mod zero_capacity {
    use super::*;

    #[test]
    fn capacity_zero_is_honored() {
        for policy in [CachePolicy::Arc, CachePolicy::Lru] {
            let mut cache = CacheBuilder::new(0).build::<i32>(policy);
            assert_eq!(cache.capacity(), 0, "{policy:?} should honor capacity=0");
            assert_eq!(cache.put(1, 42).unwrap(), Insertion::Bypassed(42));
            assert_eq!(cache.len(), 0, "{policy:?} with capacity=0 should reject puts");
        }
    }
}

// ==============================================
// Capacity Bound Under Random Workloads
// ==============================================

mod capacity_bound {
    use super::*;

    fn drive<C: CoreCache<u64>>(cache: &mut C, seed: u64) {
        let mut rng = SmallRng::seed_from_u64(seed);
        for _ in 0..20_000 {
            let key = rng.random_range(0..512u64);
            match rng.random_range(0..10u8) {
                0..=5 => {
                    if cache.get(key).is_none() {
                        let _ = cache.put(key, key).unwrap();
                    }
                },
                6..=8 => {
                    let _ = cache.put(key, key).unwrap();
                },
                _ => {
                    let _ = cache.invalidate(key);
                },
            }
            assert!(cache.len() <= cache.capacity());
        }
    }

    #[test]
    fn arc_directory_bounds_hold() {
        for seed in 0..4 {
            let mut cache = ArcCache::new(64);
            drive(&mut cache, seed);
            cache.check_invariants().unwrap();
            assert!(cache.t1_len() + cache.b1_len() <= 64);
            assert!(cache.directory_len() <= 128);
            assert!(cache.p_value() <= 64);
        }
    }

    #[test]
    fn lru_len_bound_holds() {
        for seed in 0..4 {
            let mut cache = LruCache::new(64);
            drive(&mut cache, seed);
            cache.check_invariants().unwrap();
        }
    }
}

// ==============================================
// Scan Resistance
// ==============================================
//
// A hot set re-referenced between one-shot scans: ARC keeps the hot set in
// T2 while LRU lets every scan flush it.

mod scan_resistance {
    use super::*;

    fn hits<C: CoreCache<u64>>(cache: &mut C) -> usize {
        let mut hits = 0;
        let mut scan_key = 1_000_000u64;
        for _round in 0..50 {
            // Two passes over the hot set, then a scan as large as the cache.
            for key in 0..32u64 {
                if cache.get(key).is_some() {
                    hits += 1;
                } else {
                    let _ = cache.put(key, key).unwrap();
                }
            }
            for key in 0..32u64 {
                if cache.get(key).is_some() {
                    hits += 1;
                }
            }
            for _ in 0..64 {
                let _ = cache.put(scan_key, scan_key).unwrap();
                scan_key += 1;
            }
        }
        hits
    }

    #[test]
    fn arc_outperforms_lru_on_scans() {
        let mut arc = ArcCache::new(64);
        let mut lru = LruCache::new(64);
        let arc_hits = hits(&mut arc);
        let lru_hits = hits(&mut lru);
        assert!(
            arc_hits > lru_hits,
            "arc {arc_hits} hits should beat lru {lru_hits}"
        );
        assert!((0..32).all(|k| arc.queue_of(k) == Some(QueueKind::T2)));
    }
}

// ==============================================
// Shared Ownership
// ==============================================

mod shared {
    use std::sync::Arc;
    use std::thread;

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn mutex_wrapped_arc_cache_stays_consistent() {
        let cache = Arc::new(Mutex::new(ArcCache::new(128)));
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let mut rng = SmallRng::seed_from_u64(t);
                    for _ in 0..2_000 {
                        let key = rng.random_range(0..400u64);
                        let mut guard = cache.lock();
                        if guard.get(key).is_none() {
                            let _ = guard.put(key, key).unwrap();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        cache.lock().check_invariants().unwrap();
    }
}

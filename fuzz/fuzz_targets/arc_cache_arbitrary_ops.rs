#![no_main]

use blockcache::policy::{ArcCache, Insertion};
use blockcache::traits::{CoreCache, ReadOnlyCache};
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary get / put / invalidate / evict_one sequences on ArcCache
//
// The first byte picks the capacity; the directory bounds and map/list
// agreement are checked after every operation.
fuzz_target!(|data: &[u8]| {
    let Some((&cap, ops)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(cap % 32);
    let mut cache: ArcCache<u8> = ArcCache::new(capacity);

    for chunk in ops.chunks_exact(2) {
        let key = u64::from(chunk[1] % 96);
        match chunk[0] % 4 {
            0 => {
                let _ = cache.get(key);
            }
            1 => match cache.put(key, chunk[1]).unwrap() {
                Insertion::Evicted { key: evicted, .. } => assert_ne!(evicted, key),
                Insertion::Bypassed(_) => assert_eq!(capacity, 0),
                _ => {}
            },
            2 => {
                let _ = cache.invalidate(key);
                assert!(!cache.contains(key));
            }
            _ => {
                let _ = cache.evict_one().unwrap();
            }
        }
        cache.check_invariants().unwrap();
    }
});

// ==============================================
// SPACE MANAGER CONCURRENCY TESTS (integration)
// ==============================================
//
// Many threads allocating and releasing through one SpaceManager. These
// require multi-threaded execution and cannot live inline.

use std::sync::{Arc, Barrier};
use std::thread;

use blockcache::space::SpaceManager;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const THREADS: usize = 100;
const SPACE: u64 = 16 * 1024 * 1024;

// ==============================================
// Allocate / Release Storm
// ==============================================
//
// Every thread allocates a batch of random sizes, writes nothing, and then
// releases everything. Afterwards the space must be one free division again.

mod storm {
    use super::*;

    #[test]
    fn concurrent_allocate_release_restores_whole_space() {
        let space = Arc::new(SpaceManager::new(0, SPACE).unwrap());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let space = Arc::clone(&space);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut rng = SmallRng::seed_from_u64(t as u64);
                    barrier.wait();
                    for _ in 0..20 {
                        let mut held = Vec::new();
                        for _ in 0..8 {
                            let size = rng.random_range(1..=8192u64);
                            match space.allocate(size) {
                                Ok(addr) => held.push(addr),
                                Err(err) => assert!(err.is_out_of_space(), "{err}"),
                            }
                        }
                        for addr in held {
                            space.release(addr).unwrap();
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        space.check_invariants().unwrap();
        assert_eq!(space.free_bytes(), SPACE);
        assert_eq!(space.division_count(), 1);
        let whole = space.allocate(SPACE).unwrap();
        assert_eq!(whole, 0);
    }

    #[test]
    fn concurrent_allocations_never_overlap() {
        let space = Arc::new(SpaceManager::new(0, SPACE).unwrap());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let space = Arc::clone(&space);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut rng = SmallRng::seed_from_u64(1000 + t as u64);
                    barrier.wait();
                    (0..16)
                        .filter_map(|_| {
                            let addr = space.allocate(rng.random_range(1..=4096u64)).ok()?;
                            Some((addr, space.accessible_size(addr).ok()?))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut extents: Vec<(u64, u64)> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        extents.sort_unstable();
        for pair in extents.windows(2) {
            let (a, a_len) = pair[0];
            let (b, _) = pair[1];
            assert!(a + a_len <= b, "extent {a:#x}+{a_len} overlaps {b:#x}");
        }
        space.check_invariants().unwrap();
    }
}

// ==============================================
// Extension Under Load
// ==============================================

mod extension {
    use super::*;

    #[test]
    fn extend_while_allocating_keeps_prior_extents() {
        let chunk = 1024 * 1024;
        let space = Arc::new(SpaceManager::new(8 * chunk, chunk).unwrap());
        let pinned = space.allocate(4096).unwrap();
        let barrier = Arc::new(Barrier::new(9));

        let grower = {
            let space = Arc::clone(&space);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 1..=4 {
                    // Grow behind, then in front.
                    space.extend(space.end(), chunk).unwrap();
                    space.extend(8 * chunk - i * chunk, chunk).unwrap();
                }
            })
        };

        let workers: Vec<_> = (0..8)
            .map(|t| {
                let space = Arc::clone(&space);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut rng = SmallRng::seed_from_u64(t);
                    barrier.wait();
                    for _ in 0..200 {
                        if let Ok(addr) = space.allocate(rng.random_range(1..=2048u64)) {
                            space.release(addr).unwrap();
                        }
                    }
                })
            })
            .collect();

        grower.join().unwrap();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(space.base(), 4 * chunk);
        assert_eq!(space.end(), 13 * chunk);
        assert_eq!(space.accessible_size(pinned).unwrap(), 4096);
        space.release(pinned).unwrap();
        assert_eq!(space.free_bytes(), 9 * chunk);
        space.check_invariants().unwrap();
    }
}

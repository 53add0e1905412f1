// ==============================================
// EVICTION LIST REFERENCE MODEL (integration)
// ==============================================
//
// Two lists sharing one slot pool, driven by a seeded RNG and compared after
// every step against VecDeque models (front = MRU).

use std::collections::VecDeque;

use blockcache::ds::{EvictionList, SlotIndex, SlotPool};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const CAPACITY: usize = 64;

struct Model {
    lists: [EvictionList; 2],
    refs: [VecDeque<(SlotIndex, u32)>; 2],
}

impl Model {
    fn assert_matches(&self, pool: &SlotPool<u32>) {
        for (list, reference) in self.lists.iter().zip(&self.refs) {
            list.check_invariants(pool).unwrap();
            let got: Vec<(SlotIndex, u32)> = list.iter(pool).map(|(i, v)| (i, *v)).collect();
            let want: Vec<(SlotIndex, u32)> = reference.iter().copied().collect();
            assert_eq!(got, want);
            assert_eq!(list.mru(pool), reference.front().map(|(i, _)| *i));
            assert_eq!(list.lru(pool), reference.back().map(|(i, _)| *i));
        }
        let total: usize = self.refs.iter().map(VecDeque::len).sum();
        assert_eq!(pool.len(), total);
    }
}

fn run(seed: u64, steps: usize) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut pool = SlotPool::new(CAPACITY, 4);
    let a = EvictionList::new(&mut pool).unwrap();
    let b = EvictionList::new(&mut pool).unwrap();
    let mut model = Model {
        lists: [a, b],
        refs: [VecDeque::new(), VecDeque::new()],
    };
    let mut next_value = 0u32;

    for _ in 0..steps {
        let which = rng.random_range(0..2usize);
        let other = 1 - which;
        let [first, second] = &mut model.lists;
        let (list, from) = if which == 0 { (first, second) } else { (second, first) };
        let len = model.refs[which].len();

        match rng.random_range(0..7u8) {
            0 | 1 => {
                let full = pool.len() == CAPACITY;
                match list.push_mru(&mut pool, next_value) {
                    Ok(idx) => model.refs[which].push_front((idx, next_value)),
                    Err(_) => assert!(full),
                }
                next_value += 1;
            },
            2 => {
                if let Ok(idx) = list.push_lru(&mut pool, next_value) {
                    model.refs[which].push_back((idx, next_value));
                }
                next_value += 1;
            },
            3 => {
                let got = list.pop_lru(&mut pool);
                assert_eq!(got, model.refs[which].pop_back());
            },
            4 if len > 0 => {
                let pos = rng.random_range(0..len);
                let (idx, value) = model.refs[which][pos];
                list.move_to_mru(&mut pool, idx).unwrap();
                model.refs[which].remove(pos);
                model.refs[which].push_front((idx, value));
            },
            5 if len > 0 => {
                let pos = rng.random_range(0..len);
                let (idx, value) = model.refs[which][pos];
                assert_eq!(list.remove(&mut pool, idx).unwrap(), value);
                model.refs[which].remove(pos);
                // Removing again is an error, not a panic.
                assert!(list.remove(&mut pool, idx).is_err());
            },
            6 if !model.refs[other].is_empty() => {
                let pos = rng.random_range(0..model.refs[other].len());
                let (idx, value) = model.refs[other][pos];
                list.adopt_mru(&mut pool, from, idx).unwrap();
                model.refs[other].remove(pos);
                model.refs[which].push_front((idx, value));
            },
            _ => {
                let got = list.pop_mru(&mut pool);
                assert_eq!(got, model.refs[which].pop_front());
            },
        }
        model.assert_matches(&pool);
    }
}

#[test]
fn matches_reference_for_several_seeds() {
    for seed in 0..8 {
        run(seed, 5_000);
    }
}

#[test]
fn indices_are_reused_after_release() {
    let mut pool = SlotPool::new(2, 2);
    let mut list = EvictionList::new(&mut pool).unwrap();
    let a = list.push_mru(&mut pool, 1u32).unwrap();
    let _b = list.push_mru(&mut pool, 2).unwrap();
    assert!(list.push_mru(&mut pool, 3).is_err());

    assert_eq!(list.remove(&mut pool, a).unwrap(), 1);
    let c = list.push_mru(&mut pool, 3).unwrap();
    assert_eq!(c, a);
}

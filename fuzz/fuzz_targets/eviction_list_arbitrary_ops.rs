#![no_main]

use blockcache::ds::{EvictionList, SlotPool};
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary operation sequences on two EvictionLists sharing a pool
//
// Tests random sequences of push_mru, push_lru, pop_mru, pop_lru,
// move_to_mru, remove and adopt_mru, validating both lists after each step.
fuzz_target!(|data: &[u8]| {
    let mut pool: SlotPool<u8> = SlotPool::new(32, 4);
    let Ok(mut a) = EvictionList::new(&mut pool) else {
        return;
    };
    let Ok(mut b) = EvictionList::new(&mut pool) else {
        return;
    };
    let mut live = Vec::new();

    for chunk in data.chunks_exact(2) {
        let (op, arg) = (chunk[0], chunk[1]);
        let (list, other) = if op & 0x80 == 0 { (&mut a, &mut b) } else { (&mut b, &mut a) };

        match op % 7 {
            0 => {
                if let Ok(idx) = list.push_mru(&mut pool, arg) {
                    live.push(idx);
                    assert_eq!(list.mru(&pool), Some(idx));
                }
            }
            1 => {
                if let Ok(idx) = list.push_lru(&mut pool, arg) {
                    live.push(idx);
                    assert_eq!(list.lru(&pool), Some(idx));
                }
            }
            2 => {
                let old_len = list.len();
                if let Some((idx, _)) = list.pop_mru(&mut pool) {
                    live.retain(|i| *i != idx);
                    assert_eq!(list.len(), old_len - 1);
                }
            }
            3 => {
                if let Some((idx, _)) = list.pop_lru(&mut pool) {
                    live.retain(|i| *i != idx);
                }
            }
            4 if !live.is_empty() => {
                let idx = live[arg as usize % live.len()];
                if list.move_to_mru(&mut pool, idx).is_ok() {
                    assert_eq!(list.mru(&pool), Some(idx));
                }
            }
            5 if !live.is_empty() => {
                let idx = live[arg as usize % live.len()];
                if list.remove(&mut pool, idx).is_ok() {
                    live.retain(|i| *i != idx);
                    assert!(!list.contains(&pool, idx));
                }
            }
            6 if !live.is_empty() => {
                let idx = live[arg as usize % live.len()];
                if list.adopt_mru(&mut pool, other, idx).is_ok() {
                    assert!(list.contains(&pool, idx));
                    assert!(!other.contains(&pool, idx));
                }
            }
            _ => {}
        }

        a.check_invariants(&pool).unwrap();
        b.check_invariants(&pool).unwrap();
        assert_eq!(a.len() + b.len(), pool.len());
    }
});

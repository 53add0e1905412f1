#![no_main]

use blockcache::space::SpaceManager;
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary allocate / try_allocate / release / extend sequences
//
// The partition invariant (no gaps, no overlaps, no adjacent free
// divisions) must hold after every operation, and releasing everything
// must leave exactly one free division.
fuzz_target!(|data: &[u8]| {
    let Ok(space) = SpaceManager::new(1 << 20, 64 * 1024) else {
        return;
    };
    let mut held: Vec<u64> = Vec::new();

    for chunk in data.chunks_exact(3) {
        let size = u64::from(u16::from_le_bytes([chunk[1], chunk[2]])) + 1;
        match chunk[0] % 5 {
            0 | 1 => {
                if let Ok(addr) = space.allocate(size) {
                    assert!(space.accessible_size(addr).unwrap() >= size);
                    held.push(addr);
                }
            }
            2 => {
                if let Ok(addr) = space.try_allocate(size) {
                    held.push(addr);
                }
            }
            3 if !held.is_empty() => {
                let addr = held.swap_remove(size as usize % held.len());
                space.release(addr).unwrap();
            }
            4 => {
                let grow = size.next_multiple_of(space.alignment());
                let result = if chunk[1] & 1 == 0 {
                    space.extend(space.end(), grow)
                } else {
                    match space.base().checked_sub(grow) {
                        Some(offset) => space.extend(offset, grow),
                        None => Ok(()),
                    }
                };
                assert!(result.is_ok());
            }
            _ => {}
        }
        space.check_invariants().unwrap();
    }

    for addr in held {
        space.release(addr).unwrap();
    }
    assert_eq!(space.division_count(), 1);
    assert_eq!(space.free_bytes(), space.size());
});

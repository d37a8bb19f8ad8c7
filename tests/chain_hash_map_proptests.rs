// ChainHashMap property tests over the public API.
//
// Property 1: cursor validity follows the entry it names.
//  - Model: set of present keys, plus cursors collected from insert/find
//    tagged with the key and the capacity seen when they were taken.
//  - Invariant: a cursor resolves to its key iff the key has not been
//    erased since and the capacity has not changed since; otherwise it
//    reports `Stale`.
//  - Operations: insert, find, erase via cursor, remove by key.
//
// Property 2: every stored value is dropped exactly once.
//  - Model: count of values handed to the map vs. drops observed.
//  - Invariant: live values == len(); after the map is dropped, every
//    value created has been dropped once.
//  - Operations: insert (duplicates drop the rejected value), remove,
//    erase-while-walking, clear, clone.
use chain_hashmap::{ChainHashMap, Cursor, CursorError, InsertError};
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

// Property 1: cursor validity.
proptest! {
    #[test]
    fn prop_cursor_validity(keys in 1u32..=40, ops in proptest::collection::vec((0u8..=3u8, 0u32..1000u32), 1..150)) {
        let mut m: ChainHashMap<u32, u32> = ChainHashMap::new();
        let mut present: HashSet<u32> = HashSet::new();
        // (cursor, key, capacity when taken, erased since)
        let mut held: Vec<(Cursor, u32, usize, bool)> = Vec::new();

        for (op, raw_k) in ops {
            let k = raw_k % keys;
            match op {
                // Insert; a fresh cursor is recorded on success.
                0 => match m.insert(k, k + 1) {
                    Ok(at) => {
                        prop_assert!(present.insert(k));
                        held.push((at, k, m.capacity(), false));
                    }
                    Err(InsertError::DuplicateKey) => prop_assert!(present.contains(&k)),
                    Err(e) => prop_assert!(false, "unexpected {}", e),
                },
                // Find; records a cursor when present.
                1 => {
                    let found = m.find(&k);
                    prop_assert_eq!(found.is_some(), present.contains(&k));
                    if let Some(at) = found {
                        held.push((at, k, m.capacity(), false));
                    }
                }
                // Erase through a cursor from find.
                2 => {
                    if let Some(at) = m.find(&k) {
                        m.erase(at).unwrap();
                        present.remove(&k);
                        for h in held.iter_mut().filter(|h| h.1 == k) {
                            h.3 = true;
                        }
                    }
                }
                // Remove by key.
                3 => {
                    let removed = m.remove(&k);
                    prop_assert_eq!(removed.is_some(), present.remove(&k));
                    if removed.is_some() {
                        for h in held.iter_mut().filter(|h| h.1 == k) {
                            h.3 = true;
                        }
                    }
                }
                _ => unreachable!(),
            }

            // Invariant after each step: held cursors resolve iff their entry
            // and the layout they were taken under both survive.
            for &(at, key, capacity, erased) in &held {
                let got = m.get_at(at);
                if erased || capacity != m.capacity() {
                    prop_assert_eq!(got, Err(CursorError::Stale));
                } else {
                    prop_assert_eq!(got, Ok((&key, &(key + 1))));
                }
            }
            prop_assert_eq!(m.len(), present.len());
        }
    }
}

// ---- Property 2: drop accounting ----
#[derive(Clone)]
struct Tracked {
    drops: Rc<Cell<usize>>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

proptest! {
    #[test]
    fn prop_values_dropped_exactly_once(ops in proptest::collection::vec((0u8..=4u8, 0u16..64u16), 1..150)) {
        let drops = Rc::new(Cell::new(0usize));
        let mut created = 0usize;
        let mut m: ChainHashMap<u16, Tracked> = ChainHashMap::new();

        for (op, k) in ops {
            match op {
                0 => {
                    created += 1;
                    let _ = m.insert(k, Tracked { drops: drops.clone() });
                }
                1 => {
                    drop(m.remove(&k));
                }
                // Erase every entry with an even key while walking.
                2 => {
                    let mut at = m.begin();
                    while !at.is_end() {
                        let key = *m.get_at(at).unwrap().0;
                        at = if key % 2 == 0 { m.erase(at).unwrap() } else { m.advance(at).unwrap() };
                    }
                    prop_assert!(m.keys().all(|key| key % 2 == 1));
                }
                3 => m.clear(),
                // A clone adds copies; dropping it must release exactly those.
                4 => {
                    let copy = m.clone();
                    created += copy.len();
                    drop(copy);
                }
                _ => unreachable!(),
            }
            prop_assert_eq!(created - drops.get(), m.len());
        }

        drop(m);
        prop_assert_eq!(drops.get(), created);
    }
}

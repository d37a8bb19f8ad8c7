#![cfg(test)]

// Property tests for ChainHashMap kept inside the crate so they can check
// the structural invariants of the underlying table after every step.

use crate::chain_hash_map::{ChainHashMap, InsertError};
use crate::cursor::{Cursor, CursorError};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hasher};

// Hashes every key to its low bits so a handful of keys share chains and
// growth thresholds are crossed with few inserts.
#[derive(Clone, Default)]
struct LowBitsBuildHasher;
struct LowBitsHasher(u64);
impl BuildHasher for LowBitsBuildHasher {
    type Hasher = LowBitsHasher;
    fn build_hasher(&self) -> Self::Hasher {
        LowBitsHasher(0)
    }
}
impl Hasher for LowBitsHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(u64::from(b));
        }
    }
    fn finish(&self) -> u64 {
        self.0 & 0x1f
    }
}

type Map = ChainHashMap<u16, i32, LowBitsBuildHasher>;

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, i32),
    TryEmplace(u16, i32),
    GetOrDefault(u16),
    Remove(u16),
    EraseFound(u16),
    Find(u16),
    Mutate(u16, i32),
    EraseEveryOther,
    Reserve(u8),
    Clear,
}

fn arb_op(keys: u16) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..keys, any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => (0..keys, any::<i32>()).prop_map(|(k, v)| Op::TryEmplace(k, v)),
        1 => (0..keys).prop_map(Op::GetOrDefault),
        2 => (0..keys).prop_map(Op::Remove),
        2 => (0..keys).prop_map(Op::EraseFound),
        2 => (0..keys).prop_map(Op::Find),
        1 => (0..keys, any::<i32>()).prop_map(|(k, d)| Op::Mutate(k, d)),
        1 => Just(Op::EraseEveryOther),
        1 => any::<u8>().prop_map(Op::Reserve),
        1 => Just(Op::Clear),
    ]
}

fn snapshot(m: &Map) -> BTreeMap<u16, i32> {
    m.iter().map(|(k, v)| (*k, *v)).collect()
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate keys are rejected and keep their value; `try_emplace` runs its
//   constructor only on success.
// - `find`/`get` agree with the model; `erase` via a found cursor removes
//   exactly that key.
// - Erase-while-walking through `erase`'s return value removes exactly the
//   entries chosen and visits every other entry once.
// - `len` equals the model size and the structural invariants hold after
//   every step, across growth, reserve, free-slot reuse and clear.
proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(keys in 1u16..120, ops in proptest::collection::vec(arb_op(120), 1..200)) {
        let mut sut = Map::default();
        let mut model: HashMap<u16, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let k = k % keys;
                    match sut.insert(k, v) {
                        Ok(at) => {
                            prop_assert!(!model.contains_key(&k));
                            prop_assert_eq!(sut.get_at(at).unwrap(), (&k, &v));
                            model.insert(k, v);
                        }
                        Err(InsertError::DuplicateKey) => {
                            prop_assert!(model.contains_key(&k));
                        }
                        Err(InsertError::Capacity(e)) => prop_assert!(false, "{}", e),
                    }
                }
                Op::TryEmplace(k, v) => {
                    let k = k % keys;
                    let mut built = false;
                    let res = sut.try_emplace(k, || { built = true; v });
                    prop_assert_eq!(built, res.is_ok());
                    prop_assert_eq!(res.is_ok(), !model.contains_key(&k));
                    model.entry(k).or_insert(v);
                }
                Op::GetOrDefault(k) => {
                    let k = k % keys;
                    let got = *sut.get_or_insert_default(k).unwrap();
                    let expected = *model.entry(k).or_insert(0);
                    prop_assert_eq!(got, expected);
                }
                Op::Remove(k) => {
                    let k = k % keys;
                    prop_assert_eq!(sut.remove(&k), model.remove(&k));
                }
                Op::EraseFound(k) => {
                    let k = k % keys;
                    match sut.find(&k) {
                        Some(at) => {
                            let next = sut.erase(at).unwrap();
                            prop_assert!(model.remove(&k).is_some());
                            prop_assert_eq!(sut.get_at(at), Err(CursorError::Stale));
                            if !next.is_end() {
                                prop_assert!(sut.get_at(next).is_ok());
                            }
                        }
                        None => prop_assert!(!model.contains_key(&k)),
                    }
                }
                Op::Find(k) => {
                    let k = k % keys;
                    prop_assert_eq!(sut.get(&k), model.get(&k));
                    prop_assert_eq!(sut.find(&k).is_some(), model.contains_key(&k));
                }
                Op::Mutate(k, d) => {
                    let k = k % keys;
                    if let Some(v) = sut.get_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = model.get_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                }
                Op::EraseEveryOther => {
                    let before = sut.len();
                    let mut at: Cursor = sut.begin();
                    let mut visited = 0;
                    while !at.is_end() {
                        let k = *sut.get_at(at).unwrap().0;
                        if visited % 2 == 0 {
                            at = sut.erase(at).unwrap();
                            model.remove(&k);
                        } else {
                            at = sut.advance(at).unwrap();
                        }
                        visited += 1;
                    }
                    prop_assert_eq!(visited, before);
                }
                Op::Reserve(n) => {
                    let capacity = sut.capacity();
                    sut.reserve(usize::from(n)).unwrap();
                    prop_assert!(sut.capacity() >= capacity);
                    prop_assert!(sut.capacity() >= sut.len() + usize::from(n));
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                    prop_assert_eq!(sut.capacity(), 0);
                }
            }

            sut.assert_invariants();
            prop_assert_eq!(sut.len(), model.len());
            let expected: BTreeMap<u16, i32> = model.iter().map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(snapshot(&sut), expected);
        }
    }
}

// Property: a clone compares equal, shares nothing with its source, and
// rejects the source's cursors.
proptest! {
    #[test]
    fn prop_clone_is_independent(pairs in proptest::collection::vec((any::<u16>(), any::<i32>()), 0..80), extra in any::<u16>()) {
        let source: Map = pairs.iter().copied().collect();
        let mut copy = source.clone();
        copy.assert_invariants();
        prop_assert!(copy == source);

        if let Some(at) = source.find(&extra) {
            prop_assert_eq!(copy.get_at(at), Err(CursorError::WrongMap));
        }

        let before = snapshot(&source);
        copy.get_or_insert_default(extra).unwrap();
        if let Some(v) = copy.get_mut(&extra) {
            *v = v.wrapping_add(1);
        }
        prop_assert_eq!(snapshot(&source), before);
        prop_assert!(copy != source);
    }
}

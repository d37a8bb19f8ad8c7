//! RawTable: the structural layer under `ChainHashMap`.
//!
//! Two arrays linked by indices:
//! - `buckets[b]` is the index of the first entry whose cached hash maps to
//!   `b`, or `NIL` when the bucket is empty.
//! - `entries` is an arena. Occupied slots link to the next entry of their
//!   bucket chain; vacant slots link to the next free slot.
//!
//! `entries.len()` is the high-water mark of slots ever handed out; erased
//! slots go on the free list and are reused before the arena is extended.
//! Slot indices never change, not even when the table grows, which is what
//! lets growth keep the free list and lets cursors name slots by index.
//!
//! Nothing in this layer calls user code: hashes are computed by the caller
//! and cached per entry, and key comparison is passed in as a closure.

use crate::cursor::{CursorError, Position};
use crate::primes::{self, CapacityError};
use core::mem;

/// Link value meaning "no entry".
pub(crate) const NIL: usize = usize::MAX;

#[derive(Debug)]
pub(crate) enum Slot<K, V> {
    Occupied {
        hash: u64,
        key: K,
        value: V,
        next: usize,
    },
    Vacant {
        next_free: usize,
    },
}

#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    /// Bumped each time the slot is vacated so cursors to the old occupant
    /// stop resolving.
    pub(crate) generation: u32,
    pub(crate) slot: Slot<K, V>,
}

impl<K, V> Entry<K, V> {
    #[inline]
    pub(crate) fn chain_next(&self) -> usize {
        match self.slot {
            Slot::Occupied { next, .. } => next,
            Slot::Vacant { .. } => unreachable!("vacant slot linked into a bucket chain"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct RawTable<K, V> {
    pub(crate) buckets: Vec<usize>,
    pub(crate) entries: Vec<Entry<K, V>>,
    free_head: usize,
    free_count: usize,
    /// Bumped whenever the arrays are replaced (growth, clear).
    pub(crate) epoch: u64,
}

impl<K, V> RawTable<K, V> {
    pub(crate) const fn new() -> Self {
        Self {
            buckets: Vec::new(),
            entries: Vec::new(),
            free_head: NIL,
            free_count: 0,
            epoch: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len() - self.free_count
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    /// Index of the entry with this hash for which `is_match` holds, or `NIL`.
    pub(crate) fn find(&self, hash: u64, mut is_match: impl FnMut(&K) -> bool) -> usize {
        if self.buckets.is_empty() {
            return NIL;
        }
        let mut current = self.buckets[self.bucket_of(hash)];
        while current != NIL {
            let entry = &self.entries[current];
            if let Slot::Occupied {
                hash: cached, key, ..
            } = &entry.slot
            {
                if *cached == hash && is_match(key) {
                    return current;
                }
            }
            current = entry.chain_next();
        }
        NIL
    }

    /// Grows to the smallest supported capacity holding `min_capacity`
    /// entries. Never shrinks.
    pub(crate) fn reserve(&mut self, min_capacity: usize) -> Result<(), CapacityError> {
        if min_capacity <= self.capacity() {
            return Ok(());
        }
        let capacity = primes::get_prime(min_capacity)?;
        self.resize_to(capacity);
        Ok(())
    }

    fn resize_to(&mut self, capacity: usize) {
        debug_assert!(capacity > self.buckets.len());
        log::debug!(
            "resizing table from {} to {} buckets with {} live entries",
            self.buckets.len(),
            capacity,
            self.len()
        );
        self.entries.reserve_exact(capacity - self.entries.len());
        let mut buckets = vec![NIL; capacity];
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if let Slot::Occupied { hash, next, .. } = &mut entry.slot {
                let bucket = (*hash % capacity as u64) as usize;
                *next = buckets[bucket];
                buckets[bucket] = index;
            }
        }
        self.buckets = buckets;
        self.epoch += 1;
    }

    /// Makes sure `place` has a slot to fill: allocates on first use and
    /// grows when the arena is full and the free list is empty.
    fn ensure_vacancy(&mut self) -> Result<(), CapacityError> {
        if self.buckets.is_empty() {
            let capacity = primes::get_prime(0)?;
            self.resize_to(capacity);
        } else if self.free_count == 0 && self.entries.len() == self.buckets.len() {
            let capacity = primes::expand_prime(self.buckets.len())?;
            self.resize_to(capacity);
        }
        Ok(())
    }

    /// Stores a new entry at the head of its bucket chain and returns its
    /// index. The caller has already ruled out a duplicate key. On error the
    /// table is unchanged.
    pub(crate) fn place(&mut self, hash: u64, key: K, value: V) -> Result<usize, CapacityError> {
        self.ensure_vacancy()?;
        let bucket = self.bucket_of(hash);
        let slot = Slot::Occupied {
            hash,
            key,
            value,
            next: self.buckets[bucket],
        };
        let index = if self.free_count > 0 {
            let index = self.free_head;
            let entry = &mut self.entries[index];
            let next_free = match entry.slot {
                Slot::Vacant { next_free } => next_free,
                Slot::Occupied { .. } => unreachable!("free list reached an occupied slot"),
            };
            entry.slot = slot;
            self.free_head = next_free;
            self.free_count -= 1;
            index
        } else {
            self.entries.push(Entry {
                generation: 0,
                slot,
            });
            self.entries.len() - 1
        };
        self.buckets[bucket] = index;
        Ok(index)
    }

    /// Detaches the occupied entry at `index` from its chain, pushes the slot
    /// on the free list and returns the pair together with the index of the
    /// entry that followed it in iteration order (`NIL` at the end).
    pub(crate) fn unlink(&mut self, index: usize) -> (K, V, usize) {
        let (hash, chain_next) = match self.entries[index].slot {
            Slot::Occupied { hash, next, .. } => (hash, next),
            Slot::Vacant { .. } => unreachable!("unlinking a vacant slot"),
        };
        let bucket = self.bucket_of(hash);

        if self.buckets[bucket] == index {
            self.buckets[bucket] = chain_next;
        } else {
            let mut prev = self.buckets[bucket];
            while self.entries[prev].chain_next() != index {
                prev = self.entries[prev].chain_next();
            }
            if let Slot::Occupied { next, .. } = &mut self.entries[prev].slot {
                *next = chain_next;
            }
        }

        let entry = &mut self.entries[index];
        let vacated = mem::replace(
            &mut entry.slot,
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        entry.generation = entry.generation.wrapping_add(1);
        self.free_head = index;
        self.free_count += 1;

        let following = if chain_next != NIL {
            chain_next
        } else {
            self.chain_head_from(bucket + 1)
        };
        match vacated {
            Slot::Occupied { key, value, .. } => (key, value, following),
            Slot::Vacant { .. } => unreachable!("unlinking a vacant slot"),
        }
    }

    /// Drops back to the never-allocated state and hands the old arena to
    /// the caller, who decides when the payloads are dropped.
    pub(crate) fn release(&mut self) -> Vec<Entry<K, V>> {
        log::debug!(
            "releasing table of {} buckets with {} live entries",
            self.buckets.len(),
            self.len()
        );
        self.buckets = Vec::new();
        self.free_head = NIL;
        self.free_count = 0;
        self.epoch += 1;
        mem::take(&mut self.entries)
    }

    /// First chain head at or after `bucket`, or `NIL`.
    fn chain_head_from(&self, bucket: usize) -> usize {
        self.buckets
            .get(bucket..)
            .and_then(|rest| rest.iter().copied().find(|&head| head != NIL))
            .unwrap_or(NIL)
    }

    pub(crate) fn first_index(&self) -> usize {
        self.chain_head_from(0)
    }

    /// Successor of an occupied entry in iteration order: the rest of its
    /// chain, then the following non-empty buckets.
    pub(crate) fn next_index(&self, index: usize) -> usize {
        match self.entries[index].slot {
            Slot::Occupied { hash, next, .. } if next == NIL => {
                self.chain_head_from(self.bucket_of(hash) + 1)
            }
            Slot::Occupied { next, .. } => next,
            Slot::Vacant { .. } => unreachable!("iterating from a vacant slot"),
        }
    }

    pub(crate) fn position(&self, index: usize) -> Option<Position> {
        self.entries.get(index).map(|entry| Position {
            index,
            generation: entry.generation,
        })
    }

    /// Checks that `position`, taken at `epoch`, still names the same live
    /// entry.
    pub(crate) fn resolve(&self, position: Position, epoch: u64) -> Result<usize, CursorError> {
        if epoch != self.epoch {
            return Err(CursorError::Stale);
        }
        match self.entries.get(position.index) {
            Some(Entry {
                generation,
                slot: Slot::Occupied { .. },
            }) if *generation == position.generation => Ok(position.index),
            _ => Err(CursorError::Stale),
        }
    }

    pub(crate) fn pair_at(&self, index: usize) -> Option<(&K, &V)> {
        match self.entries.get(index) {
            Some(Entry {
                slot: Slot::Occupied { key, value, .. },
                ..
            }) => Some((key, value)),
            _ => None,
        }
    }

    pub(crate) fn pair_at_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        match self.entries.get_mut(index) {
            Some(Entry {
                slot: Slot::Occupied { key, value, .. },
                ..
            }) => Some((&*key, value)),
            _ => None,
        }
    }

    pub(crate) fn value_mut(&mut self, index: usize) -> &mut V {
        match &mut self.entries[index].slot {
            Slot::Occupied { value, .. } => value,
            Slot::Vacant { .. } => unreachable!("value of a vacant slot"),
        }
    }
}

#[cfg(test)]
impl<K, V> RawTable<K, V> {
    /// Walks every chain and the free list and asserts the structural
    /// invariants. `same_key` is the map's key equality.
    pub(crate) fn check_invariants(&self, same_key: impl Fn(&K, &K) -> bool) {
        if self.buckets.is_empty() {
            assert!(self.entries.is_empty());
            assert_eq!(self.free_count, 0);
            assert_eq!(self.free_head, NIL);
            return;
        }
        assert!(self.entries.len() <= self.buckets.len());
        assert!(primes::is_prime(self.buckets.len()));

        let mut reached = vec![false; self.entries.len()];
        let mut live = 0;
        for (bucket, &head) in self.buckets.iter().enumerate() {
            let mut chain: Vec<(u64, &K)> = Vec::new();
            let mut current = head;
            while current != NIL {
                let Slot::Occupied { hash, key, next, .. } = &self.entries[current].slot else {
                    panic!("bucket {bucket} chains through vacant slot {current}");
                };
                assert_eq!(self.bucket_of(*hash), bucket, "slot {current} in wrong bucket");
                assert!(!reached[current], "slot {current} reachable twice");
                for (other_hash, other_key) in &chain {
                    assert!(
                        !(*other_hash == *hash && same_key(*other_key, key)),
                        "duplicate key in bucket {bucket}"
                    );
                }
                reached[current] = true;
                chain.push((*hash, key));
                live += 1;
                current = *next;
            }
        }

        let mut free = 0;
        let mut current = self.free_head;
        while current != NIL {
            let Slot::Vacant { next_free } = &self.entries[current].slot else {
                panic!("free list reaches occupied slot {current}");
            };
            assert!(!reached[current], "slot {current} both chained and free");
            reached[current] = true;
            free += 1;
            current = *next_free;
        }

        assert_eq!(free, self.free_count);
        assert_eq!(live, self.len());
        assert!(reached.iter().all(|&r| r), "slot neither chained nor free");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn same(a: &u64, b: &u64) -> bool {
        a == b
    }

    fn place_all(table: &mut RawTable<u64, u64>, keys: &[u64]) -> Vec<usize> {
        keys.iter()
            .map(|&k| table.place(k, k, k * 10).unwrap())
            .collect()
    }

    #[test]
    fn starts_unallocated() {
        let table: RawTable<u64, u64> = RawTable::new();
        assert_eq!(table.capacity(), 0);
        assert_eq!(table.len(), 0);
        assert_eq!(table.find(7, |_| true), NIL);
        assert_eq!(table.first_index(), NIL);
        table.check_invariants(same);
    }

    #[test]
    fn first_place_allocates_smallest_prime() {
        let mut table = RawTable::new();
        place_all(&mut table, &[5]);
        assert_eq!(table.capacity(), 3);
        assert_eq!(table.epoch, 1);
        table.check_invariants(same);
    }

    #[test]
    fn growth_follows_expand_prime_and_keeps_indices() {
        let mut table = RawTable::new();
        let indices = place_all(&mut table, &[0, 1, 2, 3]);
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(table.capacity(), 7);
        for (k, &index) in indices.iter().enumerate() {
            assert_eq!(table.find(k as u64, |&key| key == k as u64), index);
        }
        table.check_invariants(same);
    }

    #[test]
    fn erased_slots_are_reused_last_in_first_out() {
        let mut table = RawTable::new();
        place_all(&mut table, &[10, 11, 12]);
        let (k, v, _) = table.unlink(0);
        assert_eq!((k, v), (10, 100));
        let _ = table.unlink(2);
        table.check_invariants(same);
        assert_eq!(table.len(), 1);

        let reused = place_all(&mut table, &[20, 21]);
        assert_eq!(reused, vec![2, 0]);
        assert_eq!(table.capacity(), 3, "free slots are used before growing");
        table.check_invariants(same);
    }

    #[test]
    fn unlink_patches_middle_of_chain() {
        let mut table = RawTable::new();
        // Same bucket for every key under capacity 3.
        place_all(&mut table, &[3, 6, 9]);
        assert_eq!(table.buckets[0], 2);
        let (k, _, following) = table.unlink(1);
        assert_eq!(k, 6);
        assert_eq!(following, 0);
        assert_eq!(table.find(3, |&key| key == 3), 0);
        assert_eq!(table.find(9, |&key| key == 9), 2);
        assert_eq!(table.find(6, |&key| key == 6), NIL);
        table.check_invariants(same);
    }

    #[test]
    fn unlink_reports_next_bucket_at_chain_end() {
        let mut table = RawTable::new();
        place_all(&mut table, &[0, 1]);
        // Bucket 0 holds slot 0 alone; bucket 1 holds slot 1.
        let (_, _, following) = table.unlink(0);
        assert_eq!(following, 1);
        let (_, _, following) = table.unlink(1);
        assert_eq!(following, NIL);
        assert_eq!(table.len(), 0);
        table.check_invariants(same);
    }

    #[test]
    fn resolve_rejects_vacated_and_relocated_slots() {
        let mut table = RawTable::new();
        place_all(&mut table, &[1]);
        let pos = table.position(0).unwrap();
        assert_eq!(table.resolve(pos, table.epoch), Ok(0));

        let _ = table.unlink(0);
        assert_eq!(table.resolve(pos, table.epoch), Err(CursorError::Stale));

        place_all(&mut table, &[2]);
        assert_eq!(
            table.resolve(pos, table.epoch),
            Err(CursorError::Stale),
            "reused slot has a new generation"
        );
        let fresh = table.position(0).unwrap();
        assert_eq!(table.resolve(fresh, table.epoch - 1), Err(CursorError::Stale));
    }

    #[test]
    fn reserve_keeps_free_list() {
        let mut table = RawTable::new();
        place_all(&mut table, &[1, 2, 3]);
        let _ = table.unlink(1);
        table.reserve(50).unwrap();
        assert_eq!(table.capacity(), 59);
        table.check_invariants(same);
        assert_eq!(place_all(&mut table, &[4]), vec![1]);
        table.check_invariants(same);
    }

    #[test]
    fn release_returns_to_empty_state() {
        let mut table = RawTable::new();
        place_all(&mut table, &[1, 2, 3, 4]);
        let old = table.release();
        assert_eq!(old.len(), 4);
        assert_eq!(table.capacity(), 0);
        assert_eq!(table.len(), 0);
        table.check_invariants(same);
    }
}

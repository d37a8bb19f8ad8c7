//! Iterators over `ChainHashMap`.
//!
//! `Iter` walks buckets left to right and follows each chain, the same
//! order the cursor API uses. The mutable and owning iterators visit the
//! same entries in arena order instead.

use crate::raw_table::{Entry, RawTable, Slot, NIL};
use core::iter::FusedIterator;

/// Shared iterator over `(&K, &V)` in bucket order.
pub struct Iter<'a, K, V> {
    table: &'a RawTable<K, V>,
    bucket: usize,
    current: usize,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(table: &'a RawTable<K, V>) -> Self {
        Self {
            table,
            bucket: 0,
            current: NIL,
            remaining: table.len(),
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let table = self.table;
        loop {
            if self.current != NIL {
                let index = self.current;
                self.current = table.entries[index].chain_next();
                self.remaining -= 1;
                return table.pair_at(index);
            }
            self.current = *table.buckets.get(self.bucket)?;
            self.bucket += 1;
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Mutable iterator over `(&K, &mut V)` in arena order.
pub struct IterMut<'a, K, V> {
    entries: core::slice::IterMut<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(table: &'a mut RawTable<K, V>) -> Self {
        let remaining = table.len();
        Self {
            entries: table.entries.iter_mut(),
            remaining,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            if let Slot::Occupied { key, value, .. } = &mut entry.slot {
                self.remaining -= 1;
                return Some((&*key, value));
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over `(K, V)` in arena order.
pub struct IntoIter<K, V> {
    entries: std::vec::IntoIter<Entry<K, V>>,
    remaining: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(table: RawTable<K, V>) -> Self {
        let remaining = table.len();
        Self {
            entries: table.entries.into_iter(),
            remaining,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            if let Slot::Occupied { key, value, .. } = entry.slot {
                self.remaining -= 1;
                return Some((key, value));
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

pub struct Keys<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

pub struct Values<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

pub struct ValuesMut<'a, K, V> {
    pub(crate) inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(keys: &[u64]) -> RawTable<u64, u64> {
        let mut table = RawTable::new();
        for &k in keys {
            table.place(k, k, k + 100).unwrap();
        }
        table
    }

    #[test]
    fn iter_follows_buckets_then_chains() {
        // Capacity 7 after four inserts; 0 and 7 share bucket 0, 7 is the head.
        let table = table_with(&[0, 7, 3, 5]);
        let keys: Vec<u64> = Iter::new(&table).map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![7, 0, 3, 5]);
    }

    #[test]
    fn iter_size_is_exact() {
        let table = table_with(&[1, 2, 3]);
        let mut it = Iter::new(&table);
        assert_eq!(it.len(), 3);
        it.next();
        assert_eq!(it.len(), 2);
        assert_eq!(it.clone().count(), 2);
        assert_eq!(it.count(), 2);
    }

    #[test]
    fn iter_on_unallocated_table_is_empty() {
        let table: RawTable<u64, u64> = RawTable::new();
        assert_eq!(Iter::new(&table).next(), None);
    }

    #[test]
    fn mutable_and_owning_iterators_skip_vacant_slots() {
        let mut table = table_with(&[1, 2, 3]);
        let _ = table.unlink(1);
        for (_, v) in IterMut::new(&mut table) {
            *v += 1;
        }
        let mut pairs: Vec<(u64, u64)> = IntoIter::new(table).collect();
        pairs.sort();
        assert_eq!(pairs, vec![(1, 102), (3, 104)]);
    }
}

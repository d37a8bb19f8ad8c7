//! ChainHashMap: public map over `RawTable`, with pluggable hashing and key
//! equality and checked cursors.

use crate::cursor::{Cursor, CursorError, MapId};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::key_eq::{KeyEq, StdEq};
use crate::primes::CapacityError;
use crate::raw_table::{RawTable, NIL};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;
use hashbrown::hash_map::DefaultHashBuilder;
use thiserror::Error;

/// Why an insertion did not store a new entry.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// The key is already present; its value was left untouched.
    #[error("key is already present")]
    DuplicateKey,
    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

/// Hash map with separate chaining over index-linked arrays.
///
/// Capacities are primes. The table allocates on first insertion, reuses
/// erased slots before growing, and roughly doubles when full. Keys are
/// unique under `E`; inserting an existing key is rejected rather than
/// overwriting.
pub struct ChainHashMap<K, V, S = DefaultHashBuilder, E = StdEq> {
    hasher: S,
    key_eq: E,
    table: RawTable<K, V>,
    id: MapId,
    reentrancy: DebugReentrancy,
}

impl<K, V> ChainHashMap<K, V> {
    /// Empty map; nothing is allocated until the first insertion.
    pub fn new() -> Self {
        Self::with_hasher_and_eq(DefaultHashBuilder::default(), StdEq)
    }

    /// Empty map already sized for `capacity` entries.
    ///
    /// # Panics
    /// If no supported capacity of at least `capacity` fits in `usize`.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut map = Self::new();
        if let Err(e) = map.reserve(capacity) {
            panic!("{e}");
        }
        map
    }
}

impl<K, V, S> ChainHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_hasher_and_eq(hasher, StdEq)
    }
}

impl<K, V, S, E> ChainHashMap<K, V, S, E> {
    pub fn with_hasher_and_eq(hasher: S, key_eq: E) -> Self {
        Self {
            hasher,
            key_eq,
            table: RawTable::new(),
            id: MapId::fresh(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets, which is also the number of entry slots. Zero
    /// until the first insertion.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn key_eq(&self) -> &E {
        &self.key_eq
    }

    /// Makes room for `additional` more entries without further growth.
    pub fn reserve(&mut self, additional: usize) -> Result<(), CapacityError> {
        let _g = self.reentrancy.enter();
        let wanted = self
            .table
            .len()
            .checked_add(additional)
            .ok_or(CapacityError::Exhausted {
                requested: usize::MAX,
            })?;
        self.table.reserve(wanted)
    }

    /// Drops every entry and releases both arrays; the map is as if newly
    /// constructed, and every outstanding cursor goes stale.
    pub fn clear(&mut self) {
        let released = {
            let _g = self.reentrancy.enter();
            self.table.release()
        };
        drop(released);
    }

    /// Cursor at the first entry in iteration order, or `end()` when empty.
    pub fn begin(&self) -> Cursor {
        self.cursor_at(self.table.first_index())
    }

    pub fn end(&self) -> Cursor {
        self.cursor_at(NIL)
    }

    /// Cursor after `at` in iteration order.
    pub fn advance(&self, at: Cursor) -> Result<Cursor, CursorError> {
        let index = self.resolve(at)?;
        Ok(self.cursor_at(self.table.next_index(index)))
    }

    pub fn get_at(&self, at: Cursor) -> Result<(&K, &V), CursorError> {
        let index = self.resolve(at)?;
        self.table.pair_at(index).ok_or(CursorError::Stale)
    }

    pub fn get_at_mut(&mut self, at: Cursor) -> Result<(&K, &mut V), CursorError> {
        let index = self.resolve(at)?;
        self.table.pair_at_mut(index).ok_or(CursorError::Stale)
    }

    /// Removes the entry at `at` and returns the cursor that followed it, so
    /// a loop can erase while walking:
    ///
    /// ```
    /// use chain_hashmap::ChainHashMap;
    ///
    /// let mut m: ChainHashMap<i32, i32> = [(1, 2), (2, 3), (5, 6)].into_iter().collect();
    /// let mut at = m.begin();
    /// while !at.is_end() {
    ///     at = m.erase(at).unwrap();
    /// }
    /// assert!(m.is_empty());
    /// ```
    pub fn erase(&mut self, at: Cursor) -> Result<Cursor, CursorError> {
        let _g = self.reentrancy.enter();
        let index = self.resolve(at)?;
        let (key, value, following) = self.table.unlink(index);
        let next = self.cursor_at(following);
        drop(_g);
        drop((key, value));
        Ok(next)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.table)
    }

    /// Mutable access to every value. Visits entries in storage order, which
    /// may differ from `iter()`.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.table)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    fn cursor_at(&self, index: usize) -> Cursor {
        Cursor {
            map: self.id,
            epoch: self.table.epoch,
            position: self.table.position(index),
        }
    }

    fn resolve(&self, at: Cursor) -> Result<usize, CursorError> {
        if at.map != self.id {
            return Err(CursorError::WrongMap);
        }
        let position = at.position.ok_or(CursorError::End)?;
        self.table.resolve(position, at.epoch)
    }
}

impl<K, V, S, E> ChainHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// Builds a map from `pairs` with the given collaborators. Later
    /// duplicates of a key are dropped.
    pub fn try_from_iter_with<I>(pairs: I, hasher: S, key_eq: E) -> Result<Self, CapacityError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::with_hasher_and_eq(hasher, key_eq);
        map.insert_all(pairs)?;
        Ok(map)
    }

    /// Stores `key -> value` if `key` is absent and returns its cursor.
    ///
    /// An existing key keeps its value and yields
    /// `Err(InsertError::DuplicateKey)`; no cursor to the existing entry is
    /// handed out.
    pub fn insert(&mut self, key: K, value: V) -> Result<Cursor, InsertError> {
        self.emplace_with(key, || value)
    }

    pub fn insert_pair(&mut self, (key, value): (K, V)) -> Result<Cursor, InsertError> {
        self.emplace_with(key, || value)
    }

    /// Like `insert`, but the value is only built, by `make`, once `key`
    /// is known to be absent.
    pub fn try_emplace<F>(&mut self, key: K, make: F) -> Result<Cursor, InsertError>
    where
        F: FnOnce() -> V,
    {
        self.emplace_with(key, make)
    }

    pub fn try_emplace_default(&mut self, key: K) -> Result<Cursor, InsertError>
    where
        V: Default,
    {
        self.emplace_with(key, V::default)
    }

    /// Value for `key`, inserting `V::default()` first when absent.
    pub fn get_or_insert_default(&mut self, key: K) -> Result<&mut V, CapacityError>
    where
        V: Default,
    {
        let _g = self.reentrancy.enter();
        let hash = self.hasher.hash_one(&key);
        let found = self
            .table
            .find(hash, |stored| self.key_eq.key_eq(&key, stored));
        let index = if found == NIL {
            self.table.place(hash, key, V::default())?
        } else {
            found
        };
        Ok(self.table.value_mut(index))
    }

    fn emplace_with<F>(&mut self, key: K, make: F) -> Result<Cursor, InsertError>
    where
        F: FnOnce() -> V,
    {
        let _g = self.reentrancy.enter();
        let hash = self.hasher.hash_one(&key);
        if self
            .table
            .find(hash, |stored| self.key_eq.key_eq(&key, stored))
            != NIL
        {
            return Err(InsertError::DuplicateKey);
        }
        let index = self.table.place(hash, key, make())?;
        Ok(self.cursor_at(index))
    }

    fn insert_all<I>(&mut self, pairs: I) -> Result<(), CapacityError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in pairs {
            match self.insert(key, value) {
                Ok(_) | Err(InsertError::DuplicateKey) => {}
                Err(InsertError::Capacity(e)) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<K, V, S, E> ChainHashMap<K, V, S, E>
where
    S: BuildHasher,
{
    /// Cursor at the entry for `key`, or `None` (the end position).
    pub fn find<Q>(&self, key: &Q) -> Option<Cursor>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter();
        let index = self.lookup(key);
        (index != NIL).then(|| self.cursor_at(index))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter();
        self.lookup(key) != NIL
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter();
        let index = self.lookup(key);
        self.table.pair_at(index)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter();
        let index = self.lookup(key);
        self.table.pair_at_mut(index).map(|(_, v)| v)
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter();
        let index = self.lookup(key);
        if index == NIL {
            return None;
        }
        let (k, v, _) = self.table.unlink(index);
        Some((k, v))
    }

    fn lookup<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let hash = self.hasher.hash_one(key);
        self.table
            .find(hash, |stored| KeyEq::<Q>::key_eq(&self.key_eq, key, stored.borrow()))
    }
}

#[cfg(test)]
impl<K, V, S, E> ChainHashMap<K, V, S, E>
where
    E: KeyEq<K>,
{
    pub(crate) fn assert_invariants(&self) {
        self.table
            .check_invariants(|a, b| self.key_eq.key_eq(a, b));
    }
}

impl<K, V, S, E> Default for ChainHashMap<K, V, S, E>
where
    S: Default,
    E: Default,
{
    fn default() -> Self {
        Self::with_hasher_and_eq(S::default(), E::default())
    }
}

/// Deep copy: every pair is cloned and inserted into a fresh map with the
/// same collaborators. Cursors of the source do not resolve in the copy.
impl<K, V, S, E> Clone for ChainHashMap<K, V, S, E>
where
    K: Clone + Hash,
    V: Clone,
    S: BuildHasher + Clone,
    E: KeyEq<K> + Clone,
{
    fn clone(&self) -> Self {
        let mut copy = Self::with_hasher_and_eq(self.hasher.clone(), self.key_eq.clone());
        copy.reserve(self.len())
            .expect("a copy fits in the capacity its source already reached");
        for (key, value) in self.iter() {
            let inserted = copy.insert(key.clone(), value.clone());
            debug_assert!(inserted.is_ok(), "source keys are unique");
        }
        copy
    }
}

impl<K, V, S, E> PartialEq for ChainHashMap<K, V, S, E>
where
    K: Hash,
    V: PartialEq,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S, E> Eq for ChainHashMap<K, V, S, E>
where
    K: Hash,
    V: Eq,
    S: BuildHasher,
    E: KeyEq<K>,
{
}

impl<K, V, S, E> fmt::Debug for ChainHashMap<K, V, S, E>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, Q, V, S, E> Index<&Q> for ChainHashMap<K, V, S, E>
where
    K: Borrow<Q>,
    Q: ?Sized + Hash,
    S: BuildHasher,
    E: KeyEq<Q>,
{
    type Output = V;

    /// # Panics
    /// If `key` is not present.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

/// Pairs are inserted in order; a key seen again keeps its first value.
///
/// # Panics
/// If the table cannot grow any further.
impl<K, V, S, E> FromIterator<(K, V)> for ChainHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher + Default,
    E: KeyEq<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        match Self::try_from_iter_with(iter, S::default(), E::default()) {
            Ok(map) => map,
            Err(e) => panic!("{e}"),
        }
    }
}

/// Same first-wins rule as `FromIterator`.
impl<K, V, S, E> Extend<(K, V)> for ChainHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        if let Err(e) = self.insert_all(iter) {
            panic!("{e}");
        }
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a ChainHashMap<K, V, S, E> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a mut ChainHashMap<K, V, S, E> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S, E> IntoIterator for ChainHashMap<K, V, S, E> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.table)
    }
}

//! chain-hashmap: a single-threaded, separate-chaining hash map over
//! index-linked arrays, with prime capacities and checked cursors.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a hash map whose every structural step is an index operation on
//!   two flat arrays, so growth and deletion never invalidate slot indices
//!   and never need per-entry allocations.
//! - Layers:
//!   - `primes`: the sizing policy. Capacities come from a curated prime
//!     table, then from a trial-division search; growth roughly doubles.
//!   - `RawTable<K, V>`: bucket array + entry arena + free list. Knows
//!     nothing about hashing or equality beyond a cached `u64` per entry
//!     and a match closure, so it never calls user code.
//!   - `ChainHashMap<K, V, S, E>`: public API. Owns the hasher `S` and the
//!     key equality `E`, mints and resolves `Cursor`s, and guards entry
//!     points against reentrancy in debug builds.
//!
//! Constraints
//! - Single-threaded: the map is `Send` (given `K`, `V`, `S`, `E` are) but
//!   never `Sync`. Share it across threads behind a lock.
//! - Keys are unique under `E`; inserting a present key is rejected and the
//!   stored value is left alone.
//! - Capacity 0 means "never allocated". The first insertion allocates the
//!   smallest prime (3); `clear()` returns to capacity 0.
//! - Erasure never shrinks or moves anything: the slot goes on a free list
//!   that later insertions drain before the arena is extended.
//!
//! Hasher and rehashing invariants
//! - Each entry caches its `u64` hash. Growth, erasure and chain walks use
//!   the cached value; `S` runs once per insert or lookup call and never
//!   during growth.
//! - `E` is consulted only when cached hashes match.
//! - Both collaborators run before any structural mutation of the call
//!   that invoked them, so a panic from either leaves the map consistent.
//!
//! Cursors
//! - A `Cursor` records the map's identity, the layout epoch, and a slot
//!   index with its generation. Every use is checked: foreign cursors,
//!   the end cursor, and cursors outliving their entry or their layout are
//!   reported as `CursorError`s instead of being undefined behaviour.
//! - Growth and `clear()` bump the epoch; erasure bumps the slot's
//!   generation. Non-growing insertions and erasure of other entries keep
//!   cursors valid, which is what makes erase-while-walking work.
//!
//! Notes and non-goals
//! - No persistence or serialization.
//! - Iteration order depends on hashes and capacity. It is stable while the
//!   map is not mutated and is not insertion order.
//! - No shrink operation; `clear()` is the only way to release storage.

mod chain_hash_map;
mod chain_hash_map_proptest;
pub mod cursor;
pub mod iter;
pub mod key_eq;
pub mod primes;
mod raw_table;
mod reentrancy;

// Public surface
pub use chain_hash_map::{ChainHashMap, InsertError};
pub use cursor::{Cursor, CursorError};
pub use key_eq::{KeyEq, StdEq};
pub use primes::CapacityError;

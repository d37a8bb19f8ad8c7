//! Cursors: checked positions into a `ChainHashMap`.
//!
//! A cursor is a plain value. It never borrows the map, so it can be held
//! across mutations and handed back to `erase`, `advance` or `get_at`.
//! Each of those resolves it against the map's current arrays and rejects
//! it when it no longer names a live entry.

use core::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one map instance; clones get a fresh one.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct MapId(u64);

impl MapId {
    pub(crate) fn fresh() -> Self {
        MapId(NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Position {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// A position in a map's iteration order, or the end position.
///
/// Cursors survive erasure of other entries and insertions that do not
/// grow the table. Growth and `clear` invalidate every outstanding cursor;
/// erasing an entry invalidates the cursors naming it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Cursor {
    pub(crate) map: MapId,
    pub(crate) epoch: u64,
    pub(crate) position: Option<Position>,
}

impl Cursor {
    pub fn is_end(&self) -> bool {
        self.position.is_none()
    }
}

/// Why a cursor could not be resolved.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorError {
    #[error("cursor was produced by a different map")]
    WrongMap,
    #[error("cursor is at the end position")]
    End,
    #[error("cursor outlived its entry or the table layout it was made for")]
    Stale,
}

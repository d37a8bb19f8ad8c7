//! Debug-only detection of nested entry into a map.
//!
//! The map calls user code (the hasher, the key equality, value
//! constructors) while it walks or edits its chains. Entering the same map
//! again from there would observe half-linked state, so debug builds panic
//! on it. Release builds keep only a zero-sized marker.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-map busy flag. Public entry points hold `let _g = self.reentrancy.enter();`
/// for as long as they touch buckets or entries.
#[derive(Debug, Default)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // Same auto traits in every profile: Send, never Sync.
    _not_sync: PhantomData<Cell<()>>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _not_sync: PhantomData,
        }
    }

    /// Marks the map busy until the returned guard drops. Panics in debug
    /// builds if the map is already busy.
    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "reentrancy detected: map entered again from a hasher, key comparison or constructor"
            );
            return ReentrancyGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            return ReentrancyGuard { _owner: PhantomData };
        }
    }
}

pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a DebugReentrancy>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.busy.set(false);
    }
}

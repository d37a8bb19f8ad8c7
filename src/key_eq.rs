//! Key equality used by the map when two cached hashes match.

/// Decides whether a looked-up key matches a stored one.
///
/// The map only asks after the cached hashes are equal, so implementations
/// must agree with the map's hasher: keys that compare equal must hash
/// equally. Any `Fn(&Q, &Q) -> bool` closure is a `KeyEq<Q>`.
pub trait KeyEq<Q: ?Sized> {
    fn key_eq(&self, query: &Q, stored: &Q) -> bool;
}

/// Equality through `Eq`; the default collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StdEq;

impl<Q: ?Sized + Eq> KeyEq<Q> for StdEq {
    #[inline]
    fn key_eq(&self, query: &Q, stored: &Q) -> bool {
        query == stored
    }
}

impl<Q: ?Sized, F> KeyEq<Q> for F
where
    F: Fn(&Q, &Q) -> bool,
{
    #[inline]
    fn key_eq(&self, query: &Q, stored: &Q) -> bool {
        self(query, stored)
    }
}

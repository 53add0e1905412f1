//! Replacement policies over pool-backed eviction lists.
//!
//! - [`ArcCache`]: adaptive replacement (T1/T2 resident, B1/B2 ghosts).
//! - [`LruCache`]: single-list least-recently-used.

pub mod arc;
pub mod lru;

pub use arc::ArcCache;
pub use lru::LruCache;

/// List a tracked key currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Resident, seen once recently.
    T1,
    /// Resident, seen at least twice.
    T2,
    /// Ghost of an entry evicted from T1.
    B1,
    /// Ghost of an entry evicted from T2.
    B2,
    /// Resident in an [`LruCache`].
    Lru,
}

impl QueueKind {
    #[inline]
    pub fn is_ghost(self) -> bool {
        matches!(self, QueueKind::B1 | QueueKind::B2)
    }
}

/// Value stored in each pool slot. Ghost entries carry no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    pub key: u64,
    pub queue: QueueKind,
    pub payload: Option<V>,
}

/// Outcome of a `put`. At most one payload leaves the cache per call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Insertion<V> {
    /// Stored without displacing any payload.
    Inserted,
    /// The key was resident; its previous payload is returned.
    Replaced(V),
    /// Stored; another key's payload was evicted to make room.
    Evicted { key: u64, value: V },
    /// Not stored (zero capacity or sequential bypass); the payload is
    /// handed back.
    Bypassed(V),
}

impl<V> Insertion<V> {
    /// `true` when the payload passed to `put` is now resident.
    #[inline]
    pub fn is_stored(&self) -> bool {
        !matches!(self, Insertion::Bypassed(_))
    }

    /// The payload that left the cache, if any.
    pub fn into_displaced(self) -> Option<V> {
        match self {
            Insertion::Replaced(value) | Insertion::Evicted { value, .. } => Some(value),
            Insertion::Inserted | Insertion::Bypassed(_) => None,
        }
    }
}

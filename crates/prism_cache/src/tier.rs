//! The cache tier interface consumed by results and lookups.

use std::fmt;
use std::sync::Arc;

use crate::entry::{ActionResult, CacheEntry};
use crate::error::CacheError;
use crate::key::ActionKey;

/// The two kinds of backing store a result can be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TierKind {
    /// Valid only within the producing process.
    GeneralPurpose,
    /// Readable by other processes.
    Persistent,
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierKind::GeneralPurpose => f.write_str("general-purpose"),
            TierKind::Persistent => f.write_str("persistent"),
        }
    }
}

/// A key-value store of populated results.
///
/// Implementations must only index fully populated results, and must check
/// that an entry found under a key's hash was stored for an equal key.
pub trait CacheTier: Send + Sync {
    /// Which kind of tier this is.
    fn tier_kind(&self) -> TierKind;

    /// Returns `true` if entries outlive the producing process.
    fn is_persistent(&self) -> bool {
        self.tier_kind() == TierKind::Persistent
    }

    /// Looks up the result stored for `key`.
    ///
    /// `Ok(None)` is a miss. Errors are reserved for misuse such as asking
    /// the persistent tier for an in-process-only kind.
    fn fetch_entry(&self, key: &ActionKey) -> Result<Option<ActionResult>, CacheError>;

    /// Stores a populated result under its key's hash, replacing any
    /// previous entry.
    fn store_entry(&self, result: ActionResult) -> Result<(), CacheError>;

    /// Removes the entry for `key`. Returns `true` if one was present.
    fn remove(&self, key: &ActionKey) -> bool;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Returns `true` if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    fn clear(&self);
}

/// Typed convenience wrappers over [`CacheTier`].
pub trait CacheTierExt: CacheTier {
    /// Looks up a result of type `R`. An entry of another type counts as a
    /// miss.
    fn fetch<R: CacheEntry>(&self, key: &ActionKey) -> Result<Option<Arc<R>>, CacheError> {
        Ok(self
            .fetch_entry(key)?
            .and_then(|entry| R::from_action_result(&entry)))
    }

    /// Stores a published result.
    fn store<R: CacheEntry>(&self, result: Arc<R>) -> Result<(), CacheError> {
        self.store_entry(result.into_action_result())
    }
}

impl<T: CacheTier + ?Sized> CacheTierExt for T {}

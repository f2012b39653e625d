//! Results that keep the cache lock held.
//!
//! `SafeCache` returns most results wrapped in a [`ScopeGuard`]. The guard
//! owns the value and a handle on the instance lock, so the lock stays held
//! for exactly as long as the caller keeps the guard alive:
//!
//! ```
//! use typed_lru_cache::SafeCache;
//!
//! let cache = SafeCache::default();
//! cache.set(1, "one".to_string());
//!
//! {
//!     // Named guard: no other thread can touch the cache in this block.
//!     let value = cache.get(&1);
//!     assert_eq!(value.as_deref(), Some("one"));
//! }
//!
//! // Temporary guard: the lock is released at the end of the statement.
//! let value = cache.get(&1).into_inner();
//! assert_eq!(value.as_deref(), Some("one"));
//! ```
//!
//! The guard never holds a borrow of the cache contents, only the lock. The
//! owning thread can therefore keep calling the same `SafeCache` while a
//! guard is alive; the lock is reentrant.

use std::fmt;
use std::ops::{Deref, DerefMut};

use parking_lot::MappedReentrantMutexGuard;

/// A value bound to a held instance lock.
///
/// Dropping the guard releases the lock. The guard cannot be sent to another
/// thread, since the lock must be released by the thread that took it.
#[must_use = "dropping the guard releases the lock immediately"]
pub struct ScopeGuard<'a, T> {
    value: T,
    _lock: MappedReentrantMutexGuard<'a, ()>,
}

impl<'a, T> ScopeGuard<'a, T> {
    pub(crate) fn new(value: T, lock: MappedReentrantMutexGuard<'a, ()>) -> Self {
        Self { value, _lock: lock }
    }

    /// Release the lock and return the value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for ScopeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for ScopeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: PartialEq> PartialEq<T> for ScopeGuard<'_, T> {
    fn eq(&self, other: &T) -> bool {
        self.value == *other
    }
}

impl<T: fmt::Debug> fmt::Debug for ScopeGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

impl<T: fmt::Display> fmt::Display for ScopeGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

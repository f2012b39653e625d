//! Statistics for the cache.
//!
//! `CacheInfo` mirrors the shape of Python's `lru_cache` info tuple, extended
//! with the memory dimension. The store keeps one instance up to date with
//! every mutation and hands out copies.

use std::fmt;

use crate::config::UNBOUNDED;

/// A point-in-time snapshot of cache statistics.
///
/// `hits` and `misses` only move on `get`. `currsize` and `currmem` always
/// match the items present in the cache; `maxsize` and `maxmem` are the
/// configured limits (`UNBOUNDED` when not set).
///
/// # Example
/// ```
/// use typed_lru_cache::{Cache, CacheConfig};
///
/// let mut cache: Cache<u32, u32> = Cache::new(CacheConfig::new().maxsize(10).build());
/// cache.set(1, 10);
/// let _ = cache.get(&1); // Hit
/// let _ = cache.get(&2); // Miss
///
/// let info = cache.stats();
/// assert_eq!((info.hits, info.misses, info.currsize), (1, 1, 1));
/// println!("{}", info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheInfo {
    /// Number of `get` calls that found their key.
    pub hits: usize,
    /// Number of `get` calls that did not.
    pub misses: usize,
    /// Item count limit.
    pub maxsize: usize,
    /// Current item count.
    pub currsize: usize,
    /// Memory limit in bytes.
    pub maxmem: usize,
    /// Current accounted memory in bytes.
    pub currmem: usize,
}

impl CacheInfo {
    /// Create empty statistics for the given limits.
    pub fn new(maxsize: usize, maxmem: usize) -> Self {
        Self {
            hits: 0,
            misses: 0,
            maxsize,
            currsize: 0,
            maxmem,
            currmem: 0,
        }
    }

    /// Calculate the hit rate as a percentage (0.0 to 100.0).
    /// Returns 0.0 if no lookups have been performed.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl Default for CacheInfo {
    fn default() -> Self {
        Self::new(UNBOUNDED, UNBOUNDED)
    }
}

/// Renders an unbounded limit as `inf`.
struct Limit(usize);

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == UNBOUNDED {
            f.write_str("inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for CacheInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits {} | misses {} | maxsize {} | currsize {} | maxmem {} | currmem {}",
            self.hits,
            self.misses,
            Limit(self.maxsize),
            self.currsize,
            Limit(self.maxmem),
            self.currmem
        )
    }
}

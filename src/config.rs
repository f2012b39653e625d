//! Configuration for the LRU cache.
//!
//! This module provides a builder for the two cache limits (item count and
//! approximate memory) and the optional size hints used for memory accounting.

use std::fmt;

/// Limit value meaning "no limit" for either the item count or the memory.
pub const UNBOUNDED: usize = usize::MAX;

/// Configuration for creating a new cache instance.
///
/// Use the builder pattern to construct configuration:
///
/// ```
/// use typed_lru_cache::CacheConfig;
///
/// let config = CacheConfig::new()
///     .maxsize(10_000)
///     .maxmem(64 * 1024 * 1024)
///     .build();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of items. `UNBOUNDED` disables the limit.
    pub(crate) maxsize: usize,

    /// Maximum accounted memory in bytes. `UNBOUNDED` disables the limit.
    pub(crate) maxmem: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            maxsize: UNBOUNDED,
            maxmem: UNBOUNDED,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration builder with both limits unbounded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of items.
    ///
    /// When an insertion pushes the item count above this limit, the least
    /// recently used items are evicted. Zero is a real limit: such a cache
    /// drops every item right after inserting it.
    pub fn maxsize(mut self, items: usize) -> Self {
        self.maxsize = items;
        self
    }

    /// Set the maximum accounted memory in bytes.
    ///
    /// See [`Cache::ITEM_MEM`](crate::Cache::ITEM_MEM) and [`MemoryHints`]
    /// for how the memory of one item is estimated.
    pub fn maxmem(mut self, bytes: usize) -> Self {
        self.maxmem = bytes;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> Self {
        self
    }

    /// Get the item count limit (`UNBOUNDED` if not set).
    pub fn get_maxsize(&self) -> usize {
        self.maxsize
    }

    /// Get the memory limit (`UNBOUNDED` if not set).
    pub fn get_maxmem(&self) -> usize {
        self.maxmem
    }
}

/// Function reporting the heap bytes owned by a value.
pub type SizeHint<T> = Box<dyn Fn(&T) -> usize + Send + Sync>;

/// Optional size hints for keys and values.
///
/// The cache charges every item a fixed base cost computed from the static
/// size of its types. Types owning heap buffers (`String`, `Vec`, ...) cost
/// more than that; a hint returns those extra bytes. It must not include the
/// static size of the type itself.
///
/// The key hint is charged twice per item because the key is stored both in
/// the recency list and in the lookup index.
///
/// ```
/// use typed_lru_cache::{Cache, CacheConfig, MemoryHints};
///
/// let hints = MemoryHints::new()
///     .key(|key: &String| key.capacity())
///     .value(|value: &Vec<u8>| value.capacity());
///
/// let mut cache = Cache::with_hints(CacheConfig::default(), hints);
/// cache.set("k".to_string(), vec![0u8; 16]);
/// assert!(cache.memory() >= Cache::<String, Vec<u8>>::ITEM_MEM + 16);
/// ```
pub struct MemoryHints<K, V> {
    key: Option<SizeHint<K>>,
    value: Option<SizeHint<V>>,
}

impl<K, V> MemoryHints<K, V> {
    /// Create hints that report no heap memory for either type.
    pub fn new() -> Self {
        Self {
            key: None,
            value: None,
        }
    }

    /// Set the key hint.
    pub fn key(mut self, hint: impl Fn(&K) -> usize + Send + Sync + 'static) -> Self {
        self.key = Some(Box::new(hint));
        self
    }

    /// Set the value hint.
    pub fn value(mut self, hint: impl Fn(&V) -> usize + Send + Sync + 'static) -> Self {
        self.value = Some(Box::new(hint));
        self
    }

    pub(crate) fn key_size(&self, key: &K) -> usize {
        self.key.as_ref().map_or(0, |hint| hint(key))
    }

    pub(crate) fn value_size(&self, value: &V) -> usize {
        self.value.as_ref().map_or(0, |hint| hint(value))
    }
}

impl<K, V> Default for MemoryHints<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for MemoryHints<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHints")
            .field("key", &self.key.is_some())
            .field("value", &self.value.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.maxsize, UNBOUNDED);
        assert_eq!(config.maxmem, UNBOUNDED);
    }

    #[test]
    fn test_builder_pattern() {
        let config = CacheConfig::new().maxsize(1000).maxmem(4096).build();

        assert_eq!(config.get_maxsize(), 1000);
        assert_eq!(config.get_maxmem(), 4096);
    }

    #[test]
    fn test_zero_is_a_real_limit() {
        let config = CacheConfig::new().maxsize(0).build();
        assert_eq!(config.get_maxsize(), 0);
        assert_eq!(config.get_maxmem(), UNBOUNDED);
    }

    #[test]
    fn test_hints_default_to_zero() {
        let hints: MemoryHints<String, String> = MemoryHints::new();
        assert_eq!(hints.key_size(&"abc".to_string()), 0);
        assert_eq!(hints.value_size(&"abcdef".to_string()), 0);
    }

    #[test]
    fn test_hints_report_heap_bytes() {
        let hints = MemoryHints::new()
            .key(|key: &String| key.len())
            .value(|value: &Vec<u32>| value.len() * 4);

        assert_eq!(hints.key_size(&"abc".to_string()), 3);
        assert_eq!(hints.value_size(&vec![1, 2]), 8);
        assert_eq!(format!("{:?}", hints), "MemoryHints { key: true, value: true }");
    }
}

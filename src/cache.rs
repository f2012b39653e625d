//! The main cache interface.
//!
//! This module provides `Cache`, the single-threaded store: a bounded map
//! that keeps its items in recency order and evicts from the least recently
//! used end. For shared use across threads wrap it in
//! [`SafeCache`](crate::SafeCache).

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::io::{Read, Write};
use std::mem;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::codec::{Codec, RecordDecoder, RecordEncoder, RecordSource};
use crate::config::{CacheConfig, MemoryHints, UNBOUNDED};
use crate::entry::Entry;
use crate::error::CacheResult;
use crate::stats::CacheInfo;
use crate::storage::{Iter, NodeId, OrderedBuffer};

/// A bounded, recency-ordered key-value store with LRU eviction.
///
/// # Features
/// - **Dual limits**: an item count (`maxsize`) and an approximate memory
///   budget (`maxmem`). Exceeding either evicts the least recently used items.
/// - **Recency order**: `set`, `add`, `replace` and `get` move their item to
///   the head. Iteration runs from the most to the least recently used item.
/// - **Statistics**: hits, misses and the current totals, see [`CacheInfo`].
/// - **Persistence**: [`dump`](Cache::dump) / [`load`](Cache::load) through
///   the [`Codec`] trait.
///
/// The store is not synchronized; use [`SafeCache`](crate::SafeCache) to
/// share one between threads.
///
/// # Example
/// ```
/// use typed_lru_cache::{Cache, CacheConfig};
///
/// let mut cache = Cache::new(CacheConfig::new().maxsize(2).build());
///
/// cache.set("user:1", "Alice");
/// cache.set("user:2", "Bob");
/// assert_eq!(cache.get("user:1"), Some(&"Alice"));
///
/// // user:2 is now the least recently used item.
/// cache.set("user:3", "Carol");
/// assert!(!cache.contains("user:2"));
///
/// let order: Vec<_> = cache.keys().copied().collect();
/// assert_eq!(order, vec!["user:3", "user:1"]);
/// ```
pub struct Cache<K, V, S = RandomState> {
    /// Items in recency order.
    buffer: OrderedBuffer<K, V>,

    /// Key to handle in `buffer`. Always holds exactly the keys in `buffer`.
    index: HashMap<K, NodeId, S>,

    /// Optional heap size hints for memory accounting.
    hints: MemoryHints<K, V>,

    /// Limits, totals and counters.
    info: CacheInfo,
}

impl<K: Hash + Eq + Clone, V> Cache<K, V, RandomState> {
    /// Create a new cache with the given limits.
    ///
    /// # Example
    /// ```
    /// use typed_lru_cache::{Cache, CacheConfig};
    ///
    /// let cache: Cache<u64, String> = Cache::new(CacheConfig::default());
    /// assert!(cache.is_empty());
    /// ```
    pub fn new(config: CacheConfig) -> Self {
        Self::with_hints_and_hasher(config, MemoryHints::default(), RandomState::new())
    }

    /// Create a new cache with size hints for memory accounting.
    pub fn with_hints(config: CacheConfig, hints: MemoryHints<K, V>) -> Self {
        Self::with_hints_and_hasher(config, hints, RandomState::new())
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> Cache<K, V, S> {
    /// Create a new cache using `hasher` for the key index.
    pub fn with_hasher(config: CacheConfig, hasher: S) -> Self {
        Self::with_hints_and_hasher(config, MemoryHints::default(), hasher)
    }

    /// Create a new cache with size hints and a custom hasher.
    pub fn with_hints_and_hasher(config: CacheConfig, hints: MemoryHints<K, V>, hasher: S) -> Self {
        Self {
            buffer: OrderedBuffer::new(),
            index: HashMap::with_hasher(hasher),
            hints,
            info: CacheInfo::new(config.maxsize, config.maxmem),
        }
    }

    /// Insert or overwrite an item and move it to the head.
    ///
    /// May evict least recently used items to stay within the limits.
    ///
    /// # Example
    /// ```
    /// use typed_lru_cache::Cache;
    ///
    /// let mut cache = Cache::default();
    /// cache.set(1, "one");
    /// cache.set(1, "uno");
    /// assert_eq!(cache.peek(&1), Some(&"uno"));
    /// assert_eq!(cache.size(), 1);
    /// ```
    pub fn set(&mut self, key: K, value: V) {
        match self.index.get(&key).copied() {
            Some(id) => {
                self.buffer.move_to_front(id);
                self.overwrite(id, value);
                self.enforce_limits();
            }
            None => self.push(key, value),
        }
    }

    /// Insert an item only if the key is absent.
    ///
    /// Returns `true` if the item was inserted. An existing item keeps its
    /// value but is still moved to the head.
    ///
    /// # Example
    /// ```
    /// use typed_lru_cache::Cache;
    ///
    /// let mut cache = Cache::default();
    /// assert!(cache.add("key", 1));
    /// assert!(!cache.add("key", 2));
    /// assert_eq!(cache.peek("key"), Some(&1));
    /// ```
    pub fn add(&mut self, key: K, value: V) -> bool {
        match self.index.get(&key).copied() {
            Some(id) => {
                self.buffer.move_to_front(id);
                false
            }
            None => {
                self.push(key, value);
                true
            }
        }
    }

    /// Overwrite an item only if the key is present.
    ///
    /// Returns `true` if the item was replaced. An absent key is a no-op.
    pub fn replace(&mut self, key: K, value: V) -> bool {
        let Some(id) = self.index.get(&key).copied() else {
            return false;
        };
        self.buffer.move_to_front(id);
        self.overwrite(id, value);
        self.enforce_limits();
        true
    }

    /// Look up a value and move its item to the head.
    ///
    /// This is the only operation that counts hits and misses.
    ///
    /// # Example
    /// ```
    /// use typed_lru_cache::Cache;
    ///
    /// let mut cache = Cache::default();
    /// cache.set("key".to_string(), 42);
    ///
    /// match cache.get("key") {
    ///     Some(value) => println!("Found: {}", value),
    ///     None => println!("Not found"),
    /// }
    /// assert_eq!(cache.stats().hits, 1);
    /// ```
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key).copied() {
            Some(id) => {
                self.info.hits += 1;
                self.buffer.move_to_front(id);
                self.buffer.get(id).map(Entry::value)
            }
            None => {
                self.info.misses += 1;
                None
            }
        }
    }

    /// Look up a value without touching the recency order or the counters.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.index.get(key)?;
        self.buffer.get(*id).map(Entry::value)
    }

    /// Check if a key is present. Does not touch the recency order.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Remove an item.
    ///
    /// Returns `true` if the key existed and was removed.
    ///
    /// # Example
    /// ```
    /// use typed_lru_cache::Cache;
    ///
    /// let mut cache = Cache::default();
    /// cache.set("key", "value");
    /// assert!(cache.delete("key"));
    /// assert!(!cache.delete("key")); // Already deleted
    /// ```
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(id) = self.index.remove(key) else {
            return false;
        };
        if let Some(entry) = self.buffer.remove(id) {
            self.info.currsize -= 1;
            self.info.currmem -= entry.cost();
        }
        true
    }

    /// Remove all items. Counters and limits are kept.
    pub fn flush(&mut self) {
        let dropped = self.buffer.len();
        self.buffer.clear();
        self.index.clear();
        self.info.currsize = 0;
        self.info.currmem = 0;
        debug!(dropped, "cache flushed");
    }

    /// Set the item count limit and evict down to it.
    ///
    /// `UNBOUNDED` removes the limit.
    ///
    /// # Example
    /// ```
    /// use typed_lru_cache::Cache;
    ///
    /// let mut cache = Cache::default();
    /// for i in 0..6 {
    ///     cache.set(i, i);
    /// }
    /// cache.set_maxsize(3);
    /// assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec![5, 4, 3]);
    /// ```
    pub fn set_maxsize(&mut self, maxsize: usize) {
        self.info.maxsize = maxsize;
        if maxsize != UNBOUNDED {
            self.enforce_limits();
        }
        debug!(maxsize, currsize = self.info.currsize, "item limit changed");
    }

    /// Set the memory limit and evict down to it.
    ///
    /// `UNBOUNDED` removes the limit.
    pub fn set_maxmem(&mut self, maxmem: usize) {
        self.info.maxmem = maxmem;
        if maxmem != UNBOUNDED {
            self.enforce_limits();
        }
        debug!(maxmem, currmem = self.info.currmem, "memory limit changed");
    }

    fn item_cost(hints: &MemoryHints<K, V>, key: &K, value: &V) -> usize {
        // The key is held twice: by the entry and by the index.
        Self::ITEM_MEM
            .saturating_add(hints.key_size(key).saturating_mul(2))
            .saturating_add(hints.value_size(value))
    }

    /// Insert a new item at the head. The key must be absent.
    fn push(&mut self, key: K, value: V) {
        let cost = Self::item_cost(&self.hints, &key, &value);
        self.reserve_memory(cost);
        let id = self.buffer.push_front(Entry::new(key.clone(), value, cost));
        self.index.insert(key, id);
        self.info.currsize += 1;
        self.info.currmem = self.info.currmem.saturating_add(cost);
        self.enforce_limits();
    }

    /// Replace the value of an item that is already at the head.
    fn overwrite(&mut self, id: NodeId, value: V) {
        let Some(entry) = self.buffer.get_mut(id) else {
            return;
        };
        let cost = Self::item_cost(&self.hints, entry.key(), &value);
        let old = entry.overwrite(value, cost);
        self.info.currmem -= old;
        self.reserve_memory(cost);
        self.info.currmem = self.info.currmem.saturating_add(cost);
    }

    /// Evict from the tail until `cost` more bytes fit in the total.
    ///
    /// Only triggers for item costs near `usize::MAX`. An item at the head
    /// is reached last, when the rest of the total is already zero.
    fn reserve_memory(&mut self, cost: usize) {
        while self.info.currmem.checked_add(cost).is_none() {
            if !self.evict_lru() {
                break;
            }
        }
    }

    fn enforce_limits(&mut self) {
        while self.info.currsize > self.info.maxsize || self.info.currmem > self.info.maxmem {
            if !self.evict_lru() {
                break;
            }
        }
    }

    fn evict_lru(&mut self) -> bool {
        let reason = if self.info.currsize > self.info.maxsize {
            "size"
        } else {
            "memory"
        };
        let Some(entry) = self.buffer.pop_back() else {
            return false;
        };
        self.index.remove(entry.key());
        self.info.currsize -= 1;
        self.info.currmem -= entry.cost();
        trace!(
            reason,
            currsize = self.info.currsize,
            currmem = self.info.currmem,
            "evicted least recently used item"
        );
        true
    }
}

impl<K, V, S> Cache<K, V, S> {
    /// Fixed memory charged for every item before size hints.
    ///
    /// Covers one list entry and one index slot.
    pub const ITEM_MEM: usize = mem::size_of::<Entry<K, V>>() + mem::size_of::<(K, NodeId)>();

    /// Number of items.
    pub fn size(&self) -> usize {
        self.info.currsize
    }

    /// Number of items. Same as [`size`](Cache::size).
    pub fn len(&self) -> usize {
        self.info.currsize
    }

    /// Check if the cache holds no items.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Accounted memory of all items, in bytes.
    pub fn memory(&self) -> usize {
        self.info.currmem
    }

    /// The item count limit.
    pub fn maxsize(&self) -> usize {
        self.info.maxsize
    }

    /// The memory limit in bytes.
    pub fn maxmem(&self) -> usize {
        self.info.maxmem
    }

    /// Get a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheInfo {
        self.info
    }

    /// The most recently used item.
    pub fn front(&self) -> Option<(&K, &V)> {
        let entry = self.buffer.get(self.buffer.head()?)?;
        Some((entry.key(), entry.value()))
    }

    /// The least recently used item, next in line for eviction.
    pub fn back(&self) -> Option<(&K, &V)> {
        let entry = self.buffer.get(self.buffer.tail()?)?;
        Some((entry.key(), entry.value()))
    }

    /// Iterate from the most to the least recently used item.
    ///
    /// Use `.rev()` for the opposite direction. Iteration never changes
    /// the order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.buffer.iter()
    }

    /// Keys from the most to the least recently used item.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Values from the most to the least recently used item.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
        self.iter().map(|(_, value)| value)
    }
}

impl<K: Codec, V: Codec, S> Cache<K, V, S> {
    /// Write every item to a single-pass sink.
    ///
    /// Records are written from the least to the most recently used item,
    /// see [`codec`](crate::codec) for the layout. Returns the number of
    /// bytes written.
    pub fn dump_to<W: Write>(&self, mut sink: W) -> CacheResult<u64> {
        let mut encoder = RecordEncoder::new();
        let mut written = 0u64;
        for (key, value) in self.iter().rev() {
            let record = encoder.encode(key, value);
            sink.write_all(record)?;
            written += record.len() as u64;
        }
        sink.flush()?;
        debug!(records = self.len(), bytes = written, "cache dumped");
        Ok(written)
    }

    /// Append every item to a buffer, e.g. a `Vec<u8>` or `BytesMut`.
    pub fn dump_into<B: BufMut>(&self, out: &mut B) {
        let mut encoder = RecordEncoder::new();
        let mut written = 0usize;
        for (key, value) in self.iter().rev() {
            let record = encoder.encode(key, value);
            out.put_slice(record);
            written += record.len();
        }
        debug!(records = self.len(), bytes = written, "cache dumped");
    }

    /// Encode every item into a fresh buffer.
    ///
    /// # Example
    /// ```
    /// use typed_lru_cache::Cache;
    ///
    /// let mut cache: Cache<u32, String> = Cache::default();
    /// cache.set(1, "one".to_string());
    /// cache.set(2, "two".to_string());
    ///
    /// let dump = cache.dump();
    /// let mut copy: Cache<u32, String> = Cache::default();
    /// copy.load(&dump).unwrap();
    /// assert_eq!(copy, cache);
    /// ```
    pub fn dump(&self) -> Bytes {
        let mut out = BytesMut::new();
        self.dump_into(&mut out);
        out.freeze()
    }
}

impl<K, V, S> Cache<K, V, S>
where
    K: Codec + Hash + Eq + Clone,
    V: Codec,
    S: BuildHasher,
{
    /// Replace the contents with the records read from `source`.
    ///
    /// Every record goes through [`set`](Cache::set), so the current limits
    /// apply. Hit and miss counters are kept. On malformed input the load is
    /// aborted and the cache is left empty.
    pub fn load_from<R: Read>(&mut self, source: R) -> CacheResult<()> {
        self.load_records(RecordDecoder::from_reader(source))
    }

    /// Replace the contents with the records in `data`.
    ///
    /// Chunks are decoded straight from the slice.
    pub fn load(&mut self, data: &[u8]) -> CacheResult<()> {
        self.load_records(RecordDecoder::from_slice(data))
    }

    /// Replace the contents with the records in a shared buffer.
    ///
    /// Chunks are handed to [`Codec::decode_shared`] as `Bytes` views.
    pub fn load_bytes(&mut self, data: Bytes) -> CacheResult<()> {
        self.load_records(RecordDecoder::from_bytes(data))
    }

    fn load_records<Src: RecordSource>(
        &mut self,
        records: RecordDecoder<K, V, Src>,
    ) -> CacheResult<()> {
        self.flush();
        let mut loaded = 0usize;
        for record in records {
            match record {
                Ok((key, value)) => {
                    self.set(key, value);
                    loaded += 1;
                }
                Err(err) => {
                    warn!(error = %err, loaded, "aborting cache load on malformed input");
                    self.flush();
                    return Err(err);
                }
            }
        }
        debug!(records = loaded, currsize = self.info.currsize, "cache loaded");
        Ok(())
    }
}

impl<K: Hash + Eq + Clone, V> Default for Cache<K, V, RandomState> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Equal when both hold the same items in the same recency order.
///
/// Walks both caches; meant for tests and debugging.
impl<K: PartialEq, V: PartialEq, S> PartialEq for Cache<K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, S> Eq for Cache<K, V, S> {}

impl<'a, K, V, S> IntoIterator for &'a Cache<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

struct Items<'a, K, V, S>(&'a Cache<K, V, S>);

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for Items<'_, K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for Cache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("info", &self.info)
            .field("hints", &self.hints)
            .field("items", &Items(self))
            .finish()
    }
}

/// Human-readable listing of a cache: header, stats line, one line per item.
///
/// `owner` is the value whose address goes into the header.
pub(crate) struct Contents<'a, O: ?Sized, K, V, S> {
    pub(crate) label: &'static str,
    pub(crate) owner: &'a O,
    pub(crate) cache: &'a Cache<K, V, S>,
}

impl<O: ?Sized, K: fmt::Debug, V: fmt::Debug, S> fmt::Display for Contents<'_, O, K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}<Key={}, Value={}> at {:p}",
            self.label,
            std::any::type_name::<K>(),
            std::any::type_name::<V>(),
            self.owner
        )?;
        writeln!(f, "{}", self.cache.info)?;
        for (n, (key, value)) in self.cache.iter().enumerate() {
            writeln!(f, "{}: [{:?}] = '{:?}'", n, key, value)?;
        }
        Ok(())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Display for Cache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contents = Contents {
            label: "Cache",
            owner: self,
            cache: self,
        };
        fmt::Display::fmt(&contents, f)
    }
}

//! Thread-safe cache facade.
//!
//! `SafeCache` puts a [`Cache`] behind one reentrant lock per instance and
//! offers the same operations through `&self`. Results that are plain values
//! come back in a [`ScopeGuard`] that keeps the lock held until it is
//! dropped. Borrowed access to stored values is only available inside a
//! closure, so a reference can never outlive the lock.

use std::cell::RefCell;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use bytes::{BufMut, Bytes};
use parking_lot::{Mutex, MutexGuard, ReentrantMutex, ReentrantMutexGuard};

use crate::cache::{Cache, Contents};
use crate::codec::Codec;
use crate::config::{CacheConfig, MemoryHints};
use crate::error::CacheResult;
use crate::guard::ScopeGuard;
use crate::stats::CacheInfo;

type InstanceGuard<'a, K, V, S> = ReentrantMutexGuard<'a, RefCell<Cache<K, V, S>>>;

/// Process-wide lock that keeps printed cache listings from interleaving.
///
/// Every print operation takes it together with the instance lock. The
/// global instance lives for the whole process; separate `PrintLock`s can be
/// created to scope the ordering to one sink.
#[derive(Debug)]
pub struct PrintLock {
    mutex: Mutex<()>,
}

impl PrintLock {
    pub const fn new() -> Self {
        Self {
            mutex: parking_lot::const_mutex(()),
        }
    }

    /// The lock shared by `Display` and [`SafeCache::write_to`].
    pub fn global() -> &'static PrintLock {
        static GLOBAL: PrintLock = PrintLock::new();
        &GLOBAL
    }
}

impl Default for PrintLock {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`Cache`] that can be shared between threads.
///
/// Share it with `Arc<SafeCache<..>>`. Every operation takes the instance
/// lock for its duration; operations returning a [`ScopeGuard`] keep it until
/// the guard is dropped.
///
/// # Guard lifetime
///
/// A guard bound to a name is a critical section that lasts until the end of
/// the enclosing block. A guard that is only a temporary (for example
/// `cache.size().into_inner()` or `*cache.size()`) releases the lock at the
/// end of the statement, and the value may be stale right after.
///
/// # Reentrancy
///
/// The owning thread may call into the same cache while it holds guards.
/// The exceptions are the closures: [`with_locked`](SafeCache::with_locked)
/// gets `&mut Cache` and must use it rather than the `SafeCache`, and
/// [`with_value`](SafeCache::with_value) may only read through the
/// `SafeCache`. Breaking either rule panics.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use typed_lru_cache::{CacheConfig, SafeCache};
///
/// let cache = Arc::new(SafeCache::new(CacheConfig::new().maxsize(100).build()));
///
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let cache = Arc::clone(&cache);
///         thread::spawn(move || {
///             for i in 0..10 {
///                 cache.set(t * 10 + i, i);
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
///
/// assert_eq!(*cache.size(), 40);
/// ```
pub struct SafeCache<K, V, S = RandomState> {
    inner: ReentrantMutex<RefCell<Cache<K, V, S>>>,
}

impl<K: Hash + Eq + Clone, V> SafeCache<K, V, RandomState> {
    /// Create a new cache with the given limits.
    pub fn new(config: CacheConfig) -> Self {
        Self::from(Cache::new(config))
    }

    /// Create a new cache with size hints for memory accounting.
    pub fn with_hints(config: CacheConfig, hints: MemoryHints<K, V>) -> Self {
        Self::from(Cache::with_hints(config, hints))
    }
}

impl<K, V, S> From<Cache<K, V, S>> for SafeCache<K, V, S> {
    fn from(cache: Cache<K, V, S>) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(cache)),
        }
    }
}

impl<K, V, S> SafeCache<K, V, S> {
    /// Consume the facade and return the store.
    pub fn into_inner(self) -> Cache<K, V, S> {
        self.inner.into_inner().into_inner()
    }

    fn guard_ref<T>(&self, f: impl FnOnce(&Cache<K, V, S>) -> T) -> ScopeGuard<'_, T> {
        let lock = self.inner.lock();
        let value = f(&RefCell::borrow(&lock));
        ScopeGuard::new(value, ReentrantMutexGuard::map(lock, |_| &()))
    }

    fn guard_mut<T>(&self, f: impl FnOnce(&mut Cache<K, V, S>) -> T) -> ScopeGuard<'_, T> {
        let lock = self.inner.lock();
        let value = f(&mut lock.borrow_mut());
        ScopeGuard::new(value, ReentrantMutexGuard::map(lock, |_| &()))
    }

    /// Number of items.
    pub fn size(&self) -> ScopeGuard<'_, usize> {
        self.guard_ref(Cache::size)
    }

    /// Check if the cache holds no items.
    pub fn is_empty(&self) -> ScopeGuard<'_, bool> {
        self.guard_ref(Cache::is_empty)
    }

    /// Accounted memory of all items, in bytes.
    pub fn memory(&self) -> ScopeGuard<'_, usize> {
        self.guard_ref(Cache::memory)
    }

    /// The item count limit.
    pub fn maxsize(&self) -> ScopeGuard<'_, usize> {
        self.guard_ref(Cache::maxsize)
    }

    /// The memory limit in bytes.
    pub fn maxmem(&self) -> ScopeGuard<'_, usize> {
        self.guard_ref(Cache::maxmem)
    }

    /// Get a snapshot of the cache statistics.
    pub fn stats(&self) -> ScopeGuard<'_, CacheInfo> {
        self.guard_ref(Cache::stats)
    }

    /// Copy every item, from the most to the least recently used.
    pub fn snapshot(&self) -> ScopeGuard<'_, Vec<(K, V)>>
    where
        K: Clone,
        V: Clone,
    {
        self.guard_ref(|cache| {
            cache
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
    }

    /// Run `f` with exclusive access to the store.
    ///
    /// Use this for iteration or for several operations that must happen
    /// atomically.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls back into this `SafeCache`. `Debug` and `Display`
    /// print a placeholder instead, and [`write_to`](SafeCache::write_to)
    /// returns an error.
    ///
    /// # Example
    /// ```
    /// use typed_lru_cache::SafeCache;
    ///
    /// let cache = SafeCache::default();
    /// cache.set("a", 1);
    /// cache.set("b", 2);
    ///
    /// let total: i32 = cache.with_locked(|inner| inner.values().sum());
    /// assert_eq!(total, 3);
    /// ```
    pub fn with_locked<R>(&self, f: impl FnOnce(&mut Cache<K, V, S>) -> R) -> R {
        let lock = self.inner.lock();
        let mut cache = lock.borrow_mut();
        f(&mut cache)
    }

    /// Like [`with_locked`](SafeCache::with_locked), but gives up after
    /// `timeout` and returns `None` if the lock could not be taken.
    pub fn try_with_locked_for<R>(
        &self,
        timeout: Duration,
        f: impl FnOnce(&mut Cache<K, V, S>) -> R,
    ) -> Option<R> {
        let lock = self.inner.try_lock_for(timeout)?;
        let mut cache = lock.borrow_mut();
        Some(f(&mut cache))
    }

    fn lock_for_print<'a>(
        &'a self,
        print: &'a PrintLock,
    ) -> (MutexGuard<'a, ()>, InstanceGuard<'a, K, V, S>) {
        // Take both or neither, so a thread holding a guard on this instance
        // can still print while another thread waits for it.
        loop {
            let print_guard = print.mutex.lock();
            if let Some(instance) = self.inner.try_lock() {
                return (print_guard, instance);
            }
            drop(print_guard);

            let instance = self.inner.lock();
            if let Some(print_guard) = print.mutex.try_lock() {
                return (print_guard, instance);
            }
            drop(instance);
            thread::yield_now();
        }
    }
}

impl<K, V, S> SafeCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Create a new cache using `hasher` for the key index.
    pub fn with_hasher(config: CacheConfig, hasher: S) -> Self {
        Self::from(Cache::with_hasher(config, hasher))
    }

    /// Create a new cache with size hints and a custom hasher.
    pub fn with_hints_and_hasher(config: CacheConfig, hints: MemoryHints<K, V>, hasher: S) -> Self {
        Self::from(Cache::with_hints_and_hasher(config, hints, hasher))
    }

    /// Insert or overwrite an item. See [`Cache::set`].
    pub fn set(&self, key: K, value: V) {
        self.with_locked(|cache| cache.set(key, value));
    }

    /// Insert an item only if the key is absent. See [`Cache::add`].
    pub fn add(&self, key: K, value: V) -> ScopeGuard<'_, bool> {
        self.guard_mut(|cache| cache.add(key, value))
    }

    /// Overwrite an item only if the key is present. See [`Cache::replace`].
    pub fn replace(&self, key: K, value: V) -> ScopeGuard<'_, bool> {
        self.guard_mut(|cache| cache.replace(key, value))
    }

    /// Look up a value, counting a hit or a miss, and return a copy.
    ///
    /// The guard keeps the lock held, so the copy is current for as long as
    /// the guard lives. For borrowed access use
    /// [`with_value`](SafeCache::with_value).
    pub fn get<Q>(&self, key: &Q) -> ScopeGuard<'_, Option<V>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.guard_mut(|cache| cache.get(key).cloned())
    }

    /// Look up a value like [`get`](SafeCache::get) and pass a reference to
    /// `f`. The reference cannot escape the closure.
    ///
    /// The lookup is counted and promoted before `f` runs. Inside `f` the
    /// cache is only borrowed for reading: read-only calls on this
    /// `SafeCache` (`size`, `peek`, `stats`, printing, ...) work.
    ///
    /// # Panics
    ///
    /// Panics if `f` modifies this `SafeCache` (`set`, `get`, `delete`, ...).
    ///
    /// # Example
    /// ```
    /// use typed_lru_cache::SafeCache;
    ///
    /// let cache = SafeCache::default();
    /// cache.set(1, vec![0u8; 1024]);
    ///
    /// let len = cache.with_value(&1, |value| value.map(Vec::len));
    /// assert_eq!(len, Some(1024));
    /// ```
    pub fn with_value<Q, R>(&self, key: &Q, f: impl FnOnce(Option<&V>) -> R) -> R
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let lock = self.inner.lock();
        lock.borrow_mut().get(key);
        let cache = RefCell::borrow(&lock);
        f(cache.peek(key))
    }

    /// Copy a value without touching the recency order or the counters.
    pub fn peek<Q>(&self, key: &Q) -> ScopeGuard<'_, Option<V>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.guard_ref(|cache| cache.peek(key).cloned())
    }

    /// Check if a key is present.
    pub fn contains<Q>(&self, key: &Q) -> ScopeGuard<'_, bool>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.guard_ref(|cache| cache.contains(key))
    }

    /// Remove an item. See [`Cache::delete`].
    pub fn delete<Q>(&self, key: &Q) -> ScopeGuard<'_, bool>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.guard_mut(|cache| cache.delete(key))
    }

    /// Remove all items. Counters and limits are kept.
    pub fn flush(&self) {
        self.with_locked(Cache::flush);
    }

    /// Set the item count limit and evict down to it.
    pub fn set_maxsize(&self, maxsize: usize) {
        self.with_locked(|cache| cache.set_maxsize(maxsize));
    }

    /// Set the memory limit and evict down to it.
    pub fn set_maxmem(&self, maxmem: usize) {
        self.with_locked(|cache| cache.set_maxmem(maxmem));
    }
}

impl<K: Codec, V: Codec, S> SafeCache<K, V, S> {
    /// Write every item to a single-pass sink. See [`Cache::dump_to`].
    pub fn dump_to<W: Write>(&self, sink: W) -> CacheResult<u64> {
        self.with_locked(|cache| cache.dump_to(sink))
    }

    /// Append every item to a buffer. See [`Cache::dump_into`].
    pub fn dump_into<B: BufMut>(&self, out: &mut B) {
        self.with_locked(|cache| cache.dump_into(out))
    }

    /// Encode every item into a fresh buffer.
    pub fn dump(&self) -> Bytes {
        self.with_locked(|cache| cache.dump())
    }
}

impl<K, V, S> SafeCache<K, V, S>
where
    K: Codec + Hash + Eq + Clone,
    V: Codec,
    S: BuildHasher,
{
    /// Replace the contents with records read from `source`.
    /// See [`Cache::load_from`].
    pub fn load_from<R: Read>(&self, source: R) -> CacheResult<()> {
        self.with_locked(|cache| cache.load_from(source))
    }

    /// Replace the contents with the records in `data`.
    pub fn load(&self, data: &[u8]) -> CacheResult<()> {
        self.with_locked(|cache| cache.load(data))
    }

    /// Replace the contents with the records in a shared buffer.
    pub fn load_bytes(&self, data: Bytes) -> CacheResult<()> {
        self.with_locked(|cache| cache.load_bytes(data))
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> SafeCache<K, V, S> {
    /// Print the contents to `out`, ordered against other prints by `print`.
    pub fn write_to_with<W: Write>(&self, print: &PrintLock, mut out: W) -> io::Result<()> {
        let (_print, lock) = self.lock_for_print(print);
        let cache = lock.try_borrow().map_err(|_| {
            io::Error::new(
                io::ErrorKind::WouldBlock,
                "cache is borrowed mutably by `with_locked` on this thread",
            )
        })?;
        write!(out, "{}", self.contents(&cache))?;
        out.flush()
    }

    /// Print the contents to `out`, ordered by the global [`PrintLock`].
    pub fn write_to<W: Write>(&self, out: W) -> io::Result<()> {
        self.write_to_with(PrintLock::global(), out)
    }

    fn contents<'a>(&'a self, cache: &'a Cache<K, V, S>) -> Contents<'a, Self, K, V, S> {
        Contents {
            label: "SafeCache",
            owner: self,
            cache,
        }
    }
}

impl<K: Hash + Eq + Clone, V> Default for SafeCache<K, V, RandomState> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Equal when both hold the same items in the same recency order.
///
/// Both locks are taken in address order, so `a == b` and `b == a` on two
/// threads cannot deadlock.
impl<K: PartialEq, V: PartialEq, S> PartialEq for SafeCache<K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        let (first, second) = if (self as *const Self) <= (other as *const Self) {
            (self, other)
        } else {
            (other, self)
        };
        let first = first.inner.lock();
        let second = second.inner.lock();
        let equal = *RefCell::borrow(&first) == *RefCell::borrow(&second);
        equal
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Display for SafeCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (_print, lock) = self.lock_for_print(PrintLock::global());
        let Ok(cache) = lock.try_borrow() else {
            return f.write_str("<borrowed>");
        };
        fmt::Display::fmt(&self.contents(&cache), f)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for SafeCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lock = self.inner.lock();
        let mut out = f.debug_struct("SafeCache");
        match lock.try_borrow() {
            Ok(cache) => out.field("cache", &*cache),
            Err(_) => out.field("cache", &format_args!("<borrowed>")),
        };
        out.finish()
    }
}

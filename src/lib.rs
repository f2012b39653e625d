//! # Typed LRU Cache
//!
//! A generic, bounded, recency-ordered key-value cache for Rust with memory
//! accounting, a thread-safe facade and a binary dump format.
//!
//! ## Features
//!
//! - **Generic**: any `K: Hash + Eq + Clone` and any `V`, with a pluggable hasher
//! - **Dual limits**: evicts least-recently-used items by item count and by
//!   approximate memory
//! - **Thread-safe facade**: `SafeCache` with a reentrant lock and guarded results
//! - **Persistence**: dump/load in a length-prefixed record format that
//!   preserves recency order
//! - **Statistics**: hits, misses and current totals
//! - **Zero unsafe code**: Built entirely with safe Rust
//!
//! ## Quick Start
//!
//! ```rust
//! use typed_lru_cache::{Cache, CacheConfig};
//!
//! // Create a cache holding at most 10_000 items
//! let config = CacheConfig::new().maxsize(10_000).build();
//! let mut cache = Cache::new(config);
//!
//! // Store and retrieve values
//! cache.set("user:123".to_string(), "Alice".to_string());
//!
//! if let Some(value) = cache.get("user:123") {
//!     println!("Found: {}", value);
//! }
//!
//! // Persist and restore, recency order included
//! let dump = cache.dump();
//! let mut restored = Cache::new(config);
//! restored.load(&dump).unwrap();
//! assert_eq!(restored, cache);
//!
//! // Check statistics
//! let stats = cache.stats();
//! println!("Hit rate: {:.1}%", stats.hit_rate());
//! ```
//!
//! ## Thread Safety
//!
//! `Cache` is a plain single-threaded structure. `SafeCache` wraps it in a
//! lock and is shared across threads with `Arc`:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use typed_lru_cache::SafeCache;
//!
//! let cache = Arc::new(SafeCache::default());
//!
//! let handles: Vec<_> = (0..4).map(|i| {
//!     let cache = Arc::clone(&cache);
//!     thread::spawn(move || {
//!         cache.set(format!("key_{}", i), format!("value_{}", i));
//!     })
//! }).collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(*cache.size(), 4);
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod guard;
pub mod safe_cache;
pub mod stats;

pub use cache::Cache;
pub use codec::{Accumulate, Codec, FixedWidth, RecordDecoder, RecordEncoder};
pub use config::{CacheConfig, MemoryHints, SizeHint, UNBOUNDED};
pub use error::{CacheError, CacheResult, CodecError};
pub use guard::ScopeGuard;
pub use safe_cache::{PrintLock, SafeCache};
pub use stats::CacheInfo;
pub use storage::Iter;

// Internal modules - not part of public API
pub(crate) mod entry;
pub(crate) mod storage;

pub mod cli;
pub use cli::{Cli, DemoCommand};

//! Tests for the critical sections provided by `SafeCache`.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use typed_lru_cache::{CacheConfig, PrintLock, SafeCache};

#[test]
fn test_guard_blocks_writer_until_dropped() {
    let cache = Arc::new(SafeCache::default());
    cache.set("counter", 0u64);
    let released = Arc::new(AtomicBool::new(false));
    let (started_tx, started_rx) = mpsc::channel();

    let guard = cache.get("counter");
    assert_eq!(*guard, Some(0));

    let writer = {
        let cache = Arc::clone(&cache);
        let released = Arc::clone(&released);
        thread::spawn(move || {
            started_tx.send(()).unwrap();
            cache.set("counter", 1);
            // Only reachable once the reader dropped its guard.
            assert!(released.load(Ordering::SeqCst));
        })
    };

    started_rx.recv().unwrap();
    thread::sleep(Duration::from_millis(50));

    // The owning thread can still read; the writer has not run yet.
    assert_eq!(*cache.peek("counter"), Some(0));
    assert_eq!(*guard, Some(0));

    released.store(true, Ordering::SeqCst);
    drop(guard);
    writer.join().unwrap();

    assert_eq!(*cache.peek("counter"), Some(1));
}

#[test]
fn test_temporary_guard_releases_at_statement_end() {
    let cache = Arc::new(SafeCache::default());
    cache.set(1, 1);

    // Not bound to a name: the lock is gone after this statement.
    let value = cache.get(&1).into_inner();
    assert_eq!(value, Some(1));

    let other = Arc::clone(&cache);
    let writer = thread::spawn(move || other.set(1, 2));
    writer.join().unwrap();
    assert_eq!(*cache.peek(&1), Some(2));
}

#[test]
fn test_no_torn_reads() {
    let cache = Arc::new(SafeCache::new(CacheConfig::new().maxsize(10).build()));
    cache.with_locked(|inner| {
        inner.set("a", 0u64);
        inner.set("b", 0u64);
    });

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for n in 1..=500u64 {
                    cache.with_locked(|inner| {
                        inner.set("a", n);
                        inner.set("b", n);
                    });
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..500 {
                    let guard = cache.get("a");
                    // The guard holds the lock: "b" cannot move in between.
                    let b = cache.peek("b");
                    assert_eq!(*guard, *b);
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().expect("Thread panicked");
    }
    assert_eq!(*cache.peek("a"), Some(500));
    assert_eq!(*cache.peek("b"), Some(500));
}

#[test]
fn test_cross_equality_does_not_deadlock() {
    let a = Arc::new(SafeCache::default());
    let b = Arc::new(SafeCache::default());
    a.set(1, 1);
    b.set(1, 1);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let a = Arc::clone(&a);
            let b = Arc::clone(&b);
            thread::spawn(move || {
                for _ in 0..1000 {
                    let equal = if t % 2 == 0 { *a == *b } else { *b == *a };
                    assert!(equal);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
}

/// Sink shared between threads; every `write` call is appended separately.
#[derive(Clone)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        thread::yield_now();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_prints_do_not_interleave() {
    let print = Arc::new(PrintLock::new());
    let sink = SharedSink(Arc::new(Mutex::new(Vec::new())));

    let handles: Vec<_> = (0..4u32)
        .map(|id| {
            let print = Arc::clone(&print);
            let sink = sink.clone();
            thread::spawn(move || {
                let cache = SafeCache::default();
                for value in 0..5u32 {
                    cache.set(id, value);
                    cache.set(id + 100, value);
                }
                for _ in 0..20 {
                    cache.write_to_with(&print, sink.clone()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let output = String::from_utf8(sink.0.lock().clone()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 4 * 20 * 4);

    // Each listing is four contiguous lines: header, stats, two items of the
    // same cache.
    for block in lines.chunks(4) {
        assert!(block[0].starts_with("SafeCache<Key=u32, Value=u32> at "));
        assert!(block[1].starts_with("hits 0 | misses 0 |"));
        let first: u32 = item_key(block[2]);
        let second: u32 = item_key(block[3]);
        assert_eq!(first % 100, second % 100);
    }
}

fn item_key(line: &str) -> u32 {
    let start = line.find('[').expect("item line") + 1;
    let end = line.find(']').expect("item line");
    line[start..end].parse().expect("numeric key")
}

//! Read-through cache demo.
//!
//! A pool of request handlers looks users up through a shared `SafeCache`
//! in front of a slow mock database. After the run the cache is dumped to a
//! file, reloaded into a fresh cache and compared with the original.
//!
//! ```bash
//! cargo run --bin lru-demo -- run --users 1000 --workers 4 --maxsize 100
//! cargo run --bin lru-demo -- inspect users.lru
//! ```

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use typed_lru_cache::{
    CacheConfig, CacheError, Cli, Codec, CodecError, DemoCommand, FixedWidth, SafeCache,
};

/// Fixed width of a stored user name.
const NAME_LEN: usize = 32;

/// Simulated round trip to the database.
const DB_LATENCY: Duration = Duration::from_micros(200);

/// User model.
#[derive(Clone, PartialEq, Eq)]
struct User {
    id: u64,
    name: [u8; NAME_LEN],
}

impl User {
    fn new(id: u64, name: &str) -> Self {
        let mut buf = [0u8; NAME_LEN];
        let len = name.len().min(NAME_LEN);
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self { id, name: buf }
    }

    fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        std::str::from_utf8(&self.name[..end]).unwrap_or("<invalid>")
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

// Built from the integer and array codecs: [id: u64][name: 32 bytes].
impl Codec for User {
    fn encode(&self, out: &mut BytesMut) {
        self.id.encode(out);
        self.name.encode(out);
    }

    fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
        if chunk.len() != u64::WIDTH + NAME_LEN {
            return Err(CodecError::Custom(format!(
                "user record must be {} bytes, got {}",
                u64::WIDTH + NAME_LEN,
                chunk.len()
            )));
        }
        let (id, name) = chunk.split_at(u64::WIDTH);
        Ok(Self {
            id: u64::decode(id)?,
            name: <[u8; NAME_LEN]>::decode(name)?,
        })
    }
}

/// Mock database. Every lookup pays `DB_LATENCY`.
struct UserDb {
    users: HashMap<u64, User>,
}

impl UserDb {
    fn seed(count: u64) -> Self {
        let users = (0..count)
            .map(|id| (id, User::new(id, &format!("user-{}", id))))
            .collect();
        Self { users }
    }

    fn load(&self, id: u64) -> Option<User> {
        std::thread::sleep(DB_LATENCY);
        self.users.get(&id).cloned()
    }
}

/// Serve one GET request, reading through the cache.
fn handle_get(cache: &SafeCache<u64, User>, db: &UserDb, id: u64) -> Option<User> {
    // The guard is a temporary: the lock is released right after the copy.
    if let Some(user) = cache.get(&id).into_inner() {
        return Some(user);
    }
    let user = db.load(id)?;
    tracing::debug!(id, "user loaded from database");
    cache.set(id, user.clone());
    Some(user)
}

/// Deterministic request pattern: four of five requests hit the hottest
/// tenth of the users.
fn request_id(request: usize, worker: usize, users: u64) -> u64 {
    let seed = (request as u64)
        .wrapping_mul(7919)
        .wrapping_add(worker as u64 * 104_729);
    let hot = (users / 10).max(1);
    if request % 5 == 0 {
        seed % users
    } else {
        seed % hot
    }
}

async fn run(
    users: u64,
    requests: usize,
    workers: usize,
    maxsize: usize,
    dump: &Path,
) -> Result<(), Box<dyn Error>> {
    if users == 0 {
        return Err("--users must be at least 1".into());
    }

    let db = Arc::new(UserDb::seed(users));
    let config = CacheConfig::new().maxsize(maxsize).build();
    let cache = Arc::new(SafeCache::new(config));

    let started = Instant::now();
    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let db = Arc::clone(&db);
        let cache = Arc::clone(&cache);
        handles.push(tokio::task::spawn_blocking(move || {
            (0..requests)
                .filter(|&i| handle_get(&cache, &db, request_id(i, worker, users)).is_some())
                .count()
        }));
    }

    let mut served = 0;
    for handle in handles {
        served += handle.await?;
    }

    let stats = *cache.stats();
    tracing::info!(
        served,
        elapsed_ms = started.elapsed().as_millis() as u64,
        hit_rate = stats.hit_rate(),
        "requests served"
    );
    println!("{}", stats);

    let bytes = cache.dump();
    tokio::fs::write(dump, &bytes).await?;
    tracing::info!(path = %dump.display(), bytes = bytes.len(), "cache dumped");

    let data = tokio::fs::read(dump).await?;
    let restored: SafeCache<u64, User> = SafeCache::new(config);
    restored.load(&data)?;
    if restored != *cache {
        return Err("reloaded cache differs from the original".into());
    }
    tracing::info!(items = *restored.size(), "reloaded cache matches the original");

    Ok(())
}

async fn inspect(path: PathBuf) -> Result<(), Box<dyn Error>> {
    let cache = tokio::task::spawn_blocking(move || -> Result<_, CacheError> {
        let file = File::open(&path)?;
        let cache: SafeCache<u64, User> = SafeCache::default();
        cache.load_from(BufReader::new(file))?;
        Ok(cache)
    })
    .await??;

    cache.write_to(std::io::stdout().lock())?;
    Ok(())
}

/// Entry point for the demo.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        DemoCommand::Run {
            users,
            requests,
            workers,
            maxsize,
            dump,
        } => run(users, requests, workers, maxsize, &dump).await,
        DemoCommand::Inspect { path } => inspect(path).await,
    }
}

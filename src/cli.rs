//! Command-line interface definitions.
//!
//! This module defines the CLI structure for the demonstration binary using
//! clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Read-through cache demo.
///
/// Serves user lookups from a slow mock database through a shared LRU cache,
/// then dumps the cache to a file and checks that it reloads identically.
#[derive(Parser, Debug)]
#[command(name = "lru-demo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The command to execute.
    #[clap(subcommand)]
    pub command: DemoCommand,
}

/// Available demo commands.
#[derive(Subcommand, Debug)]
pub enum DemoCommand {
    /// Run concurrent request handlers against the cache.
    ///
    /// Each worker issues lookups for a deterministic spread of user ids.
    /// Misses are loaded from the mock database and stored in the cache.
    Run {
        /// Number of users in the mock database.
        #[arg(long, default_value_t = 1000)]
        users: u64,

        /// Requests issued by each worker.
        #[arg(long, default_value_t = 500)]
        requests: usize,

        /// Number of concurrent workers.
        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// Maximum number of cached users.
        #[arg(long, default_value_t = 100)]
        maxsize: usize,

        /// File the cache is dumped to after the run.
        #[arg(long, default_value = "users.lru")]
        dump: PathBuf,
    },

    /// Load a dump file and print its contents.
    Inspect {
        /// The dump file to read.
        path: PathBuf,
    },
}

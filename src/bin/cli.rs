//! atlas-raftstore CLI
//!
//! Offline inspection and repair of a store's data directory.
//! Must not be run against a directory a live node has open.

use std::process::ExitCode;

use atlas_raftstore::engine::{PrefixScan, ReadTransaction, StorageEngine};
use atlas_raftstore::keyspace::{EngineKey, Namespace};
use atlas_raftstore::{Config, LogStore, RaftStore, StableStore, StoreError};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// atlas-raftstore CLI
#[derive(Parser, Debug)]
#[command(name = "atlas-raftstore-cli")]
#[command(about = "Inspect a Raft log store and stable store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./raftstore_data")]
    data_dir: String,

    /// Skip fsync on commit
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the lowest stored log index
    FirstIndex,

    /// Print the highest stored log index
    LastIndex,

    /// Print a single log entry
    GetLog {
        /// The log index
        index: u64,
    },

    /// Delete log entries in [min, max]
    DeleteRange {
        min: u64,
        max: u64,

        /// Keys deleted per transaction
        #[arg(short, long, default_value = "100")]
        batch_size: usize,
    },

    /// Get a stable-store value
    Get {
        /// The key to get
        key: String,
    },

    /// Set a stable-store value
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Get a stable-store value as uint64
    GetU64 {
        key: String,
    },

    /// Set a stable-store value as uint64
    SetU64 {
        key: String,
        value: u64,
    },

    /// List stored keys per namespace
    Keys {
        /// Maximum keys printed per namespace
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Print engine space usage
    Size,

    /// Compact the database if enough of it is garbage
    Gc {
        /// Fragmented share that triggers compaction, in (0, 1)
        #[arg(default_value = "0.5")]
        ratio: f64,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atlas_raftstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_not_found() => {
            eprintln!("{}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), StoreError> {
    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .no_sync(args.no_sync);
    if let Commands::DeleteRange { batch_size, .. } = &args.command {
        builder = builder.delete_batch_size(*batch_size);
    }
    let store = RaftStore::open(builder.build())?;

    match args.command {
        Commands::FirstIndex => println!("{}", store.first_index()?),
        Commands::LastIndex => println!("{}", store.last_index()?),
        Commands::GetLog { index } => {
            let record = store.get_log(index)?;
            println!("index:       {}", record.index);
            println!("term:        {}", record.term);
            println!("kind:        {:?}", record.kind);
            println!("data:        {}", String::from_utf8_lossy(&record.data));
            println!("extensions:  {} bytes", record.extensions.len());
            match record.appended_at {
                Some(at) => println!("appended_at: {}", at.to_rfc3339()),
                None => println!("appended_at: -"),
            }
        }
        Commands::DeleteRange { min, max, .. } => {
            let mut range = store.log().range_delete(min, max);
            let deleted = range.run(store.log().engine().as_ref())?;
            println!("deleted {} entries in {} batches", deleted, range.batches());
        }
        Commands::Get { key } => {
            let value = store.get(key.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Set { key, value } => {
            store.set(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::GetU64 { key } => println!("{}", store.get_uint64(key.as_bytes())?),
        Commands::SetU64 { key, value } => {
            store.set_uint64(key.as_bytes(), value)?;
            println!("OK");
        }
        Commands::Keys { limit } => {
            let txn = store.log().engine().begin_read()?;
            for namespace in Namespace::ALL {
                let prefix = namespace.prefix();
                let keys = txn.scan_keys(&PrefixScan::forward(prefix, prefix).limit(limit))?;
                println!("{} ({} shown)", namespace.name(), keys.len());
                for raw in &keys {
                    match EngineKey::parse(raw)? {
                        EngineKey::Log(index) => println!("  {}", index),
                        EngineKey::Conf(key) => println!("  {}", String::from_utf8_lossy(key)),
                    }
                }
            }
        }
        Commands::Size => {
            let size = store.size()?;
            println!("stored:     {} bytes", size.stored_bytes);
            println!("metadata:   {} bytes", size.metadata_bytes);
            println!("fragmented: {} bytes ({:.1}%)", size.fragmented_bytes, size.fragmented_ratio() * 100.0);
        }
        Commands::Gc { ratio } => println!("{:?}", store.run_value_log_gc(ratio)?),
    }

    store.close()
}

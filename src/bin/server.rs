//! EmberKV Server Binary
//!
//! Starts a storage node serving in-memory stores over TCP.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use emberkv::network::Server;
use emberkv::store::{InMemoryStore, Partitioner, StoreRegistry};
use emberkv::{Config, Result, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// EmberKV Server
#[derive(Parser, Debug)]
#[command(name = "emberkv-server")]
#[command(about = "Storage node for a vector-clock versioned key-value store")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6666")]
    listen: String,

    /// Store to serve (repeat for several stores)
    #[arg(short, long = "store", default_value = "default")]
    stores: Vec<String>,

    /// Number of partitions the key space is split into
    #[arg(short, long, default_value = "32")]
    partitions: u32,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// This node's id
    #[arg(long, default_value = "0")]
    node_id: u16,

    /// Directory for store snapshots (disabled if omitted)
    #[arg(long)]
    snapshot_dir: Option<String>,

    /// Seconds between snapshots
    #[arg(long, default_value = "60")]
    snapshot_interval_secs: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emberkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("EmberKV Server v{}", emberkv::VERSION);
    tracing::info!("Node id: {}", args.node_id);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let mut builder = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .partition_count(args.partitions)
        .node_id(args.node_id);
    if let Some(dir) = &args.snapshot_dir {
        builder = builder.snapshot_dir(dir);
    }
    let config = builder.build();

    if let Err(e) = run(config, &args.stores, args.snapshot_interval_secs) {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

fn run(config: Config, store_names: &[String], snapshot_interval_secs: u64) -> Result<()> {
    config.validate()?;
    let partitioner = Partitioner::new(config.partition_count)?;

    let stores = open_stores(&config, partitioner, store_names)?;

    let mut registry = StoreRegistry::builder();
    for store in &stores {
        registry = registry.register_streamable(Arc::clone(store));
    }
    let registry = Arc::new(registry.build()?);

    if config.snapshot_dir.is_some() && snapshot_interval_secs > 0 {
        spawn_snapshotter(config.clone(), stores, Duration::from_secs(snapshot_interval_secs))?;
    }

    let server = Server::bind(config, registry)?;
    server.run()
}

/// Open every store, restoring from its snapshot when one exists
fn open_stores(
    config: &Config,
    partitioner: Partitioner,
    store_names: &[String],
) -> Result<Vec<Arc<InMemoryStore>>> {
    let mut stores = Vec::with_capacity(store_names.len());

    for name in store_names {
        let store = match config.snapshot_path(name) {
            Some(path) if path.exists() => {
                let store = InMemoryStore::load_snapshot(name.as_str(), partitioner, &path)?;
                tracing::info!("Restored store '{}' with {} keys", name, store.key_count());
                store
            }
            _ => InMemoryStore::new(name.as_str(), partitioner),
        };
        stores.push(Arc::new(store));
    }

    if let Some(dir) = &config.snapshot_dir {
        std::fs::create_dir_all(dir)?;
    }

    Ok(stores)
}

/// Periodically write each store's snapshot
fn spawn_snapshotter(
    config: Config,
    stores: Vec<Arc<InMemoryStore>>,
    interval: Duration,
) -> Result<()> {
    thread::Builder::new()
        .name("emberkv-snapshot".to_string())
        .spawn(move || loop {
            thread::sleep(interval);
            for store in &stores {
                let Some(path) = config.snapshot_path(store.name()) else {
                    continue;
                };
                if let Err(e) = store.save_snapshot(&path) {
                    tracing::error!("Snapshot of {} failed: {}", path.display(), e);
                }
            }
        })?;
    Ok(())
}

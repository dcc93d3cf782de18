//! EmberKV CLI Client
//!
//! Command-line interface for interacting with an EmberKV node.

use clap::{Parser, Subcommand};
use emberkv::protocol::StoreClient;
use emberkv::versioning::{now_millis, VectorClock};
use emberkv::{Result, Versioned};

/// EmberKV CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv-cli")]
#[command(about = "CLI for the EmberKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6666")]
    server: String,

    /// Store to operate on
    #[arg(long, default_value = "default")]
    store: String,

    /// Node id used to advance vector clocks on writes
    #[arg(long, default_value = "0")]
    node_id: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get every live version of a key
    Get {
        /// The key to get
        key: String,
    },

    /// Write a new version of a key, superseding all current versions
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete every current version of a key
    Delete {
        /// The key to delete
        key: String,
    },

    /// Dump every entry in the given partitions
    FetchPartitions {
        /// Partition ids
        #[arg(required = true)]
        partitions: Vec<i32>,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut client = StoreClient::connect(&args.server)?;
    let store = args.store.as_str();

    match args.command {
        Commands::Get { key } => {
            let versions = client.get(store, key.as_bytes())?;
            if versions.is_empty() {
                println!("(not found)");
            }
            for versioned in versions {
                println!(
                    "{}  {:?}",
                    String::from_utf8_lossy(versioned.value()),
                    versioned.version().entries()
                );
            }
        }
        Commands::Put { key, value } => {
            let current = current_clock(&mut client, store, key.as_bytes())?;
            let clock = current.incremented(args.node_id, now_millis())?;
            client.put(store, key.as_bytes(), &Versioned::new(value.into_bytes(), clock))?;
            println!("OK");
        }
        Commands::Delete { key } => {
            let current = current_clock(&mut client, store, key.as_bytes())?;
            let deleted = client.delete(store, key.as_bytes(), &current)?;
            println!("{}", if deleted { "deleted" } else { "(not found)" });
        }
        Commands::FetchPartitions { partitions } => {
            let entries = client.fetch_partitions(store, &partitions)?;
            for (key, blob) in &entries {
                match Versioned::from_blob(blob) {
                    Ok(versioned) => println!(
                        "{} = {}",
                        String::from_utf8_lossy(key),
                        String::from_utf8_lossy(versioned.value())
                    ),
                    Err(_) => println!("{} = <{} bytes>", String::from_utf8_lossy(key), blob.len()),
                }
            }
            println!("{} entries", entries.len());
        }
    }

    Ok(())
}

/// Merge of all live versions' clocks, so a new write supersedes them all
fn current_clock(client: &mut StoreClient, store: &str, key: &[u8]) -> Result<VectorClock> {
    let versions = client.get(store, key)?;
    versions
        .iter()
        .try_fold(VectorClock::with_timestamp(0), |acc, v| acc.merge(v.version()))
}

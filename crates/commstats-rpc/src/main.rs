//! Commstats RPC Server - JSON-RPC backend for the HR dashboard.
//!
//! Wraps the commstats-core aggregation service in a JSON-RPC 2.0 server.
//! Reads from Supabase (`SUPABASE_URL` / `SUPABASE_ANON_KEY`) unless a JSON
//! fixtures file is given.

mod handlers;
mod server;

use anyhow::Result;
use clap::Parser;
use commstats_core::{
    AggregationConfig, AggregationService, CollectionStore, InMemoryStore, StatsCache,
    SupabaseStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "commstats-rpc")]
#[command(about = "JSON-RPC server for HR dashboard statistics")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Serve collections from a JSON fixtures file instead of Supabase
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Cache time-to-live in seconds
    #[arg(long, default_value = "300")]
    cache_ttl_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Commstats RPC Server");

    let store: Arc<dyn CollectionStore> = match &args.fixtures {
        Some(path) => {
            info!("Serving fixtures from {}", path.display());
            Arc::new(InMemoryStore::from_json_file(path)?)
        }
        None => Arc::new(SupabaseStore::from_env()?),
    };

    let cache = Arc::new(StatsCache::with_ttl(Duration::from_secs(args.cache_ttl_secs)));
    let service = AggregationService::new(store, cache, AggregationConfig::default());

    // Start the server
    let addr = server::start_server(service, &args.host, args.port).await?;

    // Print port for the parent process to read (intentional stdout)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}

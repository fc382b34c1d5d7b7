//! SnapKV Server Binary
//!
//! Starts the HTTP server for SnapKV.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use snapkv::config::DumpStrategy;
use snapkv::network::Server;
use snapkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// SnapKV Server
#[derive(Parser, Debug)]
#[command(name = "snapkv-server")]
#[command(about = "HTTP key-value store with JSON snapshots")]
#[command(version)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file [default: ./database.json]
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Listen address (host:port) [default: 0.0.0.0:8080]
    #[arg(short, long)]
    listen: Option<String>,

    /// Maximum concurrent connections [default: 1024]
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// Give up waiting on the engine after this many milliseconds (0 waits forever)
    #[arg(short = 't', long)]
    request_timeout_ms: Option<u64>,

    /// Write snapshots to a temp file and rename instead of truncating in place
    #[arg(long)]
    atomic_dump: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,snapkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let base = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    // Command-line flags win over the config file
    let mut builder = base.into_builder();
    if let Some(database) = args.database {
        builder = builder.database_path(database);
    }
    if let Some(listen) = args.listen {
        builder = builder.listen_addr(listen);
    }
    if let Some(max) = args.max_connections {
        builder = builder.max_connections(max);
    }
    if let Some(ms) = args.request_timeout_ms {
        builder = builder.request_timeout((ms > 0).then(|| Duration::from_millis(ms)));
    }
    if args.atomic_dump {
        builder = builder.dump_strategy(DumpStrategy::AtomicRename);
    }
    let config = builder.build();

    tracing::info!("SnapKV Server v{}", snapkv::VERSION);
    tracing::info!("Database file: {}", config.database_path.display());
    tracing::info!("Listen address: {}", config.listen_addr);
    tracing::debug!("Dump strategy: {:?}", config.dump_strategy);

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let listen_addr = config.listen_addr.clone();
    let server = match Server::bind(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

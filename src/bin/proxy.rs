//! resptap Proxy Binary
//!
//! Relays a TCP port to a real server and logs every framed message.

use clap::Parser;
use resptap::network::{Direction, Server};
use resptap::{Config, MessageKind};
use tracing_subscriber::{fmt, EnvFilter};

/// resptap Proxy
#[derive(Parser, Debug)]
#[command(name = "resptap-proxy")]
#[command(about = "Observing relay for key-value store traffic")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6378")]
    listen: String,

    /// Upstream server address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    upstream: String,

    /// Worker threads (concurrent connections)
    #[arg(short, long, default_value = "64")]
    workers: usize,

    /// Maximum bytes buffered per direction while a message is incomplete
    #[arg(long, default_value = "536870912")]
    max_pending_bytes: usize,

    /// Maximum array nesting depth
    #[arg(long, default_value = "128")]
    max_depth: usize,

    /// Read timeout in milliseconds (0 = none)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,resptap=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("resptap proxy v{}", resptap::VERSION);
    tracing::info!("Listen address: {}", args.listen);
    tracing::info!("Upstream address: {}", args.upstream);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .upstream_addr(&args.upstream)
        .workers(args.workers)
        .max_pending_bytes(args.max_pending_bytes)
        .max_nesting_depth(args.max_depth)
        .read_timeout_ms(args.read_timeout_ms)
        .build();

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    let snapshot = server.stats().snapshot();
    for direction in Direction::BOTH {
        let per_kind: Vec<String> = MessageKind::ALL
            .iter()
            .map(|&kind| format!("{}={}", kind, snapshot.messages(direction, kind)))
            .collect();
        tracing::info!(
            "{}: {} bytes, {} protocol errors, {}",
            direction,
            snapshot.bytes(direction),
            snapshot.protocol_errors(direction),
            per_kind.join(" ")
        );
    }

    tracing::info!("Server stopped");
}

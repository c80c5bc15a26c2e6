//! Graph manager CLI surface.

use clap::Parser;
use std::time::Duration;

/// Centralized topology aggregator for a peer-to-peer cryptocurrency network.
#[derive(Parser, Debug, Clone)]
#[command(name = "graph-manager", about = "Crawls self-registered nodes and serves a live network graph")]
pub struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

/// Per-node HTTP timeout while crawling `/peers` and `/info` (kept short so
/// one unreachable node doesn't stall the whole snapshot).
pub const CRAWL_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound on each SSE subscriber's outgoing channel; slow consumers drop
/// updates rather than backing up the notifier (§9).
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 16;

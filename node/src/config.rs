//! Node CLI surface and derived configuration.

use clap::{Parser, ValueEnum};
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Normal,
    Miner,
}

/// A small peer-to-peer cryptocurrency node.
#[derive(Parser, Debug, Clone)]
#[command(name = "node", about = "Peer-to-peer proof-of-work cryptocurrency node")]
pub struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// Comma-separated `host:port` seed peers.
    #[arg(long)]
    pub seeds: Option<String>,

    #[arg(long, value_enum, default_value_t = Role::Normal)]
    pub role: Role,

    /// Wallet label whose public key (in `db/<label>.pub`) this node mines to.
    #[arg(long)]
    pub wallet_label: Option<String>,

    /// Base URL of a centralized graph manager to self-register with.
    #[arg(long)]
    pub centralized_manager: Option<String>,
}

impl Cli {
    pub fn seed_peers(&self) -> Vec<(String, u16)> {
        let Some(seeds) = &self.seeds else { return Vec::new() };
        seeds
            .split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                if entry.is_empty() {
                    return None;
                }
                let (host, port) = entry.rsplit_once(':')?;
                let port: u16 = port.parse().ok()?;
                Some((host.to_string(), port))
            })
            .collect()
    }

    pub fn chain_db_path(&self) -> String {
        format!("db/chain_{}.db", self.port)
    }

    pub fn peers_db_path(&self) -> String {
        format!("db/peers_{}.db", self.port)
    }

    /// Reads the node's own public key from the wallet's public-key
    /// handoff file, falling back to a deterministic local identity when
    /// no wallet label is configured (useful for tests and demos).
    pub fn load_public_key(&self) -> String {
        if let Some(label) = &self.wallet_label {
            let path = format!("db/{label}.pub");
            if let Ok(contents) = std::fs::read_to_string(&path) {
                let key = contents.trim().to_string();
                if !key.is_empty() {
                    return key;
                }
            }
            tracing::warn!(path, "wallet public-key file missing or empty, using local identity");
        }
        chain::canonical_hash(&format!("{}:{}", self.host, self.port))
    }
}

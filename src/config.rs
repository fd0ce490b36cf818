use clap::Parser;
use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::DEFAULT_DIFFICULTY;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_PEER_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_PEER_FANOUT: usize = 8;
pub const DEFAULT_MINING_REWARD: u64 = 1;

/// Command line overrides for the environment.
#[derive(Debug, Parser)]
#[command(name = "pow_ledger", about = "Single-node proof-of-work ledger")]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,
}

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub difficulty: u32,
    pub peer_timeout: Duration,
    pub peer_fanout: usize,
    pub mining_reward: u64,
    pub node_identifier: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            difficulty: DEFAULT_DIFFICULTY,
            peer_timeout: Duration::from_secs(DEFAULT_PEER_TIMEOUT_SECS),
            peer_fanout: DEFAULT_PEER_FANOUT,
            mining_reward: DEFAULT_MINING_REWARD,
            node_identifier: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port),
            difficulty: parse_var("MINING_DIFFICULTY", defaults.difficulty),
            peer_timeout: Duration::from_secs(parse_var(
                "PEER_TIMEOUT_SECS",
                DEFAULT_PEER_TIMEOUT_SECS,
            )),
            peer_fanout: parse_var("PEER_FANOUT", defaults.peer_fanout).max(1),
            mining_reward: parse_var("MINING_REWARD", defaults.mining_reward),
            node_identifier: env::var("NODE_IDENTIFIER")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.node_identifier),
        }
    }

    /// Apply command line overrides on top of the environment.
    pub fn with_cli(mut self, cli: Cli) -> Self {
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(host) = cli.host {
            self.host = host;
        }
        self
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{name}={raw:?} is not valid, using {default}");
            default
        }),
        Err(_) => default,
    }
}

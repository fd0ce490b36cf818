use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::blockchain::Block;
use crate::config::Settings;
use crate::node::{HttpChainFetcher, Node};
use crate::transaction::Transaction;
use crate::wallet::WalletSummary;

/// Shared application state: the ledger node and the peer client.
pub struct AppState {
    pub node: Node,
    pub fetcher: HttpChainFetcher,
}

impl AppState {
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        Ok(Self {
            node: Node::new(settings),
            fetcher: HttpChainFetcher::new(settings.peer_timeout)?,
        })
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub message: &'static str,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
    pub wallets: HashMap<String, WalletSummary>,
}

#[derive(Serialize)]
pub struct DifficultyResponse {
    pub difficulty: u32,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<u64>,
}

#[derive(Serialize)]
pub struct NewTxResponse {
    pub message: String,
    pub index: u64,
}

#[derive(Deserialize)]
pub struct SeedRequest {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<u64>,
    pub rounds: Option<u32>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(rename = "txID", default)]
    pub txid: Option<String>,
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    pub signature: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct TransactionsResponse {
    pub message: &'static str,
    pub transactions: Vec<Transaction>,
}

#[derive(Serialize)]
pub struct MempoolResponse {
    pub size: usize,
    pub transactions: Vec<String>, // list txids for brevity
}

/* ---------- Node API Models ---------- */

#[derive(Deserialize)]
pub struct RegisterNodesRequest {
    pub nodes: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct RegisterNodesResponse {
    pub message: &'static str,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub message: &'static str,
    pub replaced: bool,
    pub chain: Vec<Block>,
}

/* ---------- Wallet API Models ---------- */

#[derive(Serialize)]
pub struct NewWalletResponse {
    pub address: String,
    pub public_key: String,
    pub private_key: String,
    pub balance: u64,
}

#[derive(Serialize)]
pub struct WalletsResponse {
    pub wallets: HashMap<String, WalletSummary>,
}

#[derive(Serialize)]
pub struct DemoResponse {
    pub message: &'static str,
    pub transactions: usize,
    pub wallet1: String,
    pub wallet2: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub height: usize,
    pub difficulty: u32,
    pub mempool_size: usize,
    pub wallets: usize,
    pub peers: usize,
    pub node_identifier: String,
}

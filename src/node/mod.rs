pub mod consensus;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::blockchain::{self, Block, Blockchain, DIFF_MAX, search_proof};
use crate::config::Settings;
use crate::error::LedgerError;
use crate::transaction::{REWARD_SENDER, Transaction};
use crate::wallet::{Wallet, WalletRegistry, WalletSummary, registry::find_transaction};

pub use consensus::{ChainFetcher, ChainReport, FetchPolicy, HttpChainFetcher, NodeSet};

/// Chain, mempool and wallets; always mutated together under one lock.
#[derive(Debug)]
pub struct LedgerState {
    pub blockchain: Blockchain,
    pub wallets: WalletRegistry,
}

/// Lightweight counters for the stats endpoint.
#[derive(Debug, Clone, Copy)]
pub struct NodeStats {
    pub height: usize,
    pub difficulty: u32,
    pub mempool_size: usize,
    pub wallets: usize,
    pub peers: usize,
}

/// The process-wide ledger. All operations go through here.
#[derive(Debug)]
pub struct Node {
    state: Mutex<LedgerState>,
    nodes: Mutex<NodeSet>,
    /// Bumped whenever the tip changes; an in-flight proof search stops
    /// when it sees a value other than the one it started with.
    tip_epoch: Arc<AtomicU64>,
    node_identifier: String,
    mining_reward: u64,
    fetch_policy: FetchPolicy,
}

impl Node {
    pub fn new(settings: &Settings) -> Self {
        let difficulty = if settings.difficulty > DIFF_MAX {
            warn!(
                "difficulty {} above maximum, using {DIFF_MAX}",
                settings.difficulty
            );
            DIFF_MAX
        } else {
            settings.difficulty
        };
        Self {
            state: Mutex::new(LedgerState {
                blockchain: Blockchain::new(difficulty),
                wallets: WalletRegistry::new(),
            }),
            nodes: Mutex::new(NodeSet::new()),
            tip_epoch: Arc::new(AtomicU64::new(0)),
            node_identifier: settings.node_identifier.clone(),
            mining_reward: settings.mining_reward,
            fetch_policy: FetchPolicy {
                timeout: settings.peer_timeout,
                fanout: settings.peer_fanout,
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().expect("mutex poisoned")
    }

    fn bump_tip(&self) {
        self.tip_epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn node_identifier(&self) -> &str {
        &self.node_identifier
    }

    /* -------------------- Wallets -------------------- */

    pub fn create_wallet(&self) -> Wallet {
        self.lock().wallets.create_wallet()
    }

    pub fn wallets(&self) -> HashMap<String, WalletSummary> {
        self.lock().wallets.summaries()
    }

    pub fn get_transactions(&self, address: &str) -> Vec<Transaction> {
        let state = self.lock();
        state.wallets.get_transactions(address, &state.blockchain.chain)
    }

    pub fn get_transaction_by_id(&self, txid: &str) -> Option<Transaction> {
        find_transaction(&self.lock().blockchain.chain, txid).cloned()
    }

    /* -------------------- Ledger -------------------- */

    /// Queue a transfer; returns the index of the block it will join.
    pub fn new_transaction(
        &self,
        sender: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<u64, LedgerError> {
        let mut state = self.lock();
        let LedgerState {
            blockchain,
            wallets,
        } = &mut *state;
        blockchain.new_transaction(wallets, sender, recipient, amount)
    }

    pub fn hash(block: &Block) -> String {
        block.hash()
    }

    /// Validate `chain` at this node's difficulty without holding the
    /// ledger lock.
    pub fn valid_chain(&self, chain: &[Block]) -> bool {
        let difficulty = self.difficulty();
        blockchain::valid_chain(chain, difficulty)
    }

    /// Check a transaction's signature; reasons other than success are logged.
    pub fn verify_transaction(&self, tx: &Transaction) -> bool {
        let outcome = blockchain::verify_transaction(&self.lock().wallets, tx);
        if !outcome.is_verified() {
            warn!("transaction {} not verified: {outcome}", tx.txid);
        }
        outcome.is_verified()
    }

    pub fn chain(&self) -> Vec<Block> {
        self.lock().blockchain.chain.clone()
    }

    pub fn chain_report(&self) -> ChainReport {
        ChainReport::new(self.chain())
    }

    pub fn last_block(&self) -> Block {
        self.lock().blockchain.last_block().clone()
    }

    pub fn mempool(&self) -> Vec<Transaction> {
        self.lock().blockchain.current_transactions.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().blockchain.len()
    }

    pub fn difficulty(&self) -> u32 {
        self.lock().blockchain.difficulty()
    }

    pub fn is_valid(&self) -> bool {
        self.valid_chain(&self.chain())
    }

    pub fn stats(&self) -> NodeStats {
        let (height, difficulty, mempool_size, wallets) = {
            let state = self.lock();
            (
                state.blockchain.len(),
                state.blockchain.difficulty(),
                state.blockchain.current_transactions.len(),
                state.wallets.len(),
            )
        };
        NodeStats {
            height,
            difficulty,
            mempool_size,
            wallets,
            peers: self.nodes.lock().expect("mutex poisoned").len(),
        }
    }

    /* -------------------- Mining -------------------- */

    /// Find a proof for the current tip off the async runtime, then seal the
    /// mempool plus a reward transaction. The search restarts if the tip
    /// moves before the block can be committed.
    pub async fn mine(&self) -> Result<Block, LedgerError> {
        loop {
            let epoch = self.tip_epoch.load(Ordering::SeqCst);
            let last = self.last_block();
            let (last_proof, last_hash) = (last.proof, Self::hash(&last));
            let difficulty = self.difficulty();

            let tip = Arc::clone(&self.tip_epoch);
            let search_hash = last_hash.clone();
            let found = tokio::task::spawn_blocking(move || {
                search_proof(last_proof, &search_hash, difficulty, || {
                    tip.load(Ordering::SeqCst) != epoch
                })
            })
            .await
            .map_err(|e| LedgerError::Mining(e.to_string()))?;

            let Some(proof) = found else {
                debug!("tip moved during proof search; restarting");
                continue;
            };

            let Some(block) = self.commit_mined(proof, last_hash)? else {
                debug!("tip advanced before commit; restarting");
                continue;
            };
            info!(
                "block #{} forged (proof={}, txs={})",
                block.index,
                block.proof,
                block.transactions.len()
            );
            return Ok(block);
        }
    }

    /// Seal the mempool plus the reward on top of `last_hash`, or `None` if
    /// the tip is no longer that block.
    fn commit_mined(&self, proof: u64, last_hash: String) -> Result<Option<Block>, LedgerError> {
        let mut state = self.lock();
        if state.blockchain.last_block().hash() != last_hash {
            return Ok(None);
        }
        let LedgerState {
            blockchain,
            wallets,
        } = &mut *state;
        blockchain.new_transaction(
            wallets,
            REWARD_SENDER,
            &self.node_identifier,
            self.mining_reward,
        )?;
        let block = blockchain.new_block(proof, Some(last_hash)).clone();
        drop(state);
        self.bump_tip();
        Ok(Some(block))
    }
}

/// Sealing with a proof found outside `mine`. The HTTP surface always mines
/// through `Node::mine`, so only in-process callers reach these.
#[allow(dead_code)]
impl Node {
    /// Seal the mempool with an externally found proof.
    pub fn new_block(&self, proof: u64, previous_hash: Option<String>) -> Block {
        let block = self.lock().blockchain.new_block(proof, previous_hash).clone();
        self.bump_tip();
        block
    }

    /// Blocking proof search against `last_block` at this node's difficulty.
    pub fn proof_of_work(&self, last_block: &Block) -> u64 {
        blockchain::proof_of_work(last_block, self.difficulty())
    }
}

impl Node {
    /* -------------------- Consensus -------------------- */

    pub fn register_node(&self, address: &str) -> Result<String, LedgerError> {
        let node = self.nodes.lock().expect("mutex poisoned").register(address)?;
        info!("registered node {node}");
        Ok(node)
    }

    pub fn nodes(&self) -> Vec<String> {
        self.nodes.lock().expect("mutex poisoned").to_vec()
    }

    /// Replace the local chain with the longest valid peer chain, if any
    /// peer has one strictly longer. Returns whether a replacement happened.
    pub async fn resolve_conflicts<F: ChainFetcher>(&self, fetcher: &F) -> bool {
        let peers = {
            let nodes = self.nodes.lock().expect("mutex poisoned");
            if nodes.is_empty() {
                return false;
            }
            nodes.to_vec()
        };
        let (local_len, difficulty) = {
            let state = self.lock();
            (state.blockchain.len(), state.blockchain.difficulty())
        };

        let Some((peer, chain)) = consensus::longest_valid_chain(
            fetcher,
            &peers,
            local_len,
            difficulty,
            self.fetch_policy,
        )
        .await
        else {
            debug!("local chain ({local_len} blocks) is authoritative");
            return false;
        };

        let mut state = self.lock();
        if chain.len() <= state.blockchain.len() {
            debug!("local chain grew past {peer}'s during resolution");
            return false;
        }
        let length = chain.len();
        state.blockchain.replace_chain(chain);
        drop(state);
        self.bump_tip();
        info!("chain replaced by {peer}'s ({length} blocks)");
        true
    }
}

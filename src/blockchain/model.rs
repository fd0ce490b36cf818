use log::{debug, warn};

use super::Block;
use super::pow::valid_proof;
use crate::error::{ChainError, LedgerError};
use crate::transaction::{Transaction, transfer_message};
use crate::wallet::{self, Verification, WalletRegistry};

/// In-memory chain plus the pool of transactions waiting for the next block.
#[derive(Debug)]
pub struct Blockchain {
    pub chain: Vec<Block>,
    pub current_transactions: Vec<Transaction>,
    difficulty: u32,
}

impl Blockchain {
    /// Initialize a new blockchain with a genesis block.
    pub fn new(difficulty: u32) -> Self {
        Self {
            chain: vec![Block::genesis()],
            current_transactions: Vec::new(),
            difficulty,
        }
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    /// Seal the mempool into a new block and append it. `previous_hash`
    /// defaults to the hash of the current tip.
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> &Block {
        let previous_hash = previous_hash.unwrap_or_else(|| self.last_block().hash());
        let block = Block {
            index: self.chain.len() as u64 + 1,
            timestamp: super::block::now_timestamp(),
            transactions: std::mem::take(&mut self.current_transactions),
            proof,
            previous_hash,
        };
        self.chain.push(block);
        self.last_block()
    }

    /// Queue a transfer and return the index of the block it will land in.
    /// Signed when the sender is a registered wallet; reward and other
    /// unknown senders stay unsigned.
    pub fn new_transaction(
        &mut self,
        wallets: &mut WalletRegistry,
        sender: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<u64, LedgerError> {
        let sender = sender.trim();
        let recipient = recipient.trim();
        if sender.is_empty() || recipient.is_empty() {
            return Err(LedgerError::InvalidInput(
                "sender and recipient are required".into(),
            ));
        }

        let mut tx = Transaction::new(sender, recipient, amount);
        match wallets.get(sender) {
            Some(sender_wallet) => {
                let message = transfer_message(
                    &sender_wallet.public_key_hex(),
                    &recipient_identity(wallets, recipient),
                    amount,
                );
                tx = tx.with_signature(sender_wallet.sign(&message));
            }
            None => debug!("sender {sender} has no wallet; transaction {} unsigned", tx.txid),
        }

        wallets.record_sent(sender, &tx.txid);
        debug!(
            "queued tx {} ({sender} -> {recipient}, {amount}); mempool size {}",
            tx.txid,
            self.current_transactions.len() + 1
        );
        self.current_transactions.push(tx);
        Ok(self.last_block().index + 1)
    }

    /// Swap in a whole chain. Callers validate first.
    pub fn replace_chain(&mut self, chain: Vec<Block>) {
        self.chain = chain;
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    #[cfg(test)]
    pub(crate) fn set_difficulty(&mut self, difficulty: u32) {
        self.difficulty = difficulty;
    }
}

/// Public key hex for registered recipients, the bare address otherwise.
fn recipient_identity(wallets: &WalletRegistry, recipient: &str) -> String {
    wallets
        .get(recipient)
        .map(|w| w.public_key_hex())
        .unwrap_or_else(|| recipient.to_string())
}

/// Whether `chain` links correctly and every proof passes at `difficulty`.
/// The failure reason is logged.
pub fn valid_chain(chain: &[Block], difficulty: u32) -> bool {
    match check_chain(chain, difficulty) {
        Ok(()) => true,
        Err(e) => {
            warn!("chain of length {} rejected: {e}", chain.len());
            false
        }
    }
}

/// Walk `chain` from the second block, checking linkage and proofs.
pub fn check_chain(chain: &[Block], difficulty: u32) -> Result<(), ChainError> {
    let genesis = chain.first().ok_or(ChainError::Empty)?;
    if !genesis.is_genesis_shaped() {
        return Err(ChainError::BadGenesis);
    }

    let mut last_hash = genesis.hash();
    for (offset, pair) in chain.windows(2).enumerate() {
        let (last, block) = (&pair[0], &pair[1]);
        let position = offset + 2;
        if block.index != position as u64 {
            return Err(ChainError::IndexMismatch {
                position,
                index: block.index,
            });
        }
        if block.previous_hash != last_hash {
            return Err(ChainError::PreviousHashMismatch { index: block.index });
        }
        if !valid_proof(last.proof, block.proof, &last_hash, difficulty) {
            return Err(ChainError::InvalidProof { index: block.index });
        }
        last_hash = block.hash();
    }
    Ok(())
}

/// Check a transaction's signature against its sender's registered key.
pub fn verify_transaction(wallets: &WalletRegistry, tx: &Transaction) -> Verification {
    let Some(sender_wallet) = wallets.get(&tx.sender) else {
        if !tx.is_reward() && !wallet::validate_address(&tx.sender) {
            return Verification::Undecodable("sender address");
        }
        return Verification::SenderUnknown;
    };
    let Some(signature) = tx.signature.as_deref() else {
        return Verification::Undecodable("missing signature");
    };
    let message = transfer_message(
        &sender_wallet.public_key_hex(),
        &recipient_identity(wallets, &tx.recipient),
        tx.amount,
    );
    wallet::verify(&sender_wallet.public_key_hex(), &message, signature)
}

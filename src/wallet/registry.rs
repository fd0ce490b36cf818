use std::collections::{HashMap, HashSet};

use log::info;

use super::{Wallet, WalletSummary};
use crate::blockchain::Block;
use crate::transaction::Transaction;

/// Registered wallets plus, per address, the txIDs that address has sent.
#[derive(Debug, Default)]
pub struct WalletRegistry {
    wallets: HashMap<String, Wallet>,
    sent: HashMap<String, Vec<String>>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a wallet, register it under its address and return a copy.
    pub fn create_wallet(&mut self) -> Wallet {
        let wallet = Wallet::new();
        let address = wallet.address().to_string();
        self.sent.entry(address.clone()).or_default();
        self.wallets.insert(address.clone(), wallet.clone());
        info!("wallet {address} registered");
        wallet
    }

    pub fn get(&self, address: &str) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    /// Append a sent txID to the sender's index. Unknown senders get an entry too.
    pub fn record_sent(&mut self, sender: &str, txid: &str) {
        self.sent
            .entry(sender.to_string())
            .or_default()
            .push(txid.to_string());
    }

    pub fn sent_ids(&self, address: &str) -> &[String] {
        self.sent.get(address).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mined transactions sent by `address`, oldest block first.
    pub fn get_transactions(&self, address: &str, chain: &[Block]) -> Vec<Transaction> {
        let ids: HashSet<&str> = self.sent_ids(address).iter().map(String::as_str).collect();
        if ids.is_empty() {
            return Vec::new();
        }
        chain
            .iter()
            .flat_map(|b| b.transactions.iter())
            .filter(|tx| ids.contains(tx.txid.as_str()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn summaries(&self) -> HashMap<String, WalletSummary> {
        self.wallets
            .iter()
            .map(|(addr, w)| (addr.clone(), w.summary()))
            .collect()
    }
}

/// First transaction in chain order carrying `txid`.
pub fn find_transaction<'a>(chain: &'a [Block], txid: &str) -> Option<&'a Transaction> {
    chain
        .iter()
        .flat_map(|b| b.transactions.iter())
        .find(|tx| tx.txid == txid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with(index: u64, txs: Vec<Transaction>) -> Block {
        Block {
            index,
            timestamp: 0.0,
            transactions: txs,
            proof: 0,
            previous_hash: "x".into(),
        }
    }

    #[test]
    fn create_wallet_registers_and_indexes() {
        let mut reg = WalletRegistry::new();
        let w = reg.create_wallet();
        assert_eq!(reg.len(), 1);
        assert!(reg.get(w.address()).is_some());
        assert!(reg.sent_ids(w.address()).is_empty());
    }

    #[test]
    fn unknown_address_has_no_transactions() {
        let reg = WalletRegistry::new();
        assert!(reg.get_transactions("nobody", &[]).is_empty());
    }

    #[test]
    fn transactions_come_back_in_chain_order() {
        let mut reg = WalletRegistry::new();
        let t1 = Transaction::new("a", "b", 1);
        let t2 = Transaction::new("a", "b", 2);
        let other = Transaction::new("b", "a", 3);
        // index order differs from chain order on purpose
        reg.record_sent("a", &t2.txid);
        reg.record_sent("a", &t1.txid);
        let chain = vec![
            block_with(1, vec![t1.clone()]),
            block_with(2, vec![other, t2.clone()]),
        ];
        let got = reg.get_transactions("a", &chain);
        assert_eq!(got, vec![t1, t2]);
    }

    #[test]
    fn find_returns_first_match() {
        let t = Transaction::new("a", "b", 1);
        let chain = vec![block_with(1, vec![]), block_with(2, vec![t.clone()])];
        assert_eq!(find_transaction(&chain, &t.txid), Some(&t));
        assert_eq!(find_transaction(&chain, "missing"), None);
    }
}

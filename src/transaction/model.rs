use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender sentinel marking a mining-reward transaction. Never signed.
pub const REWARD_SENDER: &str = "0";

/// A transfer between two addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Random identifier assigned at creation; never reused.
    #[serde(rename = "txID")]
    pub txid: String,
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    /// Hex-encoded DER ECDSA signature over `transfer_message`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Transaction {
    /// Build an unsigned transaction with a fresh txID.
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            txid: Uuid::new_v4().to_string(),
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: String) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }
}

/// The exact string signed for a transfer: no separators, amount in decimal.
pub fn transfer_message(sender_public_key: &str, recipient_identity: &str, amount: u64) -> String {
    format!("{sender_public_key}{recipient_identity}{amount}")
}

pub mod block;
pub mod model;
pub mod pow;

pub use block::Block;
pub use model::{Blockchain, check_chain, valid_chain, verify_transaction};
pub use pow::{proof_of_work, search_proof};

/// Default Proof-of-Work difficulty (number of leading zeros).
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Highest difficulty accepted from configuration.
pub const DIFF_MAX: u32 = 6;

/// `previous_hash` carried by every genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Proof carried by every genesis block.
pub const GENESIS_PROOF: u64 = 100;

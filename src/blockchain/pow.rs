use sha2::{Digest, Sha256};

use super::Block;

/// How many candidates to try between cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// True when SHA-256(`last_proof` || `proof` || `last_hash`) in hex starts
/// with `difficulty` zero digits.
pub fn valid_proof(last_proof: u64, proof: u64, last_hash: &str, difficulty: u32) -> bool {
    let guess = format!("{last_proof}{proof}{last_hash}");
    let digest = hex::encode(Sha256::digest(guess.as_bytes()));
    leading_zero_digits(&digest) >= difficulty as usize
}

fn leading_zero_digits(hex_digest: &str) -> usize {
    hex_digest.bytes().take_while(|&c| c == b'0').count()
}

/// Smallest proof satisfying the predicate against `last_block`. Blocking and
/// unbounded; servers should use `search_proof` off the async runtime.
pub fn proof_of_work(last_block: &Block, difficulty: u32) -> u64 {
    let last_hash = last_block.hash();
    let mut proof = 0;
    while !valid_proof(last_block.proof, proof, &last_hash, difficulty) {
        proof += 1;
    }
    proof
}

/// Cancellable search from 0 upward. `cancelled` is polled periodically;
/// returns `None` once it reports true.
pub fn search_proof(
    last_proof: u64,
    last_hash: &str,
    difficulty: u32,
    cancelled: impl Fn() -> bool,
) -> Option<u64> {
    let mut proof = 0u64;
    loop {
        if valid_proof(last_proof, proof, last_hash, difficulty) {
            return Some(proof);
        }
        proof += 1;
        if proof % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
            return None;
        }
    }
}

pub mod registry;

use std::fmt;

use log::debug;
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub use registry::WalletRegistry;

/// Balance every fresh wallet starts with. Informational only, never debited.
pub const INITIAL_BALANCE: u64 = 1000;

const ADDRESS_VERSION: u8 = 0x00;
pub const ADDRESS_CHECKSUM_LEN: usize = 4;

/// Outcome of checking a signature. Callers outside the ledger only see
/// `is_verified()`; the variants exist for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    /// The sender address does not resolve to a registered wallet.
    SenderUnknown,
    /// Signature or key bytes could not be decoded (missing, not hex, bad key).
    Undecodable(&'static str),
    /// Bytes decoded but are not a well-formed DER signature.
    MalformedSignature,
    /// Well-formed signature that does not match the message and key.
    Mismatch,
}

impl Verification {
    pub fn is_verified(self) -> bool {
        matches!(self, Verification::Verified)
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Verified => write!(f, "verified"),
            Verification::SenderUnknown => write!(f, "sender wallet unknown"),
            Verification::Undecodable(what) => write!(f, "undecodable {what}"),
            Verification::MalformedSignature => write!(f, "malformed DER signature"),
            Verification::Mismatch => write!(f, "signature does not match"),
        }
    }
}

/// Generate a fresh secp256k1 keypair.
pub fn generate_keypair() -> (PublicKey, SecretKey) {
    let secp = Secp256k1::new();
    let (sk, pk) = secp.generate_keypair(&mut OsRng);
    (pk, sk)
}

/// Lowercase hex of the compressed (33 byte) public key.
pub fn public_key_hex(public_key: &PublicKey) -> String {
    hex::encode(public_key.serialize())
}

/// Base58Check address: version || RIPEMD-160(SHA-256(pubkey)) || checksum.
pub fn derive_address(public_key: &PublicKey) -> String {
    let mut payload = Vec::with_capacity(1 + 20 + ADDRESS_CHECKSUM_LEN);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(&hash_public_key(&public_key.serialize()));
    let checksum = checksum(&payload);
    payload.extend_from_slice(&checksum);
    bs58::encode(payload).into_string()
}

/// Check that `address` decodes and carries a matching checksum.
pub fn validate_address(address: &str) -> bool {
    let Ok(payload) = bs58::decode(address).into_vec() else {
        return false;
    };
    if payload.len() <= ADDRESS_CHECKSUM_LEN + 1 {
        return false;
    }
    let (body, actual) = payload.split_at(payload.len() - ADDRESS_CHECKSUM_LEN);
    body[0] == ADDRESS_VERSION && checksum(body) == actual
}

fn hash_public_key(public_key: &[u8]) -> Vec<u8> {
    let sha = Sha256::digest(public_key);
    Ripemd160::digest(sha).to_vec()
}

fn checksum(payload: &[u8]) -> [u8; ADDRESS_CHECKSUM_LEN] {
    let twice = Sha256::digest(Sha256::digest(payload));
    let mut out = [0u8; ADDRESS_CHECKSUM_LEN];
    out.copy_from_slice(&twice[..ADDRESS_CHECKSUM_LEN]);
    out
}

fn message_digest(message: &str) -> Message {
    let digest = Sha256::digest(message.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    Message::from_digest(out)
}

/// Sign the UTF-8 bytes of `message` (ECDSA over SHA-256). Returns DER bytes.
pub fn sign(secret_key: &SecretKey, message: &str) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    secp.sign_ecdsa(&message_digest(message), secret_key)
        .serialize_der()
        .to_vec()
}

/// Verify a hex DER signature over `message` against a hex public key.
pub fn verify(public_key_hex: &str, message: &str, signature_hex: &str) -> Verification {
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return Verification::Undecodable("signature hex");
    };
    let Ok(sig) = Signature::from_der(&sig_bytes) else {
        return Verification::MalformedSignature;
    };
    let pk = match hex::decode(public_key_hex)
        .ok()
        .and_then(|bytes| PublicKey::from_slice(&bytes).ok())
    {
        Some(pk) => pk,
        None => return Verification::Undecodable("public key"),
    };
    let secp = Secp256k1::verification_only();
    match secp.verify_ecdsa(&message_digest(message), &sig, &pk) {
        Ok(()) => Verification::Verified,
        Err(e) => {
            debug!("ecdsa verification failed: {e}");
            Verification::Mismatch
        }
    }
}

/// A keypair with its derived address and an informational balance.
#[derive(Clone)]
pub struct Wallet {
    public_key: PublicKey,
    secret_key: SecretKey,
    address: String,
    pub balance: u64,
}

impl Wallet {
    pub fn new() -> Self {
        let (public_key, secret_key) = generate_keypair();
        let address = derive_address(&public_key);
        Self {
            public_key,
            secret_key,
            address,
            balance: INITIAL_BALANCE,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        public_key_hex(&self.public_key)
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Sign `message` with this wallet's private key; hex DER.
    pub fn sign(&self, message: &str) -> String {
        hex::encode(sign(&self.secret_key, message))
    }

    pub fn summary(&self) -> WalletSummary {
        WalletSummary {
            public_key: self.public_key_hex(),
            balance: self.balance,
        }
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("public_key", &self.public_key_hex())
            .field("balance", &self.balance)
            .finish_non_exhaustive()
    }
}

/// Public view of a wallet.
#[derive(Debug, Clone, Serialize)]
pub struct WalletSummary {
    pub public_key: String,
    pub balance: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_deterministic() {
        let (pk, _) = generate_keypair();
        assert_eq!(derive_address(&pk), derive_address(&pk));
        assert!(validate_address(&derive_address(&pk)));
    }

    #[test]
    fn distinct_keys_give_distinct_addresses() {
        let a = Wallet::new();
        let b = Wallet::new();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn tampered_address_fails_checksum() {
        let w = Wallet::new();
        let mut chars: Vec<char> = w.address().chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '2' { '3' } else { '2' };
        let tampered: String = chars.into_iter().collect();
        assert!(!validate_address(&tampered));
        assert!(!validate_address("0OIl"));
    }

    #[test]
    fn sign_then_verify() {
        let w = Wallet::new();
        let sig = w.sign("hello");
        assert_eq!(verify(&w.public_key_hex(), "hello", &sig), Verification::Verified);
        assert_eq!(verify(&w.public_key_hex(), "hellO", &sig), Verification::Mismatch);
    }

    #[test]
    fn verify_reports_failure_kinds() {
        let w = Wallet::new();
        let pk = w.public_key_hex();
        assert_eq!(
            verify(&pk, "m", "zz"),
            Verification::Undecodable("signature hex")
        );
        assert_eq!(verify(&pk, "m", "deadbeef"), Verification::MalformedSignature);
        let sig = w.sign("m");
        assert_eq!(verify("00", "m", &sig), Verification::Undecodable("public key"));
        let other = Wallet::new();
        assert_eq!(
            verify(&other.public_key_hex(), "m", &sig),
            Verification::Mismatch
        );
        assert!(!Verification::Mismatch.is_verified());
    }

    #[test]
    fn debug_hides_secret_key() {
        let w = Wallet::new();
        let out = format!("{w:?}");
        assert!(!out.contains(&w.secret_key_hex()));
    }
}

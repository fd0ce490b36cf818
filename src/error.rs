use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Failures of node operations that are surfaced to the caller.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid node address: {0:?}")]
    InvalidNodeAddress(String),
    #[error("mining task failed: {0}")]
    Mining(String),
}

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::InvalidInput(_) | LedgerError::InvalidNodeAddress(_) => {
                StatusCode::BAD_REQUEST
            }
            LedgerError::Mining(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}

/// Why a candidate chain was rejected by validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,
    #[error("first block is not a genesis block")]
    BadGenesis,
    #[error("block at position {position} carries index {index}")]
    IndexMismatch { position: usize, index: u64 },
    #[error("block {index} does not link to the hash of its predecessor")]
    PreviousHashMismatch { index: u64 },
    #[error("block {index} carries a proof that fails the difficulty predicate")]
    InvalidProof { index: u64 },
}

/// Why a peer was left out of a consensus round.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("peer answered with status {0}")]
    Status(u16),
    #[error("malformed chain report: {0}")]
    Malformed(String),
    #[error("peer did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

use actix_web::{HttpResponse, Responder, get, web};
use log::info;

use super::models::{AppState, DifficultyResponse, MineResponse, ResolveResponse, ValidateResponse};
use crate::error::LedgerError;

/// Full chain; peers read this during consensus.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.node.chain_report())
}

/// Validate the whole local chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ValidateResponse {
        valid: state.node.is_valid(),
        length: state.node.len(),
        difficulty: state.node.difficulty(),
    })
}

/// Mine the mempool into a new block, rewarding this node.
#[get("/mine/")]
pub async fn mine_block(state: web::Data<AppState>) -> Result<HttpResponse, LedgerError> {
    let block = state.node.mine().await?;
    Ok(HttpResponse::Ok().json(MineResponse {
        message: "New Block Forged",
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
        wallets: state.node.wallets(),
    }))
}

/// Current PoW difficulty.
#[get("/difficulty/")]
pub async fn get_difficulty(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: state.node.difficulty(),
    })
}

/// Run consensus against all registered nodes.
#[get("/nodes/resolve/")]
pub async fn resolve_nodes(state: web::Data<AppState>) -> impl Responder {
    let replaced = state.node.resolve_conflicts(&state.fetcher).await;
    let message = if replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    info!("consensus round finished: {message}");
    HttpResponse::Ok().json(ResolveResponse {
        message,
        replaced,
        chain: state.node.chain(),
    })
}

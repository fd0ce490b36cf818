use actix_web::{HttpResponse, Responder, get, web};
use log::info;

use super::models::{AppState, DemoResponse, NewWalletResponse, WalletsResponse};
use crate::error::LedgerError;

const DEMO_TRANSFERS: usize = 5;
const DEMO_AMOUNT: u64 = 10;

#[get("/wallets/new/")]
pub async fn create_wallet(state: web::Data<AppState>) -> impl Responder {
    let wallet = state.node.create_wallet();
    HttpResponse::Ok().json(NewWalletResponse {
        address: wallet.address().to_string(),
        public_key: wallet.public_key_hex(),
        private_key: wallet.secret_key_hex(),
        balance: wallet.balance,
    })
}

#[get("/wallets/")]
pub async fn list_wallets(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(WalletsResponse {
        wallets: state.node.wallets(),
    })
}

/// Two fresh wallets trading `DEMO_AMOUNT` back and forth.
#[get("/demo/")]
pub async fn demo(state: web::Data<AppState>) -> Result<HttpResponse, LedgerError> {
    let wallet1 = state.node.create_wallet();
    let wallet2 = state.node.create_wallet();
    info!(
        "demo wallets {} and {} stored",
        wallet1.address(),
        wallet2.address()
    );

    for _ in 0..DEMO_TRANSFERS {
        state
            .node
            .new_transaction(wallet1.address(), wallet2.address(), DEMO_AMOUNT)?;
        state
            .node
            .new_transaction(wallet2.address(), wallet1.address(), DEMO_AMOUNT)?;
    }

    Ok(HttpResponse::Ok().json(DemoResponse {
        message: "Demo completed",
        transactions: DEMO_TRANSFERS,
        wallet1: wallet1.address().to_string(),
        wallet2: wallet2.address().to_string(),
    }))
}

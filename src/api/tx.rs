use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info};
use std::time::Instant;

use super::models::{
    AppState, MempoolResponse, MessageResponse, NewTxRequest, NewTxResponse, SeedRequest,
    TransactionsResponse, VerifyRequest, VerifyResponse,
};
use crate::error::LedgerError;
use crate::transaction::Transaction;

fn required<T>(value: Option<T>, name: &str) -> Result<T, LedgerError> {
    value.ok_or_else(|| LedgerError::InvalidInput(format!("missing field `{name}`")))
}

/// Queue a new transaction for the next block.
#[post("/transactions/new/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> Result<HttpResponse, LedgerError> {
    let t0 = Instant::now();
    let body = body.into_inner();
    let sender = required(body.sender, "sender")?;
    let recipient = required(body.recipient, "recipient")?;
    let amount = required(body.amount, "amount")?;

    let index = state.node.new_transaction(&sender, &recipient, amount)?;
    debug!(
        "POST /transactions/new/ - queued for block {index} ({} ms)",
        t0.elapsed().as_millis()
    );
    Ok(HttpResponse::Created().json(NewTxResponse {
        message: format!("Transaction will be added to Block {index}"),
        index,
    }))
}

/// Queue `rounds` identical transfers.
#[post("/transactions/seed/")]
pub async fn seed_transactions(
    state: web::Data<AppState>,
    body: web::Json<SeedRequest>,
) -> Result<HttpResponse, LedgerError> {
    let body = body.into_inner();
    let sender = required(body.sender, "sender")?;
    let recipient = required(body.recipient, "recipient")?;
    let amount = required(body.amount, "amount")?;
    let rounds = required(body.rounds, "rounds")?;
    if amount == 0 || rounds == 0 {
        return Err(LedgerError::InvalidInput(
            "amount and rounds must be positive integers".into(),
        ));
    }

    for _ in 0..rounds {
        state.node.new_transaction(&sender, &recipient, amount)?;
    }
    info!("seeded {rounds} transactions {sender} -> {recipient}");
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: format!("{rounds} transactions created successfully"),
    }))
}

/// Check a transaction signature against the sender's registered key.
#[post("/transactions/verify/")]
pub async fn verify_transaction(
    state: web::Data<AppState>,
    body: web::Json<VerifyRequest>,
) -> impl Responder {
    let body = body.into_inner();
    let mut tx = Transaction::new(body.sender, body.recipient, body.amount)
        .with_signature(body.signature);
    if let Some(txid) = body.txid {
        tx.txid = txid;
    }
    debug!("POST /transactions/verify/ - txid={}", tx.txid);

    if state.node.verify_transaction(&tx) {
        HttpResponse::Ok().json(VerifyResponse {
            valid: true,
            message: "Transaction signature is valid.",
        })
    } else {
        HttpResponse::BadRequest().json(VerifyResponse {
            valid: false,
            message: "Transaction signature is invalid.",
        })
    }
}

/// Mined transactions sent by an address.
#[get("/transactions/address/{address}/")]
pub async fn transactions_by_address(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let address = path.into_inner().0;
    let transactions = state.node.get_transactions(&address);
    let message = if transactions.is_empty() {
        "No Transactions found."
    } else {
        "Transactions found!"
    };
    HttpResponse::Ok().json(TransactionsResponse {
        message,
        transactions,
    })
}

/// One mined transaction by id.
#[get("/transactions/id/{txid}/")]
pub async fn transaction_by_id(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let txid = path.into_inner().0;
    match state.node.get_transaction_by_id(&txid) {
        Some(tx) => HttpResponse::Ok().json(tx),
        None => HttpResponse::NotFound().json(MessageResponse {
            message: format!("No transaction {txid}"),
        }),
    }
}

/// List current mempool (just txids to keep it compact).
#[get("/mempool/")]
pub async fn get_mempool(state: web::Data<AppState>) -> impl Responder {
    let mempool = state.node.mempool();
    HttpResponse::Ok().json(MempoolResponse {
        size: mempool.len(),
        transactions: mempool.into_iter().map(|t| t.txid).collect(),
    })
}

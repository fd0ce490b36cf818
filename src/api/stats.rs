use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let stats = state.node.stats();
    HttpResponse::Ok().json(StatsResponse {
        height: stats.height,
        difficulty: stats.difficulty,
        mempool_size: stats.mempool_size,
        wallets: stats.wallets,
        peers: stats.peers,
        node_identifier: state.node.node_identifier().to_string(),
    })
}

mod chain;
mod health;
pub mod models;
mod nodes;
mod stats;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(chain::get_difficulty)
            .service(chain::resolve_nodes)
            .service(tx::post_transaction)
            .service(tx::seed_transactions)
            .service(tx::verify_transaction)
            .service(tx::transactions_by_address)
            .service(tx::transaction_by_id)
            .service(tx::get_mempool)
            .service(nodes::register_nodes)
            .service(wallet::create_wallet)
            .service(wallet::list_wallets)
            .service(wallet::demo)
            .service(stats::get_stats),
    );
}

mod api;
mod blockchain;
mod config;
mod error;
mod node;
mod transaction;
mod wallet;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use dotenvy::dotenv;
use log::info;

use api::AppState;
use config::{Cli, Settings};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let settings = Settings::from_env().with_cli(Cli::parse());
    let state = web::Data::new(AppState::new(&settings).map_err(std::io::Error::other)?);

    println!(
        "⛓️ Starting ledger node {} at http://{}:{}",
        settings.node_identifier, settings.host, settings.port
    );
    info!(
        "difficulty={} peer_timeout={:?} peer_fanout={}",
        state.node.difficulty(),
        settings.peer_timeout,
        settings.peer_fanout
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await
}

use actix_web::{HttpResponse, post, web};

use super::models::{AppState, RegisterNodesRequest, RegisterNodesResponse};
use crate::error::LedgerError;
use crate::node::consensus::parse_node_address;

#[post("/nodes/register/")]
pub async fn register_nodes(
    state: web::Data<AppState>,
    body: web::Json<RegisterNodesRequest>,
) -> Result<HttpResponse, LedgerError> {
    let nodes = body.into_inner().nodes.ok_or_else(|| {
        LedgerError::InvalidInput("Please supply a valid list of nodes".into())
    })?;
    // all or nothing
    for node in &nodes {
        parse_node_address(node)?;
    }
    for node in &nodes {
        state.node.register_node(node)?;
    }
    Ok(HttpResponse::Created().json(RegisterNodesResponse {
        message: "New nodes have been added",
        total_nodes: state.node.nodes(),
    }))
}

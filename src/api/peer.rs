use actix_web::{HttpResponse, Responder, post, web};
use log::{debug, warn};

use super::models::{AppState, ErrorResponse, ReplaceResponse};
use crate::blockchain::Block;
use crate::transaction::{Transaction, TransactionMap};

/// A peer's chain; adopted only under the longest-valid-chain rule.
#[post("/peer/chain/")]
pub async fn replace_chain(state: web::Data<AppState>, body: web::Json<Vec<Block>>) -> impl Responder {
    let incoming = body.into_inner();
    debug!("POST /peer/chain/ - {} blocks", incoming.len());

    match state.replace_chain(incoming) {
        Ok(()) => HttpResponse::Ok().json(ReplaceResponse {
            replaced: true,
            length: state.stats().height,
        }),
        Err(e) => {
            warn!("POST /peer/chain/ - rejected: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse::from(&e))
        }
    }
}

/// A transaction a peer admitted into its pool.
#[post("/peer/transaction/")]
pub async fn admit_transaction(state: web::Data<AppState>, body: web::Json<Transaction>) -> impl Responder {
    state.admit_transaction(body.into_inner());
    HttpResponse::Accepted().finish()
}

/// A peer's whole pool, replacing ours.
#[post("/peer/pool/")]
pub async fn replace_pool(state: web::Data<AppState>, body: web::Json<TransactionMap>) -> impl Responder {
    state.replace_pool(body.into_inner());
    HttpResponse::Ok().json(state.pool_map())
}

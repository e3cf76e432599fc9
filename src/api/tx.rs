use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info, warn};
use std::time::Instant;

use super::models::{AppState, ErrorResponse, TransactRequest, TransactResponse};

/// Pay from this node's wallet. A pending transaction from the same wallet is
/// extended instead of creating a second one.
#[post("/transact/")]
pub async fn post_transact(state: web::Data<AppState>, body: web::Json<TransactRequest>) -> impl Responder {
    let t0 = Instant::now();
    debug!(
        "POST /transact/ - received: recipient={}, amount={}",
        body.recipient, body.amount
    );

    if body.recipient.trim().is_empty() {
        warn!("POST /transact/ - rejected: empty recipient");
        return HttpResponse::BadRequest().json(ErrorResponse {
            kind: "error",
            message: "recipient required".into(),
        });
    }

    match state.submit_transaction(body.recipient.trim(), body.amount) {
        Ok(transaction) => {
            info!(
                "POST /transact/ - txid={} OK ({} ms)",
                transaction.id,
                t0.elapsed().as_millis()
            );
            HttpResponse::Ok().json(TransactResponse {
                kind: "success",
                transaction,
            })
        }
        Err(e) => {
            warn!("POST /transact/ - rejected: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse::from(&e))
        }
    }
}

/// The whole pool, id -> transaction.
#[get("/transaction-pool-map/")]
pub async fn get_pool_map(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.pool_map())
}

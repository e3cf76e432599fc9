use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{AppState, BlockOrder, BlocksQuery, ErrorResponse, MineResponse, ValidateResponse};
use crate::error::LedgerError;
use crate::node::MinedBlock;

/// Get the full blockchain, newest block first unless `?order=oldest`.
#[get("/blocks/")]
pub async fn get_blocks(state: web::Data<AppState>, query: web::Query<BlocksQuery>) -> impl Responder {
    let chain = match query.order {
        BlockOrder::Newest => state.chain_newest_first(),
        BlockOrder::Oldest => state.chain(),
    };
    HttpResponse::Ok().json(chain)
}

/// Validate the whole local chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let stats = state.stats();
    HttpResponse::Ok().json(ValidateResponse {
        valid: state.is_chain_valid(),
        length: stats.height,
        difficulty: stats.difficulty,
    })
}

/// Mine the valid pool transactions plus a reward for this node's wallet.
/// The PoW search runs on the blocking thread pool.
#[post("/mine-transactions/")]
pub async fn mine_transactions(state: web::Data<AppState>) -> impl Responder {
    let node = state.clone();
    let mined = match web::block(move || node.mine_transactions()).await {
        Ok(result) => result,
        Err(e) => {
            warn!("POST /mine-transactions/ - mining task failed: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };

    mined_response(mined)
}

fn mined_response(mined: Result<MinedBlock, LedgerError>) -> HttpResponse {
    match mined {
        Ok(MinedBlock { index, block }) => {
            info!("POST /mine-transactions/ - block #{} {}", index, block.hash);
            HttpResponse::Ok().json(MineResponse {
                mined_index: index,
                block,
            })
        }
        Err(e) => {
            warn!("POST /mine-transactions/ - {}", e);
            HttpResponse::BadRequest().json(ErrorResponse::from(&e))
        }
    }
}

/// Every address that has received an output on the chain.
#[get("/known-addresses/")]
pub async fn known_addresses(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.known_addresses())
}
